//! Organization directory collaborator.
//!
//! Stage-completion signals carry the submitting organization's display
//! name for notification collaborators. The lookup is external; any failure
//! is transient infrastructure trouble and aborts the stage before side
//! effects, never a validation outcome.

use evr_model::OrganizationId;

pub trait OrgDirectory {
    fn resolve_org_name(&self, organization: &OrganizationId) -> Result<String, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
#[error("organization directory lookup failed for {organization}: {message}")]
pub struct DirectoryError {
    pub organization: OrganizationId,
    pub message: String,
}

/// Directory that renders the organization id itself as the display name;
/// used by local runs and tests.
#[derive(Debug, Default)]
pub struct IdentityOrgDirectory;

impl OrgDirectory for IdentityOrgDirectory {
    fn resolve_org_name(&self, organization: &OrganizationId) -> Result<String, DirectoryError> {
        Ok(organization.to_string())
    }
}
