use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid submission id: {0:?}")]
    InvalidSubmissionId(String),
    #[error("invalid category id: {0:?}")]
    InvalidCategoryId(String),
    #[error("invalid organization id: {0:?}")]
    InvalidOrganizationId(String),
    #[error("invalid reporting quarter: {0} (expected 1-4)")]
    InvalidQuarter(u8),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
