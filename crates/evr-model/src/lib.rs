pub mod condition;
pub mod error;
pub mod ids;
pub mod record;
pub mod schema;
pub mod status;
pub mod submission;

pub use condition::{ConditionKind, LedgerEntry, ValidationCondition};
pub use error::{ModelError, Result};
pub use ids::{CategoryId, OrganizationId, SubmissionId};
pub use record::{IDENTITY_COLUMNS, PORT_KEY_COLUMN, Record, RecordSet, is_identity_column};
pub use schema::{
    CategorySchema, FieldDefinition, FieldType, NO_DATA_MARKER, is_no_data_marker,
};
pub use status::SubmissionStatus;
pub use submission::{Cadence, RecipientTier, ReportingPeriod, Submission};
