//! Pipeline orchestration.
//!
//! Consumes asynchronous stage-completion signals, runs the next stage's
//! validators, writes accumulated conditions to the error ledger, and
//! advances or halts the submission's status. See [`orchestrator`] for the
//! concurrency and idempotency contract.

mod config;
mod directory;
mod error;
mod orchestrator;
mod signal;
mod stores;

pub use config::PipelineConfig;
pub use directory::{DirectoryError, IdentityOrgDirectory, OrgDirectory};
pub use error::StageError;
pub use orchestrator::Orchestrator;
pub use signal::{Stage, StageCompletion, StageOutcome};
pub use stores::{BackendError, MemoryBackend, StageUpdate, SubmissionBackend};
