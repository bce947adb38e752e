//! Category schema registry.
//!
//! Loads the per-category field definitions and unique-key lists from a
//! definitions directory pinned by a sha256 manifest, and exposes them as an
//! immutable, process-lifetime structure. Two equivalent backing sources are
//! supported (see [`SchemaSource`]).

mod csv;
mod error;
mod hash;
mod manifest;
mod registry;

pub use error::SchemaError;
pub use hash::sha256_hex;
pub use manifest::{Manifest, ManifestFile, ManifestHeader, ManifestNotes};
pub use registry::{SchemaRegistry, SchemaSource};
