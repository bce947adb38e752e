//! Schema-driven validation for submission record sets.
//!
//! Three layers, composed by the pipeline's validation stage:
//!
//! 1. the field validator checks one column's cells against one field
//!    definition;
//! 2. the record validator reconciles a record set's columns with its
//!    category schema and runs the field validator over every present
//!    column;
//! 3. the business-rule registry runs category-specific semantic checks
//!    that schema shape cannot express.
//!
//! Validation outcomes are always data ([`evr_model::ValidationCondition`]),
//! never errors; only collaborator failures (identity lookups) surface as
//! `Err`.

pub mod datetime;
mod field;
mod identity;
mod numeric;
mod record;
mod rules;

pub use datetime::{DatetimeError, parse_profile_date, parse_profile_datetime};
pub use field::validate_field;
pub use identity::{
    IdentityError, IdentityResolver, port_human_key, references_ports, resolve_identities,
};
pub use numeric::{NumericError, ParsedDecimal, ParsedInteger, parse_decimal, parse_integer};
pub use record::{RecordSetValidation, validate_record_set};
pub use rules::{
    BusinessRule, FeatureConfig, IntervalEndAfterStart, MaintenanceCostAfterFirstYear,
    RuleContext, RuleRegistry,
};
