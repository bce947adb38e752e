//! Category-specific business rules.
//!
//! Business rules cover semantic checks that static schema shape cannot
//! express, typically date- or eligibility-dependent. Each category carries
//! an ordered list of rules registered at startup and resolved by category
//! lookup; a category with no rules is trivially valid, and the registry's
//! result is the concatenation of every rule's conditions.

use chrono::{Months, NaiveDate};
use std::collections::BTreeMap;

use evr_model::{
    CategoryId, ConditionKind, RecordSet, ValidationCondition, is_no_data_marker,
};

use crate::datetime::parse_profile_date;

/// Feature toggles resolved once at startup and passed into every rule
/// invocation by reference.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Enforce the maintenance-cost eligibility rule on operating-cost
    /// submissions.
    pub enforce_maintenance_costs: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enforce_maintenance_costs: true,
        }
    }
}

/// Input handed to every business rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The cleaned record set produced by the record validator.
    pub records: &'a RecordSet,
    pub features: &'a FeatureConfig,
    /// The date eligibility windows are computed against, usually the end of
    /// the submission's reporting window.
    pub reference_date: NaiveDate,
}

pub trait BusinessRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, ctx: &RuleContext<'_>) -> Vec<ValidationCondition>;
}

/// Ordered business rules keyed by category, built once at startup.
#[derive(Default)]
pub struct RuleRegistry {
    rules: BTreeMap<CategoryId, Vec<Box<dyn BusinessRule>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry carrying the built-in category rules.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            CategoryId::new("operating_costs").expect("category id"),
            Box::new(MaintenanceCostAfterFirstYear),
        );
        registry.register(
            CategoryId::new("usage_sessions").expect("category id"),
            Box::new(IntervalEndAfterStart::sessions()),
        );
        registry.register(
            CategoryId::new("outages").expect("category id"),
            Box::new(IntervalEndAfterStart::outages()),
        );
        registry
    }

    pub fn register(&mut self, category: CategoryId, rule: Box<dyn BusinessRule>) {
        self.rules.entry(category).or_default().push(rule);
    }

    pub fn rules_for(&self, category: &CategoryId) -> &[Box<dyn BusinessRule>] {
        self.rules
            .get(category)
            .map(|rules| rules.as_slice())
            .unwrap_or(&[])
    }

    /// Run every rule registered for the category and concatenate the
    /// resulting conditions.
    pub fn validate(&self, category: &CategoryId, ctx: &RuleContext<'_>) -> Vec<ValidationCondition> {
        let mut conditions = Vec::new();
        for rule in self.rules_for(category) {
            conditions.extend(rule.validate(ctx));
        }
        conditions
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (category, rules) in &self.rules {
            map.entry(
                &category.as_str(),
                &rules.iter().map(|rule| rule.name()).collect::<Vec<_>>(),
            );
        }
        map.finish()
    }
}

/// Maintenance cost becomes mandatory only once a station has been operating
/// for more than one year as of the reference date; before that, the field
/// may be legitimately empty.
pub struct MaintenanceCostAfterFirstYear;

const COMMISSION_DATE: &str = "commission_date";
const MAINTENANCE_COST: &str = "maintenance_cost";

impl BusinessRule for MaintenanceCostAfterFirstYear {
    fn name(&self) -> &'static str {
        "maintenance-cost-after-first-year"
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Vec<ValidationCondition> {
        if !ctx.features.enforce_maintenance_costs {
            return Vec::new();
        }

        let mut conditions = Vec::new();
        for (row, record) in ctx.records.rows.iter().enumerate() {
            let Some(raw_commissioned) = record.value(COMMISSION_DATE) else {
                continue;
            };
            // Unparseable dates are the field validator's finding, not ours.
            let Ok(commissioned) = parse_profile_date(raw_commissioned) else {
                continue;
            };
            let Some(eligible_from) = commissioned.checked_add_months(Months::new(12)) else {
                continue;
            };
            if eligible_from >= ctx.reference_date {
                continue;
            }
            if record.is_blank(MAINTENANCE_COST) {
                conditions.push(ValidationCondition::row(
                    ConditionKind::MissingValueForRequiredColumn,
                    row,
                    MAINTENANCE_COST,
                    format!(
                        "maintenance_cost is required once a station has operated \
                         for a full year (commissioned {commissioned})"
                    ),
                ));
            }
        }
        conditions
    }
}

/// Interval ordering: the end timestamp of a session or outage must not
/// precede its start. An end carrying the no-data marker is skipped.
pub struct IntervalEndAfterStart {
    rule_name: &'static str,
    start_field: &'static str,
    end_field: &'static str,
}

impl IntervalEndAfterStart {
    pub fn sessions() -> Self {
        Self {
            rule_name: "session-end-after-start",
            start_field: "session_start",
            end_field: "session_end",
        }
    }

    pub fn outages() -> Self {
        Self {
            rule_name: "outage-end-after-start",
            start_field: "outage_start",
            end_field: "outage_end",
        }
    }
}

impl BusinessRule for IntervalEndAfterStart {
    fn name(&self) -> &'static str {
        self.rule_name
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Vec<ValidationCondition> {
        let mut conditions = Vec::new();
        for (row, record) in ctx.records.rows.iter().enumerate() {
            let (Some(raw_start), Some(raw_end)) =
                (record.value(self.start_field), record.value(self.end_field))
            else {
                continue;
            };
            if is_no_data_marker(raw_end) {
                continue;
            }
            let (Ok(start), Ok(end)) = (
                crate::datetime::parse_profile_datetime(raw_start),
                crate::datetime::parse_profile_datetime(raw_end),
            ) else {
                continue;
            };
            if end < start {
                conditions.push(ValidationCondition::row(
                    ConditionKind::BusinessRuleViolation,
                    row,
                    self.end_field,
                    format!("{} {end} precedes {} {start}", self.end_field, self.start_field),
                ));
            }
        }
        conditions
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureConfig, RuleContext, RuleRegistry};
    use chrono::NaiveDate;
    use evr_model::{CategoryId, ConditionKind, Record, RecordSet};

    fn context<'a>(records: &'a RecordSet, features: &'a FeatureConfig) -> RuleContext<'a> {
        RuleContext {
            records,
            features,
            reference_date: NaiveDate::from_ymd_opt(2025, 12, 31).expect("reference date"),
        }
    }

    fn costs_category() -> CategoryId {
        CategoryId::new("operating_costs").expect("category id")
    }

    #[test]
    fn category_without_rules_is_trivially_valid() {
        let registry = RuleRegistry::builtin();
        let records = RecordSet::new(Vec::new(), Vec::new());
        let features = FeatureConfig::default();
        let conditions = registry.validate(
            &CategoryId::new("stations").expect("category id"),
            &context(&records, &features),
        );
        assert!(conditions.is_empty());
    }

    #[test]
    fn maintenance_cost_required_only_after_first_year() {
        let registry = RuleRegistry::builtin();
        let features = FeatureConfig::default();
        let records = RecordSet::new(
            vec![
                "station_id".to_string(),
                "commission_date".to_string(),
                "maintenance_cost".to_string(),
            ],
            vec![
                // Operating for years, cost missing: flagged.
                Record::from_pairs([
                    ("station_id", "ST-1"),
                    ("commission_date", "2020-06-01T00:00:00"),
                    ("maintenance_cost", ""),
                ]),
                // Commissioned within the year: legitimately empty.
                Record::from_pairs([
                    ("station_id", "ST-2"),
                    ("commission_date", "2025-04-01T00:00:00"),
                    ("maintenance_cost", ""),
                ]),
                // Operating for years but cost present: fine.
                Record::from_pairs([
                    ("station_id", "ST-3"),
                    ("commission_date", "2020-06-01T00:00:00"),
                    ("maintenance_cost", "1200.50"),
                ]),
            ],
        );

        let conditions = registry.validate(&costs_category(), &context(&records, &features));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].kind, ConditionKind::MissingValueForRequiredColumn);
        assert_eq!(conditions[0].error_row, Some(0));
        assert_eq!(conditions[0].header_name, "maintenance_cost");
    }

    #[test]
    fn maintenance_rule_respects_feature_toggle() {
        let registry = RuleRegistry::builtin();
        let features = FeatureConfig {
            enforce_maintenance_costs: false,
        };
        let records = RecordSet::new(
            vec!["commission_date".to_string(), "maintenance_cost".to_string()],
            vec![Record::from_pairs([
                ("commission_date", "2019-01-01T00:00:00"),
                ("maintenance_cost", ""),
            ])],
        );
        let conditions = registry.validate(&costs_category(), &context(&records, &features));
        assert!(conditions.is_empty());
    }

    #[test]
    fn outage_ordering_skips_no_data_end() {
        let registry = RuleRegistry::builtin();
        let features = FeatureConfig::default();
        let records = RecordSet::new(
            vec!["outage_start".to_string(), "outage_end".to_string()],
            vec![
                Record::from_pairs([
                    ("outage_start", "2025-05-02T08:00:00"),
                    ("outage_end", "2025-05-01T08:00:00"),
                ]),
                Record::from_pairs([
                    ("outage_start", "2025-05-02T08:00:00"),
                    ("outage_end", "N/A"),
                ]),
            ],
        );
        let conditions = registry.validate(
            &CategoryId::new("outages").expect("category id"),
            &context(&records, &features),
        );
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].kind, ConditionKind::BusinessRuleViolation);
        assert_eq!(conditions[0].error_row, Some(0));
    }
}
