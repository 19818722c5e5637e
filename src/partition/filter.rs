//! Query filters.
//!
//! A [`Filter`] is sent unchanged to every partition of a run. Construction always
//! prepends the lifecycle-state predicate; caller predicates are appended in order and
//! never merged by name, so two predicates with the same name are both applied.

use super::types::{LifecycleState, Record};
use serde::{Deserialize, Serialize};

/// Predicate name restricting records by lifecycle state.
pub const STATE_FILTER_NAME: &str = "instance-state-name";
pub const ID_FILTER_NAME: &str = "instance-id";
pub const ZONE_FILTER_NAME: &str = "availability-zone";
pub const NAME_TAG_FILTER_NAME: &str = "tag:Name";
pub const PRIVATE_ADDRESS_FILTER_NAME: &str = "private-ip-address";
pub const PUBLIC_ADDRESS_FILTER_NAME: &str = "ip-address";

/// Lifecycle states every run is restricted to.
pub const ALLOWED_STATES: [LifecycleState; 4] = [
    LifecycleState::Pending,
    LifecycleState::Running,
    LifecycleState::Stopping,
    LifecycleState::Stopped,
];

/// A single `(name, values)` predicate. Values are alternatives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterPredicate {
    pub name: String,
    pub values: Vec<String>,
}

impl FilterPredicate {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses the CLI form `name=v1,v2`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, values) = raw.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            values,
        })
    }

    pub fn is_known(&self) -> bool {
        field_for(&self.name, &Record::new("", "")).is_some()
    }

    /// Unknown predicate names match nothing.
    pub fn matches(&self, record: &Record) -> bool {
        match field_for(&self.name, record) {
            Some(field) => self.values.iter().any(|v| v == field),
            None => false,
        }
    }
}

fn field_for<'a>(name: &str, record: &'a Record) -> Option<&'a str> {
    match name {
        STATE_FILTER_NAME => Some(record.lifecycle_state.as_str()),
        ID_FILTER_NAME => Some(&record.record_id),
        ZONE_FILTER_NAME => Some(&record.zone),
        NAME_TAG_FILTER_NAME => Some(&record.display_name),
        PRIVATE_ADDRESS_FILTER_NAME => Some(&record.primary_address),
        PUBLIC_ADDRESS_FILTER_NAME => Some(&record.secondary_address),
        _ => None,
    }
}

/// Ordered predicate list applied to every partition query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<FilterPredicate>,
}

impl Filter {
    /// Lifecycle-state predicate followed by `extra`, in order.
    pub fn new(extra: impl IntoIterator<Item = FilterPredicate>) -> Self {
        let mut predicates = vec![FilterPredicate::new(
            STATE_FILTER_NAME,
            ALLOWED_STATES.iter().map(|s| s.as_str()),
        )];
        predicates.extend(extra);
        Self { predicates }
    }

    /// Rebuilds a filter received over the wire, without adding the state predicate.
    pub fn from_predicates(predicates: Vec<FilterPredicate>) -> Self {
        Self { predicates }
    }

    pub fn predicates(&self) -> &[FilterPredicate] {
        &self.predicates
    }

    /// Names of predicates no partition understands.
    pub fn unknown_names(&self) -> Vec<&str> {
        self.predicates
            .iter()
            .filter(|p| !p.is_known())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Predicates are ANDed together.
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
