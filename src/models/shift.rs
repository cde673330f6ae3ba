// Shift record: one periodic snapshot of component metrics for a date.
// Usage values are classified numeric / non-numeric once, at ingestion.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Day key format (ISO calendar date).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A numeric metric value. Integers stay integers on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(v) => v as f64,
            Numeric::Float(v) => v,
        }
    }

    /// False for NaN, which has no place in a max ordering.
    pub fn is_comparable(self) -> bool {
        match self {
            Numeric::Int(_) => true,
            Numeric::Float(v) => !v.is_nan(),
        }
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Int(v)
    }
}

impl From<i32> for Numeric {
    fn from(v: i32) -> Self {
        Numeric::Int(v.into())
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Float(v)
    }
}

/// A cpu/memory usage entry. Anything that is not a JSON number is `Other`
/// and never takes part in max aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageValue {
    Numeric(Numeric),
    Other(serde_json::Value),
}

impl UsageValue {
    pub fn numeric(&self) -> Option<Numeric> {
        match self {
            UsageValue::Numeric(n) => Some(*n),
            UsageValue::Other(_) => None,
        }
    }
}

impl From<i64> for UsageValue {
    fn from(v: i64) -> Self {
        UsageValue::Numeric(Numeric::Int(v))
    }
}

impl From<i32> for UsageValue {
    fn from(v: i32) -> Self {
        UsageValue::Numeric(Numeric::from(v))
    }
}

impl From<f64> for UsageValue {
    fn from(v: f64) -> Self {
        UsageValue::Numeric(Numeric::Float(v))
    }
}

impl From<&str> for UsageValue {
    fn from(v: &str) -> Self {
        UsageValue::Other(serde_json::Value::String(v.to_string()))
    }
}

pub type UsageMap = BTreeMap<String, UsageValue>;
pub type AvailabilityMap = BTreeMap<String, serde_json::Value>;

/// One shift snapshot. `(date, shift_index)` is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    pub date: String,
    #[serde(alias = "day-shift")]
    pub shift_index: u32,
    #[serde(default, alias = "cpu_usage")]
    pub cpu_usage: UsageMap,
    #[serde(default, alias = "memory_usage")]
    pub memory_usage: UsageMap,
    #[serde(default, alias = "Application_Availability")]
    pub application_availability: AvailabilityMap,
}

/// Why an incoming payload never reached the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputRejected {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("malformed shift record: {0}")]
    Malformed(String),
    #[error("update carries no updatable fields")]
    EmptyPatch,
}

impl ShiftRecord {
    pub fn new(date: impl Into<String>, shift_index: u32) -> Self {
        Self {
            date: date.into(),
            shift_index,
            cpu_usage: UsageMap::new(),
            memory_usage: UsageMap::new(),
            application_availability: AvailabilityMap::new(),
        }
    }

    pub fn with_cpu(mut self, component: &str, value: impl Into<UsageValue>) -> Self {
        self.cpu_usage.insert(component.to_string(), value.into());
        self
    }

    pub fn with_memory(mut self, component: &str, value: impl Into<UsageValue>) -> Self {
        self.memory_usage.insert(component.to_string(), value.into());
        self
    }

    pub fn with_availability(
        mut self,
        component: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.application_availability
            .insert(component.to_string(), value.into());
        self
    }

    /// Boundary validation for an incoming write.
    pub fn from_json(value: serde_json::Value) -> Result<Self, InputRejected> {
        if !value.is_object() {
            return Err(InputRejected::NotAnObject);
        }
        let record: ShiftRecord =
            serde_json::from_value(value).map_err(|e| InputRejected::Malformed(e.to_string()))?;
        validate_date(&record.date)?;
        Ok(record)
    }
}

/// Rejects anything that is not a real calendar day in `YYYY-MM-DD` form.
pub fn validate_date(date: &str) -> Result<(), InputRejected> {
    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
        Ok(d) if d.format(DATE_FORMAT).to_string() == date => Ok(()),
        _ => Err(InputRejected::InvalidDate(date.to_string())),
    }
}

/// Partial update for an existing shift: present maps replace the stored ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPatch {
    #[serde(default, alias = "cpu_usage")]
    pub cpu_usage: Option<UsageMap>,
    #[serde(default, alias = "memory_usage")]
    pub memory_usage: Option<UsageMap>,
    #[serde(default, alias = "Application_Availability")]
    pub application_availability: Option<AvailabilityMap>,
}

impl ShiftPatch {
    pub fn from_json(value: serde_json::Value) -> Result<Self, InputRejected> {
        if !value.is_object() {
            return Err(InputRejected::NotAnObject);
        }
        let patch: ShiftPatch =
            serde_json::from_value(value).map_err(|e| InputRejected::Malformed(e.to_string()))?;
        if patch.is_empty() {
            return Err(InputRejected::EmptyPatch);
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_usage.is_none()
            && self.memory_usage.is_none()
            && self.application_availability.is_none()
    }

    pub fn apply(self, record: &mut ShiftRecord) {
        if let Some(cpu) = self.cpu_usage {
            record.cpu_usage = cpu;
        }
        if let Some(memory) = self.memory_usage {
            record.memory_usage = memory;
        }
        if let Some(availability) = self.application_availability {
            record.application_availability = availability;
        }
    }
}
