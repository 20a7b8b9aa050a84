use serde::{Deserialize, Serialize};

/// Device-assigned measurement id.
pub type MeasurementId = u16;

/// A named, unit-tagged channel and its latest value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub id: MeasurementId,
    /// Empty until declared.
    pub name: String,
    /// Empty until declared.
    pub unit: String,
    pub latest_value: f64,
    /// False for a declared measurement that has not received a value yet.
    pub present: bool,
}

impl Measurement {
    pub(crate) fn observed(id: MeasurementId, value: f64) -> Self {
        Self {
            id,
            name: String::new(),
            unit: String::new(),
            latest_value: value,
            present: true,
        }
    }

    pub(crate) fn declared(id: MeasurementId, name: String, unit: String) -> Self {
        Self {
            id,
            name,
            unit,
            latest_value: 0.0,
            present: false,
        }
    }

    /// The declared name, or `#<id>` when none was given.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Name and unit declared for an id ahead of any frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementDefinition {
    pub id: MeasurementId,
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

impl MeasurementDefinition {
    pub fn new(id: MeasurementId, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: unit.into(),
        }
    }
}
