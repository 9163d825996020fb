//! Countable units and base-unit conversion

use serde::{Deserialize, Serialize};

/// Unit for countable items
///
/// A unit without `baseUnit` is itself a base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<BaseUnit>,
}

/// Base unit a value is converted into for aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUnit {
    pub id: String,
    pub title: String,
    /// Multiplier converting from the owning unit into this base unit
    pub conversion_factor: f64,
}

impl Unit {
    /// Create a base unit
    pub fn base(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            base_unit: None,
        }
    }

    /// Create a unit converting into `base` by `conversion_factor`
    pub fn converted(id: impl Into<String>, title: impl Into<String>, base: BaseUnit) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            base_unit: Some(base),
        }
    }

    /// Id of the unit values are aggregated under
    pub fn base_id(&self) -> &str {
        self.base_unit
            .as_ref()
            .map(|b| b.id.as_str())
            .unwrap_or(&self.id)
    }

    /// Convert `value` of this unit into its base unit
    ///
    /// Returns the converted value and the id it is keyed under.
    pub fn normalize(&self, value: f64) -> (f64, &str) {
        match &self.base_unit {
            Some(base) => (value * base.conversion_factor, base.id.as_str()),
            None => (value, self.id.as_str()),
        }
    }
}

impl BaseUnit {
    pub fn new(id: impl Into<String>, title: impl Into<String>, conversion_factor: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            conversion_factor,
        }
    }
}

/// Find a unit by id
pub fn find_unit<'a>(units: &'a [Unit], id: &str) -> Option<&'a Unit> {
    units.iter().find(|u| u.id == id)
}
