//! Saved shape of a patch graph.
//!
//! ```text
//! {
//!   unitMap:     { unitId: { typeId, settings, displayName } },
//!   unitOrder:   [ unitId, ... ],
//!   connections: [ { srcUnitId, srcPort, dstUnitId, dstPort }, ... ]
//! }
//! ```
//!
//! [`PatchDocument::to_value`] and [`PatchDocument::from_value`] convert to
//! and from the settings [`Value`] tree, which is how nested patches travel
//! inside a rack unit's settings and how the preset codec serializes them.

use std::collections::BTreeMap;

use patchbay_core::{Value, from_value};
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionSpec;
use crate::error::PatchError;
use crate::id::UnitId;

/// One unit of a saved patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEntry {
    /// Registered type id (or a reserved boundary type id).
    pub type_id: String,
    /// Settings snapshot; `Null` when the unit has none.
    #[serde(default)]
    pub settings: Value,
    /// Display name at save time.
    pub display_name: String,
}

/// A saved patch graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDocument {
    /// Units keyed by id.
    pub unit_map: BTreeMap<UnitId, UnitEntry>,
    /// Display and creation order.
    pub unit_order: Vec<UnitId>,
    /// Connections in creation order.
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

impl PatchDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `unit_order` and `unit_map` list the same ids and that
    /// every connection endpoint names a listed unit.
    pub fn validate(&self) -> Result<(), PatchError> {
        if self.unit_order.len() != self.unit_map.len() {
            return Err(PatchError::Document(format!(
                "unitOrder lists {} units but unitMap holds {}",
                self.unit_order.len(),
                self.unit_map.len()
            )));
        }
        for (i, id) in self.unit_order.iter().enumerate() {
            if !self.unit_map.contains_key(id) {
                return Err(PatchError::Document(format!("unitOrder names unknown unit '{id}'")));
            }
            if self.unit_order[..i].contains(id) {
                return Err(PatchError::Document(format!("unitOrder lists '{id}' twice")));
            }
        }
        for spec in &self.connections {
            for unit in [&spec.src_unit, &spec.dst_unit] {
                if !self.unit_map.contains_key(unit) {
                    return Err(PatchError::Document(format!(
                        "connection {spec} names unknown unit '{unit}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Converts to the settings value tree, the same shape the derived
    /// `Serialize` writes.
    pub fn to_value(&self) -> Value {
        let unit_map: BTreeMap<String, Value> = self
            .unit_map
            .iter()
            .map(|(id, entry)| {
                (
                    id.to_string(),
                    Value::map()
                        .with("typeId", entry.type_id.as_str())
                        .with("settings", entry.settings.clone())
                        .with("displayName", entry.display_name.as_str()),
                )
            })
            .collect();
        let unit_order: Vec<Value> = self
            .unit_order
            .iter()
            .map(|id| Value::from(id.as_str()))
            .collect();
        let connections: Vec<Value> = self
            .connections
            .iter()
            .map(|spec| {
                Value::map()
                    .with("srcUnitId", spec.src_unit.as_str())
                    .with("srcPort", spec.src_port.as_str())
                    .with("dstUnitId", spec.dst_unit.as_str())
                    .with("dstPort", spec.dst_port.as_str())
            })
            .collect();

        Value::map()
            .with("unitMap", unit_map)
            .with("unitOrder", unit_order)
            .with("connections", connections)
    }

    /// Reads a document out of a settings value tree.
    pub fn from_value(value: &Value) -> Result<Self, PatchError> {
        from_value(value.clone()).map_err(|err| PatchError::Document(err.to_string()))
    }

    /// Units in display order.
    pub fn units(&self) -> impl Iterator<Item = (&UnitId, &UnitEntry)> {
        self.unit_order
            .iter()
            .filter_map(|id| self.unit_map.get_key_value(id))
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.unit_order.len()
    }

    /// Returns true if the document holds no units.
    pub fn is_empty(&self) -> bool {
        self.unit_order.is_empty()
    }
}
