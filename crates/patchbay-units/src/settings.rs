//! Typed reads from a unit's settings map.
//!
//! Factories receive `Option<&Value>`. Absent settings and absent keys fall
//! back to defaults; present keys of the wrong shape are an error.

use patchbay_core::{UnitError, Value};

/// Borrowed view of a settings map.
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    value: Option<&'a Value>,
}

impl<'a> Settings<'a> {
    /// Wraps raw settings. `Null` counts as absent.
    pub fn new(value: Option<&'a Value>) -> Result<Self, UnitError> {
        match value {
            None | Some(Value::Null) => Ok(Self { value: None }),
            Some(Value::Map(_)) => Ok(Self { value }),
            Some(other) => Err(UnitError::invalid_setting(
                "settings",
                format!("expected a map, found {}", other.kind_name()),
            )),
        }
    }

    fn field(&self, key: &str) -> Option<&'a Value> {
        self.value
            .and_then(|v| v.get(key))
            .filter(|v| !v.is_null())
    }

    /// Numeric field. Integers are widened.
    pub fn number(&self, key: &str, default: f64) -> Result<f64, UnitError> {
        match self.field(key) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| UnitError::invalid_setting(key, "expected a finite number")),
        }
    }

    /// Integer field.
    pub fn integer(&self, key: &str, default: i64) -> Result<i64, UnitError> {
        match self.field(key) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| UnitError::invalid_setting(key, "expected an integer")),
        }
    }

    /// Binary payload field.
    pub fn bytes(&self, key: &str) -> Result<Vec<u8>, UnitError> {
        match self.field(key) {
            None => Ok(Vec::new()),
            Some(v) => v
                .as_bytes()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| UnitError::invalid_setting(key, "expected bytes")),
        }
    }

    /// List of booleans.
    pub fn flags(&self, key: &str) -> Result<Option<Vec<bool>>, UnitError> {
        let Some(v) = self.field(key) else {
            return Ok(None);
        };
        let list = v
            .as_list()
            .ok_or_else(|| UnitError::invalid_setting(key, "expected a list"))?;
        list.iter()
            .map(|item| {
                item.as_bool()
                    .ok_or_else(|| UnitError::invalid_setting(key, "expected a list of booleans"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}
