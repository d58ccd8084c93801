// crates/storefront-migrate-core/src/core/records.rs
// ============================================================================
// Module: Legacy Records
// Description: Read-only views of legacy storage handed to transformers.
// Purpose: Give every domain a uniform record shape with lenient accessors.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Legacy storage is a generic object table with attached key/value
//! metadata, plus a handful of option blobs. Transformers receive one
//! [`LegacyRecord`] at a time. Metadata values are JSON text; accessors treat
//! unparsable or wrongly shaped values as absent so a corrupt field defaults
//! to empty instead of aborting the page.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Legacy Object
// ============================================================================

/// Primary legacy object row plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyObject {
    /// Legacy object identifier (stable, ascending).
    pub id: i64,
    /// Object type (`edd_payment`, `edd_log`, ...).
    pub object_type: String,
    /// Legacy status text.
    pub status: String,
    /// Object title.
    pub title: String,
    /// Object body text.
    pub content: String,
    /// Parent object identifier, zero when absent.
    pub parent_id: i64,
    /// Creation timestamp in legacy `Y-m-d H:i:s` form.
    pub created_at: String,
    /// Modification timestamp in legacy `Y-m-d H:i:s` form.
    pub modified_at: String,
    /// Raw metadata values (JSON text) keyed by meta key.
    pub meta: BTreeMap<String, String>,
}

impl LegacyObject {
    /// Returns a metadata value parsed as JSON.
    #[must_use]
    pub fn meta_json(&self, key: &str) -> Option<Value> {
        self.meta.get(key).and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Returns a metadata value as non-empty text.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<String> {
        self.meta_json(key).as_ref().and_then(value_as_string)
    }

    /// Returns a metadata value as a number.
    #[must_use]
    pub fn meta_f64(&self, key: &str) -> Option<f64> {
        self.meta_json(key).as_ref().and_then(value_as_f64)
    }

    /// Returns a metadata value as an integer.
    #[must_use]
    pub fn meta_i64(&self, key: &str) -> Option<i64> {
        self.meta_json(key).as_ref().and_then(value_as_i64)
    }

    /// Returns a metadata blob that must be a JSON object.
    ///
    /// Any other shape (array, scalar, invalid text) yields an empty map.
    #[must_use]
    pub fn meta_object(&self, key: &str) -> serde_json::Map<String, Value> {
        match self.meta_json(key) {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

// ============================================================================
// SECTION: Option Blob Entry
// ============================================================================

/// One entry exploded from a legacy option blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyBlobEntry {
    /// Option name the entry came from.
    pub option_name: String,
    /// Entry key (object key, or array index as text).
    pub key: String,
    /// Position in the stable ordering of the blob.
    pub position: u64,
    /// Raw entry value.
    pub value: Value,
}

impl LegacyBlobEntry {
    /// Returns a field of an object entry.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.as_object().and_then(|map| map.get(name))
    }

    /// Returns a field as non-empty text.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<String> {
        self.field(name).and_then(value_as_string)
    }

    /// Returns a field as a number.
    #[must_use]
    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(value_as_f64)
    }

    /// Returns a field as an integer.
    #[must_use]
    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(value_as_i64)
    }

    /// Returns a field interpreted as a legacy boolean.
    #[must_use]
    pub fn field_bool(&self, name: &str) -> bool {
        self.field(name).is_some_and(value_is_truthy)
    }
}

// ============================================================================
// SECTION: Cleanup Task
// ============================================================================

/// One unit of the legacy-removal step's fixed task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTask {
    /// Position in the task list.
    pub position: u64,
    /// Stable task name.
    pub name: String,
}

// ============================================================================
// SECTION: Legacy Record
// ============================================================================

/// Record handed to a transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegacyRecord {
    /// Object row with metadata.
    Object(LegacyObject),
    /// Option blob entry.
    BlobEntry(LegacyBlobEntry),
    /// Legacy-removal task.
    Task(LegacyTask),
}

impl LegacyRecord {
    /// Returns a short identifier used in logs.
    #[must_use]
    pub fn record_id(&self) -> String {
        match self {
            Self::Object(object) => format!("{}:{}", object.object_type, object.id),
            Self::BlobEntry(entry) => format!("{}:{}", entry.option_name, entry.key),
            Self::Task(task) => format!("task:{}", task.name),
        }
    }
}

// ============================================================================
// SECTION: Step Outcome
// ============================================================================

/// Result of migrating a single legacy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// At least one normalized row was written.
    Migrated,
    /// Already migrated, or nothing to write.
    Skipped,
}

// ============================================================================
// SECTION: Value Helpers
// ============================================================================

/// Interprets a JSON value as non-empty text.
#[must_use]
pub fn value_as_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// Interprets a JSON value as a finite number.
#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Interprets a JSON value as an integer.
#[must_use]
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Legacy truthiness: `true`, non-zero numbers, and `"1"`/`"yes"`/`"on"`/`"true"`.
#[must_use]
pub fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            matches!(text.trim().to_ascii_lowercase().as_str(), "1" | "yes" | "on" | "true")
        }
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}
