//! Persistent key-value settings store.
//!
//! Values survive restarts: tunables, the elevation calibration offset and
//! the azimuth wind count. Writers update their in-memory copy first and
//! persist second; a failed write never rolls the in-memory value back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Store failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(String),

    #[error("store contents could not be encoded: {0}")]
    Encode(String),
}

/// A stored scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl StoredValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Bool(_) => None,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for StoredValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for StoredValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f32> for StoredValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for StoredValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Key-value persistence.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<StoredValue>;

    fn put(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError>;

    /// Integer under `key`, or `default` when absent or mistyped.
    fn get_i32_or(&self, key: &str, default: i32) -> i32 {
        self.get(key)
            .and_then(StoredValue::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    /// Float under `key`, or `default` when absent or mistyped.
    fn get_f32_or(&self, key: &str, default: f32) -> f32 {
        self.get(key)
            .and_then(StoredValue::as_f64)
            .map_or(default, |v| v as f32)
    }

    /// Bool under `key`, or `default` when absent or mistyped.
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(StoredValue::as_bool)
            .unwrap_or(default)
    }
}

/// Volatile store for tests and diskless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).copied()
    }

    fn put(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_fall_back_on_mismatch() {
        let mut store = MemoryStore::new();
        store.put("gain", 42.into()).unwrap();
        store.put("flag", true.into()).unwrap();
        store.put("offset", 12.5f32.into()).unwrap();

        assert_eq!(store.get_i32_or("gain", 0), 42);
        assert_eq!(store.get_i32_or("flag", 7), 7);
        assert_eq!(store.get_i32_or("offset", 7), 7);
        assert!((store.get_f32_or("gain", 0.0) - 42.0).abs() < f32::EPSILON);
        assert!(store.get_bool_or("flag", false));
        assert_eq!(store.get_f32_or("missing", 3.0), 3.0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn whole_floats_read_as_integers() {
        assert_eq!(StoredValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(StoredValue::Float(4.5).as_i64(), None);
        assert_eq!(StoredValue::Bool(true).as_f64(), None);
    }
}
