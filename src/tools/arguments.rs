//! Typed access to tool call arguments.

use crate::error::MedicError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, MedicError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| MedicError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument. Empty strings count as absent.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Get a non-negative integer argument.
    ///
    /// Models frequently send whole numbers as floats (`3.0`), so those are
    /// accepted too.
    pub fn get_u64_opt(&self, key: &str) -> Option<u64> {
        let value = self.value.get(key)?;
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
    }

    /// Get a count-like argument with a fallback, clamped to at least `min`.
    pub fn get_usize_or(&self, key: &str, default: usize, min: usize) -> usize {
        self.get_u64_opt(key)
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
            .unwrap_or(default)
            .max(min)
    }
}
