//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Backend root URL (default: "http://127.0.0.1:8000")
    pub base_url: String,

    /// Per-request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,

    /// Fetch cadence in milliseconds (default: 5000)
    pub poll_interval_ms: u64,

    /// Failures in a row before a tail gives up (default: 5)
    pub max_consecutive_failures: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_seconds: 10,
            poll_interval_ms: 5000,
            max_consecutive_failures: 5,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "backend": {
                "base_url": self.base_url,
                "request_timeout_seconds": self.request_timeout_seconds
            },
            "tail": {
                "poll_interval_ms": self.poll_interval_ms,
                "max_consecutive_failures": self.max_consecutive_failures
            }
        })
    }
}
