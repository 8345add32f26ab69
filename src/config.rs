//! Engine configuration.
//!
//! All fields deserialize with defaults so a partial configuration document
//! is always usable; durations are carried as integer milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling for recursive-reduction depth. Exceeding it truncates
    /// recursion rather than erroring.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,

    /// Bound on each session history (requests, responses, that).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Response produced when no category qualifies.
    #[serde(default)]
    pub default_response: String,

    /// Timeout handed to the external service bridge per call.
    #[serde(default = "default_bridge_timeout", with = "duration_ms")]
    pub bridge_timeout: Duration,

    /// Text used when a bridge call fails and the tag supplies no default of
    /// its own; `None` falls through to the tag's evaluated content.
    #[serde(default)]
    pub bridge_fallback: Option<String>,

    /// Session variable names forwarded to the bridge as ancillary
    /// parameters (coordinates, tokens, hints).
    #[serde(default)]
    pub service_params: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            history_limit: default_history_limit(),
            default_response: String::new(),
            bridge_timeout: default_bridge_timeout(),
            bridge_fallback: None,
            service_params: Vec::new(),
        }
    }
}

fn default_recursion_limit() -> usize {
    20
}

fn default_history_limit() -> usize {
    32
}

fn default_bridge_timeout() -> Duration {
    Duration::from_millis(5000)
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
