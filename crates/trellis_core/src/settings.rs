//! Runtime Settings
//!
//! ```rust,ignore
//! use trellis_core::TrellisSettings;
//!
//! let settings = TrellisSettings {
//!     development_checks: true,
//!     ..Default::default()
//! };
//!
//! let settings = TrellisSettings::from_json_str(r#"{ "instance_expire": 10.0 }"#)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Idle time after which a managed model instance is released.
pub const DEFAULT_INSTANCE_EXPIRE: Duration = Duration::from_secs(30);

/// Number of native vertex-buffer slots a host pass exposes.
pub const DEFAULT_MAX_VERTEX_SLOTS: u32 = 8;

/// Settings shared by the loader, the instance manager and host passes.
///
/// Every field has a default, so a settings file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisSettings {
    /// Directory that relative model paths are resolved against.
    pub model_dir: PathBuf,

    /// Idle time (seconds in serialized form) before a managed instance expires.
    #[serde(with = "duration_secs")]
    pub instance_expire: Duration,

    /// Check every reconstructed primitive for a vertex stride that divides
    /// its buffer and for indices inside the vertex range.
    pub development_checks: bool,

    /// Native vertex-buffer slots per host render pass.
    pub max_vertex_slots: u32,
}

impl Default for TrellisSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            instance_expire: DEFAULT_INSTANCE_EXPIRE,
            development_checks: cfg!(debug_assertions),
            max_vertex_slots: DEFAULT_MAX_VERTEX_SLOTS,
        }
    }
}

impl TrellisSettings {
    /// Parses settings from JSON, filling omitted fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
