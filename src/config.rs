//! Studio configuration.
//!
//! Hosts pass this as JSON to `create_studio_with_config`; every field is
//! optional and falls back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::kv_store::DEFAULT_MAP_SIZE;

/// Storage key of the daily quota record.
pub const LIMIT_STORAGE_KEY: &str = "ai-image-generator-limit";
/// Storage key of the history sequence.
pub const HISTORY_STORAGE_KEY: &str = "ai-image-generator-history";

pub const DAILY_LIMIT: u32 = 10;
pub const MAX_HISTORY_ITEMS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Stem of the `<storage_name>.lmdb` directory.
    pub storage_name: String,
    pub daily_limit: u32,
    pub max_history_items: usize,
    pub map_size_bytes: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            storage_name: "ai-image-generator".to_string(),
            daily_limit: DAILY_LIMIT,
            max_history_items: MAX_HISTORY_ITEMS,
            map_size_bytes: DEFAULT_MAP_SIZE,
        }
    }
}

impl StudioConfig {
    pub fn with_storage_name(name: impl Into<String>) -> Self {
        Self {
            storage_name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage_name.trim().is_empty() {
            return Err("storage_name must not be empty".to_string());
        }
        if self.max_history_items == 0 {
            return Err("max_history_items must be at least 1".to_string());
        }
        if self.map_size_bytes == 0 {
            return Err("map_size_bytes must be greater than zero".to_string());
        }
        Ok(())
    }
}
