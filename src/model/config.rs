use serde::{Deserialize, Serialize};

/// Configuration from taskboard.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardInfo,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage key; the blob lives at `<key>.json` inside the board directory
    #[serde(default = "default_store_key")]
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            key: default_store_key(),
        }
    }
}

fn default_store_key() -> String {
    "taskboard".to_string()
}

/// Input limits applied by the task form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_title_max")]
    pub title_max: usize,
    #[serde(default = "default_description_max")]
    pub description_max: usize,
    #[serde(default = "default_estimate_digits")]
    pub estimate_digits: usize,
    #[serde(default = "default_budget_digits")]
    pub budget_digits: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            title_max: default_title_max(),
            description_max: default_description_max(),
            estimate_digits: default_estimate_digits(),
            budget_digits: default_budget_digits(),
        }
    }
}

fn default_title_max() -> usize {
    100
}

fn default_description_max() -> usize {
    500
}

fn default_estimate_digits() -> usize {
    8
}

fn default_budget_digits() -> usize {
    10
}
