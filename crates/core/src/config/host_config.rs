use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The supervised host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct HostConfig {
    /// Main source entry point, relative to the project root
    pub entry_point: String,
    /// File name of the built binary inside the staging directory
    pub binary_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment marking the host as running in development mode
    pub dev_env: BTreeMap<String, String>,
    /// Variable that receives the absolute staging directory path
    pub staging_env_var: String,
    /// Grace period between SIGTERM and SIGKILL
    pub stop_timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            entry_point: "application/main.go".to_string(),
            binary_name: "goji".to_string(),
            args: Vec::new(),
            dev_env: BTreeMap::from([("GO_ENV".to_string(), "development".to_string())]),
            staging_env_var: "DIST_DIR".to_string(),
            stop_timeout_secs: 5,
        }
    }
}
