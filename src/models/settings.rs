use serde::{Deserialize, Serialize};

/// Process-wide user settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Photos on records older than this many days are purged; 0 keeps them forever.
    #[serde(default)]
    pub photo_retention_days: u32,
}
