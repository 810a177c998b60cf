use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FileListQuery {
    /// Admin-only scope override; ignored for regular callers.
    pub user_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Admin-only scope; omitted means global for admins.
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StorageStats {
    pub count: i64,
    pub total_bytes: i64,
    pub average_bytes: f64,
    pub by_type: BTreeMap<String, i64>,
}
