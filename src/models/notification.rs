use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One acknowledged notification in the local read cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadNotification {
    pub id: String,
    #[serde(rename = "readAt")]
    pub read_at: DateTime<Utc>,
}

impl ReadNotification {
    pub fn new(id: impl Into<String>, read_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            read_at,
        }
    }
}
