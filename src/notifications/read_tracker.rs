use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::settings::NotificationSettings;
use crate::models::notification::ReadNotification;
use crate::notifications::storage::{open_storage, LocalStorage};

pub const READ_NOTIFICATIONS_KEY: &str = "read_notifications";
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Locally persisted, self-expiring set of notification ids the user has seen.
///
/// Never fails: storage errors and corrupt payloads are logged and treated as
/// an empty set, so unread badges degrade instead of breaking the caller.
/// Writers in separate processes are not coordinated; the last write wins.
pub struct NotificationReadTracker {
    storage: Arc<dyn LocalStorage>,
    key: String,
    retention: Duration,
}

impl NotificationReadTracker {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            key: READ_NOTIFICATIONS_KEY.to_string(),
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }

    pub fn from_settings(settings: &NotificationSettings) -> Self {
        Self::new(open_storage(settings))
            .with_key(settings.storage_key.clone())
            .with_retention(retention_from_days(settings.retention_days))
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Ids read within the retention window.
    pub fn get_read_ids(&self) -> HashSet<String> {
        self.fresh_entries(Utc::now())
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    pub fn is_read(&self, id: &str) -> bool {
        self.fresh_entries(Utc::now()).iter().any(|entry| entry.id == id)
    }

    /// How many of `ids` have not been read yet.
    pub fn unread_count<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let read = self.get_read_ids();
        ids.into_iter()
            .filter(|id| !read.contains(id.as_ref()))
            .count()
    }

    /// Track `ids` as read now. Ids already tracked keep their first `readAt`.
    /// Entries outside the retention window are dropped on this write.
    pub fn mark_read<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = Utc::now();
        let stored = self.load_entries();
        let stored_len = stored.len();
        let mut entries: Vec<ReadNotification> = stored
            .into_iter()
            .filter(|entry| self.is_fresh(entry, now))
            .collect();
        let pruned = entries.len() != stored_len;

        let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
        entries.retain(|entry| seen.insert(entry.id.clone()));

        let mut added = 0;
        for id in ids {
            let id = id.as_ref();
            if seen.insert(id.to_string()) {
                entries.push(ReadNotification::new(id, now));
                added += 1;
            }
        }

        if added == 0 && !pruned {
            return;
        }
        tracing::debug!("Marking {} notifications read, {} tracked", added, entries.len());
        self.persist(&entries);
    }

    pub fn clear_all(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!("Failed to clear read notifications: {}", e);
        }
    }

    fn fresh_entries(&self, now: DateTime<Utc>) -> Vec<ReadNotification> {
        self.load_entries()
            .into_iter()
            .filter(|entry| self.is_fresh(entry, now))
            .collect()
    }

    // Elapsed time cannot overflow, unlike `read_at + retention`
    fn is_fresh(&self, entry: &ReadNotification, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.read_at) < self.retention
    }

    fn load_entries(&self) -> Vec<ReadNotification> {
        let payload = match self.storage.get(&self.key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load read notifications: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ReadNotification>>(&payload) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Discarding unreadable read-notification payload: {}", e);
                Vec::new()
            }
        }
    }

    fn persist(&self, entries: &[ReadNotification]) {
        let payload = match serde_json::to_string(entries) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize read notifications: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &payload) {
            tracing::warn!("Failed to persist read notifications: {}", e);
        }
    }
}

fn retention_from_days(days: i64) -> Duration {
    match Duration::try_days(days) {
        Some(retention) if days > 0 => retention,
        _ => {
            tracing::warn!(
                "Invalid read-notification retention of {} days, using {}",
                days,
                DEFAULT_RETENTION_DAYS
            );
            Duration::days(DEFAULT_RETENTION_DAYS)
        }
    }
}
