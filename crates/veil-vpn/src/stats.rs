//! Usage Statistics
//!
//! Read-only rollups over the immutable session history, plus the
//! human-readable byte/duration formatting used in status displays.
//! Days are bucketed as whole days since the Unix epoch; rendering a
//! calendar date is the transport layer's concern.

use crate::model::{ServerId, UserId};
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: u64 = 86_400;

/// Whole days since the Unix epoch
fn epoch_day(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / SECS_PER_DAY)
        .unwrap_or(0)
}

/// Lifetime summary for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_sessions: u64,
    pub has_active_session: bool,
    /// Sum of sent + received over all sessions
    pub total_bytes: u64,
    pub total_connected_secs: u64,
    pub sessions_today: u64,
    pub current_server: Option<ServerId>,
}

/// One day's usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Whole days since the Unix epoch
    pub epoch_day: u64,
    pub sessions: u64,
    pub bytes: u64,
    pub connected_secs: u64,
}

/// Statistics service over the storage collaborator
pub struct StatsService {
    store: Arc<dyn Store>,
}

impl StatsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Lifetime summary across the user's session history
    pub fn summary(&self, user_id: UserId) -> Result<UsageSummary, StoreError> {
        let sessions = self.store.list_sessions_for_user(user_id)?;
        let today = epoch_day(SystemTime::now());
        let active = sessions.iter().find(|s| s.is_active);

        Ok(UsageSummary {
            total_sessions: sessions.len() as u64,
            has_active_session: active.is_some(),
            total_bytes: sessions.iter().map(|s| s.bytes_sent + s.bytes_received).sum(),
            total_connected_secs: sessions.iter().map(|s| s.duration_secs).sum(),
            sessions_today: sessions
                .iter()
                .filter(|s| epoch_day(s.connected_at) == today)
                .count() as u64,
            current_server: active.map(|s| s.server_id),
        })
    }

    /// Per-day rollup over the last `days` days, oldest first.
    ///
    /// Days with no sessions are omitted.
    pub fn daily_usage(&self, user_id: UserId, days: u64) -> Result<Vec<DailyUsage>, StoreError> {
        let sessions = self.store.list_sessions_for_user(user_id)?;
        let today = epoch_day(SystemTime::now());
        let first_day = today.saturating_sub(days.saturating_sub(1));

        let mut buckets: BTreeMap<u64, DailyUsage> = BTreeMap::new();
        for session in sessions {
            let day = epoch_day(session.connected_at);
            if day < first_day {
                continue;
            }
            let bucket = buckets.entry(day).or_insert(DailyUsage {
                epoch_day: day,
                sessions: 0,
                bytes: 0,
                connected_secs: 0,
            });
            bucket.sessions += 1;
            bucket.bytes += session.bytes_sent + session.bytes_received;
            bucket.connected_secs += session.duration_secs;
        }
        Ok(buckets.into_values().collect())
    }
}

/// Human-readable byte count ("1.50 MB")
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

/// Human-readable duration ("1h 5m 9s")
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
