use super::UsageLog;
use crate::constants::USAGE_EVENT_RETENTION_MS;
use crate::db::Database;
use crate::error::Result;
use crate::models::UsageEvent;
use log::{debug, warn};

/// Usage log fed by a platform adapter and kept in SQLite.
pub struct RecordedUsageLog {
    db: Database,
}

impl RecordedUsageLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append `event` and drop anything past the retention window.
    pub fn record(&self, event: &UsageEvent) -> Result<()> {
        let conn = self.db.connection();
        event.save(conn)?;

        let pruned = UsageEvent::prune_before(conn, event.timestamp_ms - USAGE_EVENT_RETENTION_MS)?;
        if pruned > 0 {
            debug!("Pruned {pruned} old usage events");
        }
        Ok(())
    }
}

impl UsageLog for RecordedUsageLog {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Vec<UsageEvent> {
        UsageEvent::find_between(self.db.connection(), start_ms, end_ms).unwrap_or_else(|e| {
            warn!("Usage log query failed, counting no usage: {e}");
            Vec::new()
        })
    }
}
