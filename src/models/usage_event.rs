use rusqlite::{params, Connection, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageEventKind {
    Resumed,
    Paused,
}

impl UsageEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resumed => "resumed",
            Self::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resumed" => Some(Self::Resumed),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// A foreground/background transition from the platform usage log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsageEvent {
    pub target: String,
    pub kind: UsageEventKind,
    pub timestamp_ms: i64,
}

impl UsageEvent {
    pub fn new(target: &str, kind: UsageEventKind, timestamp_ms: i64) -> Self {
        Self {
            target: target.to_string(),
            kind,
            timestamp_ms,
        }
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO usage_events (target, kind, timestamp_ms) VALUES (?1, ?2, ?3)",
            params![self.target, self.kind.as_str(), self.timestamp_ms],
        )?;
        Ok(())
    }

    /// Events in `[start_ms, end_ms]`, oldest first. Rows with an unknown
    /// kind are skipped.
    pub fn find_between(conn: &Connection, start_ms: i64, end_ms: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT target, kind, timestamp_ms FROM usage_events
             WHERE timestamp_ms >= ?1 AND timestamp_ms <= ?2
             ORDER BY timestamp_ms, id",
        )?;

        let rows = stmt.query_map(params![start_ms, end_ms], |row| {
            let kind: String = row.get(1)?;
            Ok((row.get::<_, String>(0)?, kind, row.get::<_, i64>(2)?))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (target, kind, timestamp_ms) = row?;
            if let Some(kind) = UsageEventKind::parse(&kind) {
                events.push(Self {
                    target,
                    kind,
                    timestamp_ms,
                });
            }
        }
        Ok(events)
    }

    /// Delete events older than `cutoff_ms`. Returns the number removed.
    pub fn prune_before(conn: &Connection, cutoff_ms: i64) -> Result<usize> {
        conn.execute(
            "DELETE FROM usage_events WHERE timestamp_ms < ?1",
            params![cutoff_ms],
        )
    }
}
