use serde::{Deserialize, Serialize};

/// One foreground stretch of a virtual target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSessionRecord {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub last_seen_ms: Option<i64>,
}

impl VirtualSessionRecord {
    pub fn is_open(&self) -> bool {
        self.end_ms.is_none()
    }

    /// Latest instant this record is known to cover.
    pub fn last_point_ms(&self) -> i64 {
        self.end_ms.or(self.last_seen_ms).unwrap_or(self.start_ms)
    }

    /// Milliseconds of this record inside `[window_start_ms, now_ms]`.
    ///
    /// An open record is only credited up to its last heartbeat, so a crash
    /// mid-session never credits the dead time after it.
    pub fn clipped_ms(&self, window_start_ms: i64, now_ms: i64) -> i64 {
        let end = match self.end_ms {
            Some(end) => end,
            None => self.last_seen_ms.unwrap_or(self.start_ms).min(now_ms),
        };
        let start = self.start_ms.max(window_start_ms);
        let end = end.min(now_ms);
        (end - start).max(0)
    }
}

/// Session ledger of one virtual target. At most one record is open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualSessions(pub Vec<VirtualSessionRecord>);

impl VirtualSessions {
    /// Open a new record at `now_ms`.
    ///
    /// A record still open at this point was left behind by a process that
    /// died mid-session; it is closed at its last heartbeat first.
    pub fn open(&mut self, now_ms: i64) {
        for record in self.0.iter_mut().filter(|r| r.is_open()) {
            record.end_ms = Some(record.last_point_ms());
        }
        self.0.push(VirtualSessionRecord {
            start_ms: now_ms,
            end_ms: None,
            last_seen_ms: Some(now_ms),
        });
    }

    /// Returns false when no record is open.
    pub fn heartbeat(&mut self, now_ms: i64) -> bool {
        match self.open_record_mut() {
            Some(record) => {
                record.last_seen_ms = Some(now_ms);
                true
            }
            None => false,
        }
    }

    /// Returns false when no record is open.
    pub fn close(&mut self, now_ms: i64) -> bool {
        match self.open_record_mut() {
            Some(record) => {
                record.end_ms = Some(now_ms.max(record.start_ms));
                record.last_seen_ms = Some(now_ms);
                true
            }
            None => false,
        }
    }

    /// Drop records whose last point is older than `retention_ms`.
    pub fn prune(&mut self, now_ms: i64, retention_ms: i64) {
        let cutoff = now_ms - retention_ms;
        self.0.retain(|r| r.last_point_ms() >= cutoff);
    }

    pub fn used_ms(&self, window_start_ms: i64, now_ms: i64) -> i64 {
        self.0
            .iter()
            .map(|r| r.clipped_ms(window_start_ms, now_ms))
            .sum()
    }

    pub fn open_count(&self) -> usize {
        self.0.iter().filter(|r| r.is_open()).count()
    }

    fn open_record_mut(&mut self) -> Option<&mut VirtualSessionRecord> {
        self.0.iter_mut().rev().find(|r| r.is_open())
    }
}
