//! Shared test utilities for quotaguard.
//!
//! This module provides common setup functions used across test modules.

#![cfg(test)]

use crate::db::Database;
use crate::models::UsageEvent;
use crate::platform::UsageLog;
use crate::store::SqliteStore;
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open_migrated(&db_path).expect("Failed to open test database");
    (db, dir)
}

/// A store over a fresh temporary database.
pub fn setup_test_store() -> (SqliteStore, TempDir) {
    let (db, dir) = setup_test_db();
    (SqliteStore::new(db), dir)
}

/// Usage log backed by a fixed list of events, editable between calls.
#[derive(Default)]
pub struct StaticUsageLog {
    pub events: Mutex<Vec<UsageEvent>>,
}

impl StaticUsageLog {
    pub fn new(events: Vec<UsageEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    pub fn push(&self, event: UsageEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl UsageLog for StaticUsageLog {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Vec<UsageEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.timestamp_ms >= start_ms && e.timestamp_ms <= end_ms)
            .cloned()
            .collect()
    }
}
