use crate::constants::{MS_PER_HOUR, MS_PER_MINUTE, VIRTUAL_SESSION_RETENTION_MS};
use crate::db::Database;
use crate::error::Result;
use crate::models::{AuthSettings, OverlayPosition, QuotaConfig, VirtualSessions};
use crate::validation::{
    validate_lockdown_hours, validate_override_minutes, validate_quota_config, validate_quota_configs,
};
use log::{debug, info, warn};
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) const KEY_QUOTA_CONFIGS: &str = "quota_configs";
const KEY_LOCKDOWN: &str = "lockdown";
const KEY_AUTH_SETTINGS: &str = "auth_settings";

fn override_key(config_id: &str) -> String {
    format!("override:{config_id}")
}

fn virtual_sessions_key(target: &str) -> String {
    format!("virtual_sessions:{target}")
}

fn bypass_key(target: &str) -> String {
    format!("intervention_bypass:{target}")
}

fn overlay_position_key(target: &str) -> String {
    format!("overlay_position:{target}")
}

pub trait QuotaStore {
    /// All configs. Missing or corrupt data reads as an empty list.
    fn quota_configs(&self) -> Vec<QuotaConfig>;
    /// Replace the config list after validating it as a whole.
    fn save_quota_configs(&self, configs: &[QuotaConfig]) -> Result<()>;
    /// Remove a config and its override. Returns false if no such config.
    fn delete_quota_config(&self, config_id: &str) -> Result<bool>;

    /// Override expiry for a config, cleared once it has passed.
    fn override_expiry(&self, config_id: &str, now_ms: i64) -> Option<i64>;
    /// Returns the new expiry.
    fn set_override_minutes(&self, config_id: &str, minutes: i64, now_ms: i64) -> Result<i64>;
    fn clear_override(&self, config_id: &str) -> Result<()>;

    /// Global lockdown expiry, cleared once it has passed.
    fn lockdown_expiry(&self, now_ms: i64) -> Option<i64>;
    /// Returns the new expiry.
    fn set_lockdown_hours(&self, hours: i64, now_ms: i64) -> Result<i64>;
    fn clear_lockdown(&self) -> Result<()>;

    fn virtual_sessions(&self, target: &str) -> VirtualSessions;
    fn start_virtual_session(&self, target: &str, now_ms: i64) -> Result<()>;
    fn heartbeat_virtual_session(&self, target: &str, now_ms: i64) -> Result<()>;
    fn end_virtual_session(&self, target: &str, now_ms: i64) -> Result<()>;

    fn grant_intervention_bypass(&self, target: &str) -> Result<()>;
    /// Take the one-shot bypass for `target`, if granted.
    fn consume_intervention_bypass(&self, target: &str) -> bool;

    fn overlay_position(&self, target: &str) -> Option<OverlayPosition>;
    fn set_overlay_position(&self, target: &str, position: OverlayPosition) -> Result<()>;

    fn auth_settings(&self) -> AuthSettings;
    fn set_auth_settings(&self, settings: &AuthSettings) -> Result<()>;
}

pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn get_raw(&self, key: &str) -> rusqlite::Result<Option<String>> {
        self.db
            .connection()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read '{key}': {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring corrupt value for '{key}': {e}");
                None
            }
        }
    }

    pub(crate) fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.db.connection().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, json],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .db
            .connection()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Read an expiry and drop it if it is no longer in the future.
    fn live_expiry(&self, key: &str, now_ms: i64) -> Option<i64> {
        let expiry: i64 = self.get_json(key)?;
        if expiry > now_ms {
            return Some(expiry);
        }
        debug!("Clearing expired '{key}'");
        if let Err(e) = self.remove(key) {
            warn!("Failed to clear expired '{key}': {e}");
        }
        None
    }

    fn update_sessions(&self, target: &str, update: impl FnOnce(&mut VirtualSessions)) -> Result<()> {
        let mut sessions = self.virtual_sessions(target);
        update(&mut sessions);
        self.put_json(&virtual_sessions_key(target), &sessions)
    }
}

impl QuotaStore for SqliteStore {
    fn quota_configs(&self) -> Vec<QuotaConfig> {
        let mut configs: Vec<QuotaConfig> = self.get_json(KEY_QUOTA_CONFIGS).unwrap_or_default();
        configs.retain(|config| match validate_quota_config(config) {
            Ok(()) => true,
            Err(e) => {
                warn!("Ignoring stored quota config {}: {e}", config.id);
                false
            }
        });
        configs
    }

    fn save_quota_configs(&self, configs: &[QuotaConfig]) -> Result<()> {
        validate_quota_configs(configs)?;
        self.put_json(KEY_QUOTA_CONFIGS, configs)?;
        info!("Saved {} quota configs", configs.len());
        Ok(())
    }

    fn delete_quota_config(&self, config_id: &str) -> Result<bool> {
        let mut configs = self.quota_configs();
        let before = configs.len();
        configs.retain(|c| c.id != config_id);
        if configs.len() == before {
            return Ok(false);
        }

        self.put_json(KEY_QUOTA_CONFIGS, &configs)?;
        self.remove(&override_key(config_id))?;
        info!("Deleted quota config {config_id}");
        Ok(true)
    }

    fn override_expiry(&self, config_id: &str, now_ms: i64) -> Option<i64> {
        self.live_expiry(&override_key(config_id), now_ms)
    }

    fn set_override_minutes(&self, config_id: &str, minutes: i64, now_ms: i64) -> Result<i64> {
        validate_override_minutes(minutes)?;
        let expiry = now_ms + minutes * MS_PER_MINUTE;
        self.put_json(&override_key(config_id), &expiry)?;
        info!("Override for {config_id} until {expiry}");
        Ok(expiry)
    }

    fn clear_override(&self, config_id: &str) -> Result<()> {
        self.remove(&override_key(config_id))?;
        Ok(())
    }

    fn lockdown_expiry(&self, now_ms: i64) -> Option<i64> {
        self.live_expiry(KEY_LOCKDOWN, now_ms)
    }

    fn set_lockdown_hours(&self, hours: i64, now_ms: i64) -> Result<i64> {
        validate_lockdown_hours(hours)?;
        let expiry = now_ms + hours * MS_PER_HOUR;
        self.put_json(KEY_LOCKDOWN, &expiry)?;
        info!("Lockdown until {expiry}");
        Ok(expiry)
    }

    fn clear_lockdown(&self) -> Result<()> {
        self.remove(KEY_LOCKDOWN)?;
        Ok(())
    }

    fn virtual_sessions(&self, target: &str) -> VirtualSessions {
        self.get_json(&virtual_sessions_key(target)).unwrap_or_default()
    }

    fn start_virtual_session(&self, target: &str, now_ms: i64) -> Result<()> {
        self.update_sessions(target, |sessions| {
            sessions.prune(now_ms, VIRTUAL_SESSION_RETENTION_MS);
            sessions.open(now_ms);
        })
    }

    fn heartbeat_virtual_session(&self, target: &str, now_ms: i64) -> Result<()> {
        let mut sessions = self.virtual_sessions(target);
        if sessions.heartbeat(now_ms) {
            self.put_json(&virtual_sessions_key(target), &sessions)?;
        }
        Ok(())
    }

    fn end_virtual_session(&self, target: &str, now_ms: i64) -> Result<()> {
        let mut sessions = self.virtual_sessions(target);
        if sessions.close(now_ms) {
            self.put_json(&virtual_sessions_key(target), &sessions)?;
        }
        Ok(())
    }

    fn grant_intervention_bypass(&self, target: &str) -> Result<()> {
        self.put_json(&bypass_key(target), &true)
    }

    fn consume_intervention_bypass(&self, target: &str) -> bool {
        match self.remove(&bypass_key(target)) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to consume intervention bypass for {target}: {e}");
                false
            }
        }
    }

    fn overlay_position(&self, target: &str) -> Option<OverlayPosition> {
        self.get_json(&overlay_position_key(target))
    }

    fn set_overlay_position(&self, target: &str, position: OverlayPosition) -> Result<()> {
        self.put_json(&overlay_position_key(target), &position)
    }

    fn auth_settings(&self) -> AuthSettings {
        self.get_json(KEY_AUTH_SETTINGS).unwrap_or_default()
    }

    fn set_auth_settings(&self, settings: &AuthSettings) -> Result<()> {
        self.put_json(KEY_AUTH_SETTINGS, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MS_PER_DAY;
    use crate::error::QuotaError;
    use crate::models::AuthMode;
    use crate::registry::SNAPCHAT_STORIES;
    use crate::test_utils::setup_test_store;

    #[test]
    fn test_configs_empty_by_default() {
        let (store, _dir) = setup_test_store();
        assert!(store.quota_configs().is_empty());
    }

    #[test]
    fn test_save_and_load_configs() {
        let (store, _dir) = setup_test_store();
        let configs = vec![
            QuotaConfig::new("Social", &["com.example.a", SNAPCHAT_STORIES], 10.0, 60),
            QuotaConfig::new("Games", &["com.example.b"], 5.0, 15),
        ];
        store.save_quota_configs(&configs).unwrap();
        assert_eq!(store.quota_configs(), configs);
    }

    #[test]
    fn test_corrupt_configs_read_as_empty() {
        let (store, _dir) = setup_test_store();
        store.put_json(KEY_QUOTA_CONFIGS, "not a list").unwrap();
        assert!(store.quota_configs().is_empty());
    }

    #[test]
    fn test_invalid_stored_configs_are_dropped() {
        let (store, _dir) = setup_test_store();
        let good = QuotaConfig::new("Social", &["com.example.a"], 10.0, 60);
        let mut zero_window = QuotaConfig::new("Games", &["com.example.b"], 10.0, 60);
        zero_window.window_minutes = 0;
        store.put_json(KEY_QUOTA_CONFIGS, &[good.clone(), zero_window]).unwrap();

        assert_eq!(store.quota_configs(), vec![good]);
    }

    #[test]
    fn test_save_rejects_conflicting_configs() {
        let (store, _dir) = setup_test_store();
        let configs = vec![
            QuotaConfig::new("Social", &["com.example.a"], 10.0, 60),
            QuotaConfig::new("Also social", &["com.example.a"], 10.0, 60),
        ];
        let err = store.save_quota_configs(&configs).unwrap_err();
        assert!(matches!(err, QuotaError::ConfigConflict { .. }));
        assert!(store.quota_configs().is_empty());
    }

    #[test]
    fn test_delete_config_clears_override() {
        let (store, _dir) = setup_test_store();
        let config = QuotaConfig::new("Social", &["com.example.a"], 10.0, 60);
        store.save_quota_configs(std::slice::from_ref(&config)).unwrap();
        store.set_override_minutes(&config.id, 10, 0).unwrap();

        assert!(store.delete_quota_config(&config.id).unwrap());
        assert!(store.quota_configs().is_empty());
        assert_eq!(store.override_expiry(&config.id, 0), None);
        assert!(!store.delete_quota_config(&config.id).unwrap());
    }

    #[test]
    fn test_override_expires_lazily() {
        let (store, _dir) = setup_test_store();
        let expiry = store.set_override_minutes("cfg", 2, 1_000).unwrap();
        assert_eq!(expiry, 1_000 + 2 * MS_PER_MINUTE);

        assert_eq!(store.override_expiry("cfg", expiry - 1), Some(expiry));
        assert_eq!(store.override_expiry("cfg", expiry), None);
        // Cleared on the read above, so an earlier clock no longer sees it.
        assert_eq!(store.override_expiry("cfg", 0), None);
    }

    #[test]
    fn test_override_minutes_validated() {
        let (store, _dir) = setup_test_store();
        assert!(store.set_override_minutes("cfg", 0, 0).is_err());
        assert_eq!(store.override_expiry("cfg", 0), None);
    }

    #[test]
    fn test_lockdown_set_expire_and_clear() {
        let (store, _dir) = setup_test_store();
        let expiry = store.set_lockdown_hours(2, 0).unwrap();
        assert_eq!(expiry, 2 * MS_PER_HOUR);
        assert_eq!(store.lockdown_expiry(MS_PER_HOUR), Some(expiry));

        store.clear_lockdown().unwrap();
        assert_eq!(store.lockdown_expiry(MS_PER_HOUR), None);

        store.set_lockdown_hours(1, 0).unwrap();
        assert_eq!(store.lockdown_expiry(MS_PER_HOUR + 1), None);
    }

    #[test]
    fn test_virtual_session_lifecycle() {
        let (store, _dir) = setup_test_store();
        store.start_virtual_session(SNAPCHAT_STORIES, 1_000).unwrap();
        store.heartbeat_virtual_session(SNAPCHAT_STORIES, 2_000).unwrap();
        assert_eq!(store.virtual_sessions(SNAPCHAT_STORIES).open_count(), 1);

        store.end_virtual_session(SNAPCHAT_STORIES, 3_000).unwrap();
        let sessions = store.virtual_sessions(SNAPCHAT_STORIES);
        assert_eq!(sessions.open_count(), 0);
        assert_eq!(sessions.used_ms(0, 10_000), 2_000);
    }

    #[test]
    fn test_start_prunes_old_sessions() {
        let (store, _dir) = setup_test_store();
        store.start_virtual_session(SNAPCHAT_STORIES, 0).unwrap();
        store.end_virtual_session(SNAPCHAT_STORIES, 1_000).unwrap();

        store.start_virtual_session(SNAPCHAT_STORIES, 8 * MS_PER_DAY).unwrap();
        assert_eq!(store.virtual_sessions(SNAPCHAT_STORIES).0.len(), 1);
    }

    #[test]
    fn test_intervention_bypass_is_one_shot() {
        let (store, _dir) = setup_test_store();
        assert!(!store.consume_intervention_bypass("com.example.a"));

        store.grant_intervention_bypass("com.example.a").unwrap();
        assert!(store.consume_intervention_bypass("com.example.a"));
        assert!(!store.consume_intervention_bypass("com.example.a"));
    }

    #[test]
    fn test_overlay_positions_are_per_target() {
        let (store, _dir) = setup_test_store();
        assert_eq!(store.overlay_position("com.example.app"), None);

        store.set_overlay_position("com.example.app", OverlayPosition { x: 120, y: 240 }).unwrap();
        store.set_overlay_position("com.example.other", OverlayPosition { x: 5, y: 10 }).unwrap();

        assert_eq!(store.overlay_position("com.example.app"), Some(OverlayPosition { x: 120, y: 240 }));
        assert_eq!(store.overlay_position("com.example.other"), Some(OverlayPosition { x: 5, y: 10 }));
    }

    #[test]
    fn test_auth_settings_round_trip() {
        let (store, _dir) = setup_test_store();
        assert_eq!(store.auth_settings(), AuthSettings::default());

        let settings = AuthSettings {
            override_mode: AuthMode::Password,
            override_password: Some("hunter2".to_string()),
            ..AuthSettings::default()
        };
        store.set_auth_settings(&settings).unwrap();
        assert_eq!(store.auth_settings(), settings);
    }
}
