//! Local key-value state, the terminal stand-in for browser local storage.
//!
//! Values are kept as a flat JSON object so files exported from older
//! clients (where every value was a string) still load.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ei_core::persona::Persona;
use ei_core::reconcile::LegacyShadow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::state::UsageCounters;
use crate::util::write_private;

pub mod keys {
    pub const PERSONA: &str = "ei_selected_persona";
    pub const SESSION_ID: &str = "ei_current_session_id";
    pub const MESSAGE_COUNT: &str = "ei_message_count";
    pub const PERSONAS_TRIED: &str = "ei_personas_tried";
    pub const SESSIONS_INTERACTED: &str = "ei_sessions_interacted";
    pub const HAS_VIEWED_HISTORY: &str = "ei_has_viewed_history";

    // Legacy gamification shadow, migrated into the remote profile.
    pub const LEGACY_XP: &str = "ei_user_xp";
    pub const LEGACY_LEVEL: &str = "ei_user_level";
    pub const LEGACY_BADGES: &str = "ei_earned_badges";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode local state: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl LocalStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable JSON document is discarded with a warning.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "local state is corrupt, starting empty");
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    /// A store that never touches disk.
    #[cfg(test)]
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            values: Map::new(),
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_json::to_vec_pretty(&self.values)?;
        write_private(path, &data).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })
    }

    /// Persist, logging instead of failing. Local state is best effort.
    pub fn flush(&self) {
        if let Err(err) = self.save() {
            tracing::warn!(error = %err, "could not persist local state");
        }
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set_raw(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.raw(key).and_then(Value::as_str)
    }

    /// Read a typed value. Values that were stored as JSON-encoded strings
    /// are decoded a second time.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        if let Ok(parsed) = serde_json::from_value::<T>(value.clone()) {
            return Some(parsed);
        }
        value
            .as_str()
            .and_then(|encoded| serde_json::from_str::<T>(encoded).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value)?;
        self.set_raw(key, encoded);
        Ok(())
    }

    pub fn persona(&self) -> Persona {
        Persona::from_stored(self.get_str(keys::PERSONA))
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.set_raw(keys::PERSONA, Value::String(persona.as_str().to_string()));
    }

    pub fn current_session(&self) -> Option<Uuid> {
        self.get_str(keys::SESSION_ID)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn set_current_session(&mut self, session_id: Uuid) {
        self.set_raw(keys::SESSION_ID, Value::String(session_id.to_string()));
    }

    pub fn usage(&self) -> UsageCounters {
        let personas: Vec<String> = self.get(keys::PERSONAS_TRIED).unwrap_or_default();
        let sessions: Vec<String> = self.get(keys::SESSIONS_INTERACTED).unwrap_or_default();
        UsageCounters {
            messages_sent: self.get(keys::MESSAGE_COUNT).unwrap_or(0),
            personas_tried: personas.iter().filter_map(|id| id.parse().ok()).collect(),
            sessions_interacted: sessions
                .iter()
                .filter_map(|id| Uuid::parse_str(id).ok())
                .collect(),
            history_viewed: self.get(keys::HAS_VIEWED_HISTORY).unwrap_or(false),
        }
    }

    pub fn set_usage(&mut self, usage: &UsageCounters) -> Result<(), StoreError> {
        self.set(keys::MESSAGE_COUNT, &usage.messages_sent)?;
        let personas: Vec<&str> = usage.personas_tried.iter().map(|p| p.as_str()).collect();
        self.set(keys::PERSONAS_TRIED, &personas)?;
        self.set(keys::SESSIONS_INTERACTED, &usage.sessions_interacted)?;
        self.set(keys::HAS_VIEWED_HISTORY, &usage.history_viewed)
    }

    /// The legacy XP/badge copy, if any key of it is still present.
    pub fn legacy_shadow(&self) -> Option<LegacyShadow> {
        let present = [keys::LEGACY_XP, keys::LEGACY_LEVEL, keys::LEGACY_BADGES]
            .iter()
            .any(|key| self.values.contains_key(*key));
        if !present {
            return None;
        }
        let badges: BTreeSet<String> = self.get(keys::LEGACY_BADGES).unwrap_or_default();
        Some(LegacyShadow {
            xp: self.get(keys::LEGACY_XP),
            badges: badges.into_iter().collect(),
        })
    }

    pub fn clear_legacy_shadow(&mut self) {
        for key in [keys::LEGACY_XP, keys::LEGACY_LEVEL, keys::LEGACY_BADGES] {
            self.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("ei-store-{}", Uuid::new_v4()))
            .join("state.json")
    }

    #[test]
    fn missing_file_opens_empty() {
        let store = LocalStore::open(&temp_path()).unwrap();
        assert_eq!(store.persona(), Persona::Friendly);
        assert!(store.current_session().is_none());
        assert!(store.legacy_shadow().is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let path = temp_path();
        let session = Uuid::new_v4();
        let mut store = LocalStore::open(&path).unwrap();
        store.set_persona(Persona::Scifi);
        store.set_current_session(session);
        store.save().unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.persona(), Persona::Scifi);
        assert_eq!(reopened.current_session(), Some(session));
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn legacy_string_encoded_values_are_decoded() {
        let mut store = LocalStore::ephemeral();
        store.set_raw(keys::LEGACY_XP, json!("260"));
        store.set_raw(keys::LEGACY_LEVEL, json!("3"));
        store.set_raw(keys::LEGACY_BADGES, json!("[\"firstEcho\",\"curiousMind\"]"));
        store.set_raw(keys::MESSAGE_COUNT, json!("7"));
        store.set_raw(keys::HAS_VIEWED_HISTORY, json!("true"));

        let shadow = store.legacy_shadow().unwrap();
        assert_eq!(shadow.xp, Some(260));
        assert_eq!(shadow.badges, vec!["curiousMind".to_string(), "firstEcho".to_string()]);

        let usage = store.usage();
        assert_eq!(usage.messages_sent, 7);
        assert!(usage.history_viewed);

        store.clear_legacy_shadow();
        assert!(store.legacy_shadow().is_none());
        assert_eq!(store.usage().messages_sent, 7);
    }

    #[test]
    fn usage_counters_roundtrip_and_skip_unknown_personas() {
        let mut store = LocalStore::ephemeral();
        let mut usage = UsageCounters::default();
        usage.messages_sent = 3;
        usage.personas_tried.insert(Persona::Sage);
        usage.sessions_interacted.insert(Uuid::new_v4());
        store.set_usage(&usage).unwrap();
        assert_eq!(store.usage(), usage);

        store.set_raw(keys::PERSONAS_TRIED, json!(["sage", "pirate"]));
        assert_eq!(store.usage().personas_tried.len(), 1);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = temp_path();
        write_private(&path, b"{not json").unwrap();
        let store = LocalStore::open(&path).unwrap();
        assert!(store.raw(keys::PERSONA).is_none());
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
