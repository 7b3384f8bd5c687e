use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::notifications::NotificationLog;
use crate::state::{AppState, UserTeam};
use crate::watchlist::Watchlist;

const STATE_VERSION: u32 = 1;

/// The user-owned slice of application state that survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub user_team: UserTeam,
    #[serde(default)]
    pub watchlist: Watchlist,
    #[serde(default)]
    pub notifications: NotificationLog,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            user_team: UserTeam::default(),
            watchlist: Watchlist::default(),
            notifications: NotificationLog::default(),
        }
    }
}

impl PersistedState {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            version: STATE_VERSION,
            user_team: state.user_team.clone(),
            watchlist: state.watchlist.clone(),
            notifications: state.notifications.clone(),
        }
    }

    pub fn restore_into(self, state: &mut AppState) {
        state.user_team = self.user_team;
        state.watchlist = self.watchlist;
        state.notifications = self.notifications;
    }
}

pub trait Repository: Send + Sync {
    fn load(&self) -> Result<PersistedState>;
    fn save(&self, state: &PersistedState) -> Result<()>;
}

impl<R: Repository + ?Sized> Repository for Arc<R> {
    fn load(&self) -> Result<PersistedState> {
        (**self).load()
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        (**self).save(state)
    }
}

/// JSON file written through a temporary sibling and renamed into place.
/// A missing file, or one written under another version, loads as defaults.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Repository for JsonFileRepository {
    fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        let saved: PersistedState = serde_json::from_str(&raw)?;
        if saved.version != STATE_VERSION {
            warn!(
                found = saved.version,
                expected = STATE_VERSION,
                "saved state version mismatch, starting fresh"
            );
            return Ok(PersistedState::default());
        }
        Ok(saved)
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    saved: Mutex<Option<PersistedState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
        }
    }

    pub fn saved(&self) -> Option<PersistedState> {
        self.saved.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Repository for MemoryRepository {
    fn load(&self) -> Result<PersistedState> {
        let guard = self
            .saved
            .lock()
            .map_err(|_| Error::Storage("repository lock poisoned".to_string()))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let mut guard = self
            .saved
            .lock()
            .map_err(|_| Error::Storage("repository lock poisoned".to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{Notification, NotificationKind};
    use crate::state::Pick;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("xgaffer-persist-{}-{name}", std::process::id()))
            .join("state.json")
    }

    fn sample() -> PersistedState {
        let mut state = PersistedState::default();
        state.user_team.picks = vec![Pick::new(7, 1), Pick::new(9, 2)];
        state.user_team.transfers = 2;
        state.watchlist.add(30);
        state.watchlist.add(31);
        state.notifications.push(Notification::new(
            NotificationKind::Success,
            "Transfer complete",
            "In: 9",
        ));
        state
    }

    #[test]
    fn missing_file_loads_defaults() {
        let repo = JsonFileRepository::new(temp_path("missing"));
        assert_eq!(repo.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn saved_state_survives_reload() {
        let path = temp_path("reload");
        let repo = JsonFileRepository::new(&path);
        repo.save(&sample()).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = JsonFileRepository::new(&path).load().unwrap();
        assert_eq!(loaded.user_team.transfers, 2);
        assert_eq!(loaded.watchlist.iter().collect::<Vec<_>>(), vec![31, 30]);
        assert_eq!(loaded.notifications.len(), 1);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn other_version_is_discarded() {
        let path = temp_path("version");
        let repo = JsonFileRepository::new(&path);
        let mut old = sample();
        old.version = STATE_VERSION + 1;
        repo.save(&old).unwrap();
        assert_eq!(repo.load().unwrap(), PersistedState::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
