pub mod accounts;
pub mod history;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Key holding the email of the currently signed-in account.
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Key holding the serialized list of registered accounts.
pub const USERS_KEY: &str = "users";

/// The durable key-value store the accounts and history modules write
/// through. Values are JSON strings; round-trip fidelity is on the caller.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// File-backed store: one JSON object mapping keys to value strings, loaded
/// once at startup and rewritten after every mutation. A missing or corrupt
/// file starts the map empty; corruption is logged, never surfaced.
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    log::warn!(
                        "Store file {} is corrupt, starting empty: {}",
                        path.display(),
                        err
                    );
                    HashMap::new()
                }
            },
            // First run: no file yet.
            Err(_) => HashMap::new(),
        };

        Self { path, entries }
    }

    /// Rewrites the whole map through a temp file and a rename, so a crash
    /// mid-write can never leave a half-written store behind.
    fn flush(&self) {
        let raw = match serde_json::to_string_pretty(&self.entries) {
            Ok(raw) => raw,
            Err(err) => {
                log::error!("Failed to serialize store: {}", err);
                return;
            }
        };

        let tmp = self.path.with_extension("tmp");
        if let Err(err) = fs::write(&tmp, raw).and_then(|_| fs::rename(&tmp, &self.path)) {
            log::error!("Failed to write store file {}: {}", self.path.display(), err);
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }
}
