use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::data::store::TagStore;
use crate::services::save_service::{self, SaveConfig, SaveHandle, SaveStatus};
use crate::shell::reveal::Reveal;

/// Everything the UI layer needs, constructed once at process start and
/// passed into every handler. Owns the shared store, the background save
/// worker and the injected file-browser integration.
pub struct AppState {
    pub tags: Arc<TagStore>,
    pub saver: SaveHandle,
    pub revealer: Arc<dyn Reveal>,
    selected: Mutex<Option<String>>,
}

impl AppState {
    pub fn new(db_path: PathBuf, config: SaveConfig, revealer: Arc<dyn Reveal>) -> Self {
        let tags = Arc::new(TagStore::open(db_path));
        let saver = save_service::spawn(tags.clone(), config);
        Self {
            tags,
            saver,
            revealer,
            selected: Mutex::new(None),
        }
    }

    /// Currently selected file or directory, canonical form.
    pub fn selected(&self) -> Option<String> {
        self.lock_selected().clone()
    }

    pub fn select(&self, path: String) {
        *self.lock_selected() = Some(path);
    }

    pub fn save_status(&self) -> SaveStatus {
        self.saver.status()
    }

    fn lock_selected(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
