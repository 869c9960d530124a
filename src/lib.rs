pub mod commands;
pub mod data;
pub mod error;
pub(crate) mod scope_path;
pub mod services;
pub mod shell;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use error::AppError;
use services::save_service::SaveConfig;
use shell::reveal::SystemReveal;
use state::AppState;

/// Store file under the platform's per-user data directory.
pub fn default_db_path() -> Result<PathBuf, AppError> {
    let dirs = directories::ProjectDirs::from("", "", "tagpole")
        .ok_or_else(|| AppError::General("could not resolve app data dir".to_string()))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("tags.json"))
}

/// Builds the application state the UI layer holds for the process lifetime:
/// loads the persisted store and spawns the background save worker.
pub fn init() -> Result<AppState, AppError> {
    let db_path = default_db_path()?;
    Ok(AppState::new(
        db_path,
        SaveConfig::default(),
        Arc::new(SystemReveal),
    ))
}
