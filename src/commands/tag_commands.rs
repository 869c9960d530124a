//! Facade the UI layer calls into. Handlers validate input, canonicalize
//! paths and delegate to the store and services; nothing here blocks on
//! disk I/O.

use crate::error::AppError;
use crate::scope_path;
use crate::services::batch_service;
use crate::shell::safety::validate_path;
use crate::state::AppState;

/// Remembers the file or directory the UI is working on.
pub fn select_target(state: &AppState, path: &str) -> Result<(), AppError> {
    validate_path(path)?;
    state.select(scope_path::canonical(path));
    Ok(())
}

pub fn add_tags(state: &AppState, path: &str, tags: &[String]) -> Result<(), AppError> {
    validate_path(path)?;
    state.tags.add_tags(path, tags);
    Ok(())
}

/// Tags every file under `path`, in batches, reporting cumulative progress
/// through `progress_sink`. Returns the number of files processed.
pub fn add_tags_to_directory(
    state: &AppState,
    path: &str,
    tags: &[String],
    recursive: bool,
    progress_sink: impl FnMut(usize, usize),
) -> Result<usize, AppError> {
    validate_path(path)?;
    let root = scope_path::canonical(path);
    batch_service::apply_to_directory(&state.tags, &root, tags, recursive, progress_sink)
}

pub fn remove_tag(state: &AppState, path: &str, tag: &str) -> Result<(), AppError> {
    validate_path(path)?;
    state.tags.remove_tag(path, tag);
    Ok(())
}

pub fn list_tags(state: &AppState, path: &str) -> Result<Vec<String>, AppError> {
    Ok(state.tags.get_tags(path))
}

pub fn search(state: &AppState, tags: &[String]) -> Result<Vec<String>, AppError> {
    Ok(state.tags.search_by_tags(tags))
}

/// Shows the file in the system file browser via the injected integration.
pub fn locate_in_file_browser(state: &AppState, path: &str) -> Result<(), AppError> {
    validate_path(path)?;
    state.revealer.reveal(&scope_path::canonical(path))
}
