use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::data::store::TagStore;
use crate::error::AppError;

/// Files per in-memory mutation burst; the save worker is signaled after
/// each batch so huge directories persist incrementally instead of as one
/// giant transaction.
pub const BATCH_SIZE: usize = 100;

/// Applies `tags` to every file under `root`, in batches, reporting
/// cumulative progress after each batch. Returns the number of files
/// processed. Batches that change nothing do not wake the save worker.
pub fn apply_to_directory(
    store: &TagStore,
    root: &str,
    tags: &[String],
    recursive: bool,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<usize, AppError> {
    let root_path = Path::new(root);
    if !root_path.is_dir() {
        return Err(AppError::General(format!("not a directory: {root}")));
    }

    let files = if recursive {
        collect_recursive(root_path)
    } else {
        collect_top_level(root_path)?
    };

    let total = files.len();
    let mut processed = 0;
    for batch in files.chunks(BATCH_SIZE) {
        store.tag_many(batch, tags);
        processed += batch.len();
        on_progress(processed, total);
    }
    Ok(processed)
}

fn collect_recursive(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                eprintln!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn collect_top_level(root: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("skipping unreadable entry: {err}");
                continue;
            }
        };
        match entry.file_type() {
            Ok(kind) if kind.is_file() => files.push(entry.path()),
            Ok(_) => {}
            Err(err) => eprintln!("skipping unreadable entry: {err}"),
        }
    }
    Ok(files)
}
