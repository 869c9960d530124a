use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::data::store::{normalize_tag, TagMap};
use crate::error::AppError;
use crate::scope_path;

/// Up to `attempts` tries with exponential backoff between them, absorbing
/// transient file locks (Windows refuses to replace an open file).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

pub fn with_retry<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut delay = policy.base_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.attempts.max(1) {
                    return Err(err);
                }
                thread::sleep(delay);
                delay *= 2;
            }
        }
    }
}

/// Loads the persisted snapshot, failing soft: a missing or empty file is an
/// empty store; an unreadable or unparsable file is renamed to `<name>.backup`
/// (best effort) so bad data leaves a trace instead of being overwritten.
pub fn load(path: &Path) -> TagMap {
    if !path.exists() {
        return TagMap::new();
    }

    let parsed = fs::read_to_string(path)
        .map_err(AppError::from)
        .and_then(|content| {
            if content.trim().is_empty() {
                Ok(TagMap::new())
            } else {
                serde_json::from_str(&content).map_err(AppError::from)
            }
        });

    match parsed {
        Ok(raw) => normalize_loaded(raw),
        Err(err) => {
            eprintln!("tag store unreadable, starting empty: {err}");
            preserve_backup(path);
            TagMap::new()
        }
    }
}

/// Re-applies the store invariants to whatever was on disk: canonical keys,
/// normalized deduplicated tags, no empty entries.
fn normalize_loaded(raw: TagMap) -> TagMap {
    let mut map = TagMap::new();
    for (path, tags) in raw {
        let key = scope_path::canonical(&path);
        let list = map.entry(key).or_insert_with(Vec::new);
        for tag in &tags {
            if let Some(tag) = normalize_tag(tag) {
                if !list.contains(&tag) {
                    list.push(tag);
                }
            }
        }
    }
    map.retain(|_, list| !list.is_empty());
    map
}

fn preserve_backup(path: &Path) {
    let non_empty = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if non_empty {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".backup");
        let _ = fs::rename(path, PathBuf::from(backup));
    }
}

/// Writes the snapshot with the crash-safe temp-file + fsync + rename pattern,
/// retrying per `policy`. The target file is always either the previous or the
/// new fully-written document, never a partial one.
pub fn write_atomic(map: &TagMap, path: &Path, policy: &RetryPolicy) -> Result<(), AppError> {
    with_retry(policy, || write_once(map, path))
}

fn write_once(map: &TagMap, path: &Path) -> Result<(), AppError> {
    // Same directory as the target so the final rename never crosses a
    // filesystem boundary.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tags-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, map)?;
    tmp.as_file().sync_all()?;

    // Windows cannot rename over an open file; remove first and let the
    // retry loop absorb a transient lock.
    #[cfg(windows)]
    if path.exists() {
        fs::remove_file(path)?;
    }

    tmp.persist(path).map_err(|err| AppError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Instant;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }

    fn sample_map() -> TagMap {
        let mut map = TagMap::new();
        map.insert("/data/a.txt".to_string(), vec!["work".to_string(), "draft".to_string()]);
        map.insert("/data/b.txt".to_string(), vec!["work".to_string()]);
        map
    }

    #[test]
    fn round_trip_preserves_the_map() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");
        let map = sample_map();

        write_atomic(&map, &db, &fast_retry()).unwrap();

        assert_eq!(load(&db), map);
    }

    #[test]
    fn write_is_pretty_printed_json() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");

        write_atomic(&sample_map(), &db, &fast_retry()).unwrap();

        let content = fs::read_to_string(&db).unwrap();
        assert!(content.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["/data/b.txt"][0], "work");
    }

    #[test]
    fn write_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");

        write_atomic(&sample_map(), &db, &fast_retry()).unwrap();
        write_atomic(&sample_map(), &db, &fast_retry()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["tags.json".to_string()]);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn load_empty_file_is_empty_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");
        fs::write(&db, "  \n").unwrap();

        assert!(load(&db).is_empty());
        assert!(db.exists());
    }

    #[test]
    fn corrupt_file_is_preserved_as_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");
        fs::write(&db, "{ not valid json").unwrap();

        assert!(load(&db).is_empty());
        assert!(!db.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("tags.json.backup")).unwrap(),
            "{ not valid json"
        );
    }

    #[test]
    fn load_renormalizes_hand_edited_data() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");
        fs::write(
            &db,
            r#"{ "/data/x/": [" Work ", "work", "", "HOME"], "/data/y": ["  "] }"#,
        )
        .unwrap();

        let map = load(&db);
        assert_eq!(
            map.get("/data/x"),
            Some(&vec!["work".to_string(), "home".to_string()])
        );
        assert!(!map.contains_key("/data/y"));
    }

    #[test]
    fn interrupted_write_does_not_corrupt_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tags.json");
        let map = sample_map();
        write_atomic(&map, &db, &fast_retry()).unwrap();

        // A crash before the rename step leaves a stray temp file; the
        // target must still load as the previous snapshot.
        fs::write(dir.path().join(".tags-crashed.tmp"), "{ \"/half\": [").unwrap();

        assert_eq!(load(&db), map);
    }

    #[test]
    fn retry_succeeds_on_third_attempt_with_backoff() {
        let policy = fast_retry();
        let mut calls = 0;
        let started = Instant::now();

        let result = with_retry(&policy, || {
            calls += 1;
            if calls < 3 {
                Err(AppError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "locked",
                )))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
        // Slept base then 2 * base between the three attempts.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn retry_exhaustion_surfaces_the_error() {
        let policy = fast_retry();
        let mut calls = 0;

        let result: Result<(), AppError> = with_retry(&policy, || {
            calls += 1;
            Err(AppError::General("disk full".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
