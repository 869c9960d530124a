use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::data::persistence;
use crate::scope_path;

/// Full path -> tag-list mapping, the shape that gets persisted.
pub type TagMap = BTreeMap<String, Vec<String>>;

/// Tags are stored lowercase and trimmed; empty tags are dropped.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

struct StoreInner {
    tags: TagMap,
    dirty: bool,
}

/// In-memory tag store shared between the caller thread and the save worker.
///
/// The map and the dirty flag live under one mutex. Mutations are synchronous
/// and never touch the disk; they flip the dirty flag and wake the save
/// worker, which snapshots under the lock and writes outside it.
pub struct TagStore {
    inner: Mutex<StoreInner>,
    wakeup: Condvar,
    db_path: PathBuf,
}

impl TagStore {
    /// Loads the persisted snapshot (fail-soft) and wraps it in a store.
    pub fn open(db_path: PathBuf) -> Self {
        let tags = persistence::load(&db_path);
        Self {
            inner: Mutex::new(StoreInner { tags, dirty: false }),
            wakeup: Condvar::new(),
            db_path,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock_inner(&self) -> MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds the normalized tags to `path`'s set. Returns true if anything
    /// changed; re-adding existing tags is a no-op and does not wake the
    /// save worker.
    pub fn add_tags(&self, path: &str, tags: &[String]) -> bool {
        let key = scope_path::canonical(path);
        let mut inner = self.lock_inner();
        let changed = apply_tags(&mut inner.tags, &key, tags);
        if changed {
            self.mark_dirty_locked(&mut inner);
        }
        changed
    }

    /// Tags every path in `paths` in one locked pass. Returns how many paths
    /// actually changed; wakes the save worker only when that is non-zero.
    pub fn tag_many(&self, paths: &[PathBuf], tags: &[String]) -> usize {
        let mut inner = self.lock_inner();
        let mut changed = 0;
        for path in paths {
            let key = scope_path::canonical(&path.to_string_lossy());
            if apply_tags(&mut inner.tags, &key, tags) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.mark_dirty_locked(&mut inner);
        }
        changed
    }

    /// Removes one tag. Removing the last tag removes the path entry.
    pub fn remove_tag(&self, path: &str, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        let key = scope_path::canonical(path);
        let mut inner = self.lock_inner();
        let Some(list) = inner.tags.get_mut(&key) else {
            return false;
        };
        let Some(position) = list.iter().position(|t| *t == tag) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            inner.tags.remove(&key);
        }
        self.mark_dirty_locked(&mut inner);
        true
    }

    pub fn get_tags(&self, path: &str) -> Vec<String> {
        let key = scope_path::canonical(path);
        self.lock_inner().tags.get(&key).cloned().unwrap_or_default()
    }

    /// Every path whose tag set contains all of the (normalized) query tags.
    /// An empty normalized query matches nothing.
    pub fn search_by_tags(&self, tags: &[String]) -> Vec<String> {
        let query: Vec<String> = tags.iter().filter_map(|t| normalize_tag(t)).collect();
        if query.is_empty() {
            return Vec::new();
        }
        self.lock_inner()
            .tags
            .iter()
            .filter(|(_, list)| query.iter().all(|tag| list.contains(tag)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Consistent point-in-time copy of the whole map.
    pub fn snapshot(&self) -> TagMap {
        self.lock_inner().tags.clone()
    }

    /// Marks unsaved changes and wakes the save worker.
    pub fn mark_dirty(&self) {
        let mut inner = self.lock_inner();
        self.mark_dirty_locked(&mut inner);
    }

    fn mark_dirty_locked(&self, inner: &mut StoreInner) {
        inner.dirty = true;
        self.wakeup.notify_one();
    }

    /// Re-sets the dirty flag without waking the worker. Used after a failed
    /// write so the next signal or periodic wake retries it instead of the
    /// worker spinning on a persistent error.
    pub(crate) fn set_dirty_quiet(&self) {
        self.lock_inner().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_inner().dirty
    }

    /// Snapshots and clears the dirty flag in one locked step, or returns
    /// None when there is nothing to save. Mutations that land during the
    /// subsequent write re-set the flag and are captured by the next write.
    pub(crate) fn take_snapshot_if_dirty(&self) -> Option<TagMap> {
        let mut inner = self.lock_inner();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(inner.tags.clone())
    }

    /// Blocks until the store is dirty or the timeout elapses; returns the
    /// dirty state observed. The bounded wait lets the worker periodically
    /// recheck its shutdown flag and retry failed writes.
    pub(crate) fn wait_dirty(&self, timeout: Duration) -> bool {
        let inner = self.lock_inner();
        if inner.dirty {
            return true;
        }
        let (inner, _timed_out) = self
            .wakeup
            .wait_timeout(inner, timeout)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.dirty
    }

    pub(crate) fn wake(&self) {
        self.wakeup.notify_all();
    }
}

fn apply_tags(map: &mut TagMap, key: &str, tags: &[String]) -> bool {
    let normalized: Vec<String> = tags.iter().filter_map(|t| normalize_tag(t)).collect();
    if normalized.is_empty() {
        return false;
    }
    let list = map.entry(key.to_string()).or_default();
    let mut changed = false;
    for tag in normalized {
        if !list.contains(&tag) {
            list.push(tag);
            changed = true;
        }
    }
    changed
}
