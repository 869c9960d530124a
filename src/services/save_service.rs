use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::data::persistence::{self, RetryPolicy};
use crate::data::store::TagStore;

#[derive(Debug, Clone)]
pub struct SaveConfig {
    /// Minimum interval between two successful writes; mutations inside one
    /// window coalesce into a single write.
    pub min_write_interval: Duration,
    /// Bounded condvar wait so the worker periodically rechecks the shutdown
    /// flag and retries after a failed write.
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            min_write_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SaveStatus {
    pub saves: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_saved_at: Option<String>,
}

/// Handle to the background save worker. Stopping (or dropping) it signals
/// the worker, which flushes any pending changes best-effort and exits.
pub struct SaveHandle {
    store: Arc<TagStore>,
    status: Arc<Mutex<SaveStatus>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

pub fn spawn(store: Arc<TagStore>, config: SaveConfig) -> SaveHandle {
    let status = Arc::new(Mutex::new(SaveStatus::default()));
    let shutdown = Arc::new(AtomicBool::new(false));

    let worker = thread::spawn({
        let store = store.clone();
        let status = status.clone();
        let shutdown = shutdown.clone();
        move || run(&store, &config, &status, &shutdown)
    });

    SaveHandle {
        store,
        status,
        shutdown,
        worker: Some(worker),
    }
}

impl SaveHandle {
    pub fn status(&self) -> SaveStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.store.wake();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SaveHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(store: &TagStore, config: &SaveConfig, status: &Mutex<SaveStatus>, shutdown: &AtomicBool) {
    // Measuring from spawn makes the first window deterministic: mutations
    // arriving right after startup coalesce into one write.
    let mut last_save = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        if !store.wait_dirty(config.poll_interval) {
            continue;
        }
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let since_last = last_save.elapsed();
        if since_last < config.min_write_interval {
            thread::sleep(config.min_write_interval - since_last);
        }

        if flush_if_dirty(store, config, status) {
            last_save = Instant::now();
        }
    }

    // Last pending write before exit, best effort.
    flush_if_dirty(store, config, status);
}

/// Snapshots under the store lock, writes outside it. A failed write logs,
/// re-sets the dirty flag and leaves the worker alive.
fn flush_if_dirty(store: &TagStore, config: &SaveConfig, status: &Mutex<SaveStatus>) -> bool {
    let Some(snapshot) = store.take_snapshot_if_dirty() else {
        return false;
    };

    match persistence::write_atomic(&snapshot, store.db_path(), &config.retry) {
        Ok(()) => {
            let mut status = status
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            status.saves += 1;
            status.last_error = None;
            status.last_saved_at = Some(chrono::Utc::now().to_rfc3339());
            true
        }
        Err(err) => {
            eprintln!("tag save failed: {err}");
            store.set_dirty_quiet();
            let mut status = status
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            status.failures += 1;
            status.last_error = Some(err.to_string());
            false
        }
    }
}
