//! Background maintenance: deferred file deletion and abortable
//! housekeeping tasks, with the two drain operations the upgrade pipeline
//! runs before exit.

use crate::core::{Result, StoreError};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How long the bounded drain waits for compaction-style tasks before
/// aborting them.
pub const DEFAULT_COMPACTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

enum DeletionCommand {
    Delete { paths: Vec<PathBuf> },
    Barrier { done: oneshot::Sender<DeletionStats> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    pub deleted: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    pub completed: usize,
    pub aborted: usize,
}

struct BackgroundTask {
    label: String,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("label", &self.label)
            .finish()
    }
}

/// Owner of all background maintenance work in the process. Deletions are
/// queued to a dedicated worker and always run to completion; other tasks
/// are abortable under drain-timeout pressure.
#[derive(Debug)]
pub struct MaintenanceManager {
    deletion_tx: mpsc::UnboundedSender<DeletionCommand>,
    worker: JoinHandle<()>,
    tasks: Mutex<Vec<BackgroundTask>>,
    accepting: AtomicBool,
}

impl MaintenanceManager {
    pub fn start() -> Self {
        let (deletion_tx, deletion_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deletion_worker(deletion_rx));
        Self {
            deletion_tx,
            worker,
            tasks: Mutex::new(Vec::new()),
            accepting: AtomicBool::new(true),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Queue files for deferred deletion. Once accepted they are deleted
    /// even if the bounded drain later times out.
    pub fn submit_deletion(&self, paths: Vec<PathBuf>) -> Result<()> {
        if !self.is_accepting() {
            return Err(StoreError::Maintenance(
                "Manager is draining; no new work accepted".to_string(),
            ));
        }
        self.deletion_tx
            .send(DeletionCommand::Delete { paths })
            .map_err(|_| StoreError::Maintenance("Deletion worker is gone".to_string()))
    }

    /// Schedule an abortable housekeeping task.
    pub fn spawn_background_task<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if !self.is_accepting() {
            return Err(StoreError::Maintenance(
                "Manager is draining; no new work accepted".to_string(),
            ));
        }
        let task = BackgroundTask {
            label: label.into(),
            handle: tokio::spawn(task),
        };
        self.tasks.lock()?.push(task);
        Ok(())
    }

    /// Bounded drain: refuse new work, wait up to `timeout` for
    /// housekeeping tasks, abort whatever is still running afterwards.
    pub async fn finish_compactions_within(&self, timeout: Duration) -> Result<DrainOutcome> {
        self.accepting.store(false, Ordering::SeqCst);
        let mut pending: Vec<BackgroundTask> = self.tasks.lock()?.drain(..).collect();
        let deadline = Instant::now() + timeout;
        let mut completed = 0usize;

        loop {
            let before = pending.len();
            pending.retain(|task| !task.handle.is_finished());
            completed += before - pending.len();
            if pending.is_empty() || Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let aborted = pending.len();
        for task in &pending {
            warn!("Aborting maintenance task '{}' after drain timeout", task.label);
            task.handle.abort();
        }
        Ok(DrainOutcome { completed, aborted })
    }

    /// Unbounded drain: wait until every queued deletion has been
    /// attempted. Returns the worker's running totals.
    pub async fn wait_for_pending_deletions(&self) -> Result<DeletionStats> {
        let (done, stats) = oneshot::channel();
        self.deletion_tx
            .send(DeletionCommand::Barrier { done })
            .map_err(|_| StoreError::Maintenance("Deletion worker is gone".to_string()))?;
        stats.await.map_err(|_| {
            StoreError::Maintenance("Deletion worker terminated during drain".to_string())
        })
    }
}

impl Drop for MaintenanceManager {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn deletion_worker(mut rx: mpsc::UnboundedReceiver<DeletionCommand>) {
    let mut stats = DeletionStats::default();
    while let Some(command) = rx.recv().await {
        match command {
            DeletionCommand::Delete { paths } => {
                for path in paths {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {
                            stats.deleted += 1;
                            info!("Deleted {}", path.display());
                        }
                        Err(e) => {
                            stats.failed += 1;
                            error!("Failed to delete {}: {}", path.display(), e);
                        }
                    }
                }
            }
            DeletionCommand::Barrier { done } => {
                let _ = done.send(stats);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[tokio::test]
    async fn test_deletions_complete_before_drain_returns() {
        let dir = TempDir::new().unwrap();
        let manager = MaintenanceManager::start();
        let paths: Vec<PathBuf> = (0..20).map(|i| touch(&dir, &format!("f{}", i))).collect();

        manager.submit_deletion(paths.clone()).unwrap();
        let stats = manager.wait_for_pending_deletions().await.unwrap();

        assert_eq!(stats.deleted, 20);
        assert_eq!(stats.failed, 0);
        for path in paths {
            assert!(!path.exists());
        }
    }

    #[tokio::test]
    async fn test_missing_file_counts_as_failed() {
        let dir = TempDir::new().unwrap();
        let manager = MaintenanceManager::start();
        let present = touch(&dir, "present");
        let missing = dir.path().join("missing");

        manager.submit_deletion(vec![present.clone(), missing]).unwrap();
        let stats = manager.wait_for_pending_deletions().await.unwrap();

        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.failed, 1);
        assert!(!present.exists());
    }

    #[tokio::test]
    async fn test_bounded_drain_waits_for_quick_tasks() {
        let manager = MaintenanceManager::start();
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            let counter = counter.clone();
            manager
                .spawn_background_task("quick", async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        let outcome = manager
            .finish_compactions_within(Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outcome.completed, 3);
        assert_eq!(outcome.aborted, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bounded_drain_aborts_stuck_tasks() {
        let manager = MaintenanceManager::start();
        manager
            .spawn_background_task("stuck", async {
                tokio::time::sleep(Duration::from_secs(600)).await;
            })
            .unwrap();

        let started = Instant::now();
        let outcome = manager
            .finish_compactions_within(Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.aborted, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_no_new_work_after_drain_begins() {
        let dir = TempDir::new().unwrap();
        let manager = MaintenanceManager::start();
        manager
            .finish_compactions_within(Duration::from_millis(10))
            .await
            .unwrap();

        assert!(!manager.is_accepting());
        let path = touch(&dir, "late");
        assert!(manager.submit_deletion(vec![path.clone()]).is_err());
        assert!(manager.spawn_background_task("late", async {}).is_err());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_deletions_survive_bounded_drain_timeout() {
        let dir = TempDir::new().unwrap();
        let manager = MaintenanceManager::start();
        let path = touch(&dir, "obsolete");
        manager.submit_deletion(vec![path.clone()]).unwrap();
        manager
            .spawn_background_task("stuck", async {
                tokio::time::sleep(Duration::from_secs(600)).await;
            })
            .unwrap();

        manager
            .finish_compactions_within(Duration::from_millis(20))
            .await
            .unwrap();
        let stats = manager.wait_for_pending_deletions().await.unwrap();

        assert_eq!(stats.deleted, 1);
        assert!(!path.exists());
    }
}
