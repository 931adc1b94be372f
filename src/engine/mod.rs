//! Engine Module
//!
//! The embedded transactional storage engine behind the service.
//!
//! ## Responsibilities
//! - Hand out read-only and read-write transactions
//! - Publish committed trees and log them to the WAL
//! - Checkpoint the tree into a snapshot when the WAL grows
//! - Manage crash recovery on startup

mod node;
mod tx;

pub use node::{BucketNode, Entry};
pub use tx::{Bucket, Transaction};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{BucketKvError, Result};
use crate::storage::Snapshot;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writers**: Serialized by `write_lock`, held from `begin(true)` until
///   commit or rollback. Acquisition waits at most `tx_timeout_ms`.
///
/// - **Readers**: Never block on writers. Each read transaction clones the
///   `Arc` of the current root and reads that snapshot until it ends.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Last committed tree; swapped wholesale on commit
    current: RwLock<Arc<BucketNode>>,

    /// Write-ahead log for durability
    wal: Mutex<WalWriter>,

    /// Serializes write transactions
    write_lock: Mutex<()>,

    snapshot_path: PathBuf,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_FILENAME: &'static str = "snapshot.db";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the last snapshot if one exists
    /// 3. Replay WAL entries newer than the snapshot
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        let (mut root, snapshot_lsn) = if snapshot_path.exists() {
            let snapshot = Snapshot::load(&snapshot_path)?;
            tracing::info!("Loaded snapshot at LSN {}", snapshot.lsn);
            (Arc::new(snapshot.root), snapshot.lsn)
        } else {
            (Arc::new(BucketNode::new()), 0)
        };

        let mut last_lsn = snapshot_lsn;
        let mut replayed = 0u64;

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }

            for entry in entries.iter().filter(|e| e.lsn > snapshot_lsn) {
                for operation in &entry.operations {
                    node::apply(&mut root, operation).map_err(|e| {
                        BucketKvError::WalCorruption(format!(
                            "replay of LSN {} failed: {}",
                            entry.lsn, e
                        ))
                    })?;
                }
                last_lsn = entry.lsn;
                replayed += 1;
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy, last_lsn + 1)?;

        // Fold replayed entries into a fresh snapshot so the WAL starts empty
        if replayed > 0 {
            tracing::info!("Checkpointing {} replayed transactions", replayed);
            Snapshot::write(&snapshot_path, &root, last_lsn)?;
            wal.truncate()?;
        }

        Ok(Self {
            config,
            current: RwLock::new(root),
            wal: Mutex::new(wal),
            write_lock: Mutex::new(()),
            snapshot_path,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begin a transaction; `write` selects a read-write transaction
    pub fn begin(&self, write: bool) -> Result<Transaction<'_>> {
        if !write {
            return Ok(Transaction::new(self, self.current.read().clone(), None));
        }

        let timeout = self.config.tx_timeout_ms;
        let guard = self
            .write_lock
            .try_lock_for(Duration::from_millis(timeout))
            .ok_or(BucketKvError::TransactionTimeout(timeout))?;

        // Read the root only after winning the lock so no commit is missed
        let root = self.current.read().clone();
        Ok(Transaction::new(self, root, Some(guard)))
    }

    /// Begin a read-only transaction
    pub fn begin_read(&self) -> Result<Transaction<'_>> {
        self.begin(false)
    }

    /// Begin a read-write transaction
    pub fn begin_write(&self) -> Result<Transaction<'_>> {
        self.begin(true)
    }

    /// Run `f` in a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.begin(false)?;
        let result = f(&tx);
        tx.rollback();
        result
    }

    /// Run `f` in a read-write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.begin(true)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    /// Log and publish a committed write transaction
    ///
    /// Called with the writer lock held.
    pub(crate) fn publish(&self, operations: Vec<Operation>, root: Arc<BucketNode>) -> Result<()> {
        let count = operations.len();
        let (lsn, wal_size) = {
            let mut wal = self.wal.lock();
            let lsn = wal.append(operations)?;
            (lsn, wal.size())
        };

        *self.current.write() = root;
        tracing::trace!("Committed LSN {} ({} ops)", lsn, count);

        let threshold = self.config.checkpoint_threshold;
        // The commit is already durable in the WAL; a failed checkpoint is
        // retried on the next commit.
        if threshold > 0 && wal_size >= threshold {
            if let Err(e) = self.checkpoint_internal() {
                tracing::warn!("Checkpoint after LSN {} failed: {}", lsn, e);
            }
        }

        Ok(())
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Write a snapshot of the current tree and truncate the WAL
    pub fn checkpoint(&self) -> Result<()> {
        let timeout = self.config.tx_timeout_ms;
        let _write_guard = self
            .write_lock
            .try_lock_for(Duration::from_millis(timeout))
            .ok_or(BucketKvError::TransactionTimeout(timeout))?;

        self.checkpoint_internal()
    }

    /// Internal checkpoint implementation (called with write lock held)
    fn checkpoint_internal(&self) -> Result<()> {
        let root = self.current.read().clone();
        let mut wal = self.wal.lock();
        let lsn = wal.current_lsn();

        wal.sync()?;
        Snapshot::write(&self.snapshot_path, &root, lsn)?;
        wal.truncate()?;

        tracing::debug!("Checkpoint written at LSN {}", lsn);
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints so the next open starts from the snapshot alone
    pub fn close(self) -> Result<()> {
        if self.wal.lock().size() > 0 {
            self.checkpoint()?;
        }
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// LSN of the last committed write transaction
    pub fn last_lsn(&self) -> u64 {
        self.wal.lock().current_lsn()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
