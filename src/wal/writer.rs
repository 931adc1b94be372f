//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! An append either lands as one whole frame or leaves the file exactly as
//! it was. When a failed write cannot be undone the writer refuses every
//! later append.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{BucketKvError, Result};
use super::{Operation, WalEntry};

/// File operations the WAL writer relies on
///
/// Implemented for [`File`]; other implementations let tests inject I/O
/// failures.
pub trait WalFile: Write {
    /// Current length in bytes
    fn file_len(&self) -> io::Result<u64>;

    /// Cut or extend the file to `size` bytes
    fn set_len(&self, size: u64) -> io::Result<()>;

    /// Flush file contents to stable storage
    fn sync_data(&self) -> io::Result<()>;

    /// Flush contents and metadata to stable storage
    fn sync_all(&self) -> io::Result<()>;
}

impl WalFile for File {
    fn file_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, size: u64) -> io::Result<()> {
        File::set_len(self, size)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// Writes entries to the WAL file
pub struct WalWriter<F: WalFile = File> {
    /// Opened in append mode; frames are written whole, never buffered
    /// across appends
    file: F,

    path: PathBuf,

    /// LSN handed to the next appended entry
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    /// Length of the file up to the end of the last complete frame
    size: u64,

    /// Set once the file may hold bytes that could not be removed
    failed: bool,
}

impl WalWriter<File> {
    /// Open or create a WAL file for appending
    ///
    /// `next_lsn` is the LSN the first appended entry will carry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::from_file(file, path, sync_strategy, next_lsn)
    }
}

impl<F: WalFile> WalWriter<F> {
    /// Wrap an already opened append-mode file
    ///
    /// `path` is used for logging only.
    pub fn from_file(
        file: F,
        path: &Path,
        sync_strategy: WalSyncStrategy,
        next_lsn: u64,
    ) -> Result<Self> {
        let size = file.file_len()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            next_lsn,
            sync_strategy,
            unsynced: 0,
            size,
            failed: false,
        })
    }

    /// Append one entry holding `operations`, returning its LSN
    ///
    /// On error nothing of the entry remains in the file and the LSN is
    /// not consumed.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        self.check_usable()?;

        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operations).encode()?;

        if let Err(e) = self.file.write_all(&frame).and_then(|_| self.file.flush()) {
            self.discard_tail(lsn);
            return Err(BucketKvError::WalWrite(format!("append LSN {}: {}", lsn, e)));
        }

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count.max(1),
        };
        if due {
            if let Err(e) = self.file.sync_data() {
                // Durability of everything since the last good fsync is unknown
                self.discard_tail(lsn);
                self.failed = true;
                return Err(BucketKvError::WalWrite(format!("sync LSN {}: {}", lsn, e)));
            }
            self.unsynced = 0;
        } else {
            self.unsynced += 1;
        }

        self.next_lsn += 1;
        self.size += frame.len() as u64;

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.check_usable()?;

        if let Err(e) = self.file.flush().and_then(|_| self.file.sync_data()) {
            self.failed = true;
            return Err(BucketKvError::WalWrite(format!("sync: {}", e)));
        }
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (after a checkpoint made them redundant)
    ///
    /// LSNs keep counting up so they stay comparable with the snapshot.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.size = 0;
        self.unsynced = 0;
        self.failed = false;
        tracing::debug!("Truncated WAL {}", self.path.display());
        Ok(())
    }

    /// LSN of the last appended entry (0 if none yet)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn.saturating_sub(1)
    }

    /// Current WAL size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether an earlier write error left the log unusable
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_usable(&self) -> Result<()> {
        if self.failed {
            return Err(BucketKvError::WalWrite(format!(
                "WAL {} is unusable after an earlier write error",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Cut off whatever part of a failed frame reached the file
    fn discard_tail(&mut self, lsn: u64) {
        let restored = self
            .file
            .set_len(self.size)
            .and_then(|_| self.file.sync_data());

        if let Err(e) = restored {
            tracing::error!(
                "Could not remove failed LSN {} from WAL {}: {}",
                lsn,
                self.path.display(),
                e
            );
            self.failed = true;
        }
    }
}
