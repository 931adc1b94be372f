//! Transactions and bucket handles
//!
//! A [`Transaction`] owns a private root of the bucket tree. Read-only
//! transactions keep the snapshot taken at begin; writers modify their
//! copy and publish it on commit.

use std::cell::{Ref, RefCell};
use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::error::{BucketKvError, Result};
use crate::wal::Operation;
use super::node::{self, BucketNode};
use super::Engine;

/// A unit of work against the engine
///
/// Dropping a transaction without committing rolls it back.
pub struct Transaction<'e> {
    engine: &'e Engine,

    /// This transaction's view of the tree
    root: RefCell<Arc<BucketNode>>,

    /// Operations applied so far, in order (writers only)
    pending: RefCell<Vec<Operation>>,

    /// Held for the whole lifetime of a write transaction
    writer: Option<MutexGuard<'e, ()>>,
}

impl<'e> Transaction<'e> {
    pub(super) fn new(
        engine: &'e Engine,
        root: Arc<BucketNode>,
        writer: Option<MutexGuard<'e, ()>>,
    ) -> Self {
        Self {
            engine,
            root: RefCell::new(root),
            pending: RefCell::new(Vec::new()),
            writer,
        }
    }

    /// Whether this transaction may modify the store
    pub fn writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Handle to the root namespace (holds only buckets in practice)
    pub fn root(&self) -> Bucket<'_, 'e> {
        Bucket {
            tx: self,
            path: Vec::new(),
        }
    }

    /// Root-level bucket `name`, if it exists
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'_, 'e>> {
        self.root().bucket(name)
    }

    /// Create root-level bucket `name` unless it already exists
    pub fn create_bucket_if_not_exists(&self, name: &[u8]) -> Result<Bucket<'_, 'e>> {
        self.root().create_bucket_if_not_exists(name)
    }

    /// Delete root-level bucket `name` and everything beneath it
    pub fn delete_bucket(&self, name: &[u8]) -> Result<()> {
        self.root().delete_bucket(name)
    }

    /// Number of operations this transaction would commit
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Make every change of this transaction durable and visible
    pub fn commit(self) -> Result<()> {
        if self.writer.is_none() {
            return Err(BucketKvError::TxNotWritable);
        }

        let Transaction {
            engine,
            root,
            pending,
            writer,
        } = self;

        let operations = pending.into_inner();
        if operations.is_empty() {
            return Ok(());
        }

        let result = engine.publish(operations, root.into_inner());
        // The writer lock is released only once the new root is visible
        drop(writer);
        result
    }

    /// Discard every change of this transaction
    pub fn rollback(self) {
        if self.writable() {
            tracing::trace!("Rolled back write transaction ({} ops)", self.pending_len());
        }
    }

    // =========================================================================
    // Internal helpers for bucket handles
    // =========================================================================

    /// Node at `path` in this transaction's view
    fn node(&self, path: &[Vec<u8>]) -> Option<Ref<'_, BucketNode>> {
        Ref::filter_map(self.root.borrow(), |root| root.descend(path)).ok()
    }

    fn apply(&self, operation: Operation) -> Result<()> {
        if !self.writable() {
            return Err(BucketKvError::TxNotWritable);
        }
        node::apply(&mut self.root.borrow_mut(), &operation)?;
        self.pending.borrow_mut().push(operation);
        Ok(())
    }
}

/// Handle to one bucket inside a transaction
///
/// Addresses the bucket by its path from the root, so the handle stays
/// valid across copy-on-write updates made through other handles.
pub struct Bucket<'t, 'e> {
    tx: &'t Transaction<'e>,
    path: Vec<Vec<u8>>,
}

impl std::fmt::Debug for Bucket<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<'t, 'e> Bucket<'t, 'e> {
    /// Path of this bucket from the root (empty for the root namespace)
    pub fn path(&self) -> &[Vec<u8>] {
        &self.path
    }

    /// Child bucket `name`, if it exists
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'t, 'e>> {
        let exists = self
            .tx
            .node(&self.path)
            .map_or(false, |node| node.child(name).is_some());

        exists.then(|| self.child_handle(name))
    }

    /// Create child bucket `name` unless it already exists
    ///
    /// An existing bucket is returned without logging anything.
    pub fn create_bucket_if_not_exists(&self, name: &[u8]) -> Result<Bucket<'t, 'e>> {
        if !self.tx.writable() {
            return Err(BucketKvError::TxNotWritable);
        }
        if let Some(existing) = self.bucket(name) {
            return Ok(existing);
        }

        let child = self.child_handle(name);
        self.tx.apply(Operation::CreateBucket {
            path: child.path.clone(),
        })?;
        Ok(child)
    }

    /// Delete child bucket `name` and everything nested in it
    pub fn delete_bucket(&self, name: &[u8]) -> Result<()> {
        self.tx.apply(Operation::DeleteBucket {
            path: self.child_handle(name).path,
        })
    }

    /// Copy of the value stored under `key`
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.tx
            .node(&self.path)
            .and_then(|node| node.value(key).map(<[u8]>::to_vec))
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tx.apply(Operation::Put {
            path: self.path.clone(),
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Remove `key`; a missing key is not an error
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.tx.apply(Operation::Delete {
            path: self.path.clone(),
            key: key.to_vec(),
        })
    }

    /// Number of keys and child buckets directly inside this bucket
    pub fn len(&self) -> usize {
        self.tx.node(&self.path).map_or(0, |node| node.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn child_handle(&self, name: &[u8]) -> Bucket<'t, 'e> {
        let mut path = self.path.clone();
        path.push(name.to_vec());
        Bucket { tx: self.tx, path }
    }
}
