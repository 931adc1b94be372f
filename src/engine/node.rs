//! Bucket tree
//!
//! Copy-on-write nested map holding every bucket and key of the store.
//! Transactions share subtrees through `Arc` and clone only the nodes on
//! the path they modify, so a reader's snapshot is never disturbed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BucketKvError, Result};
use crate::wal::Operation;

/// Entry stored under a name inside a bucket
///
/// Keys and child bucket names share a single namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    /// A plain value
    Value(Vec<u8>),

    /// A nested bucket
    Bucket(Arc<BucketNode>),
}

/// One bucket: its keys and child buckets in sorted order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketNode {
    entries: BTreeMap<Vec<u8>, Entry>,
}

impl BucketNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child bucket called `name`, if there is one
    pub fn child(&self, name: &[u8]) -> Option<&Arc<BucketNode>> {
        match self.entries.get(name) {
            Some(Entry::Bucket(child)) => Some(child),
            _ => None,
        }
    }

    /// Value stored under `key`; names of child buckets have no value
    pub fn value(&self, key: &[u8]) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(Entry::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Walk `path` down from this node
    pub fn descend(&self, path: &[Vec<u8>]) -> Option<&BucketNode> {
        let mut node = self;
        for name in path {
            node = &**node.child(name)?;
        }
        Some(node)
    }

    /// Number of entries (keys and child buckets)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of child buckets, in order
    pub fn bucket_names(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            Entry::Bucket(_) => Some(name.as_slice()),
            Entry::Value(_) => None,
        })
    }

    /// Key/value pairs, in order
    pub fn values(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().filter_map(|(key, entry)| match entry {
            Entry::Value(value) => Some((key.as_slice(), value.as_slice())),
            Entry::Bucket(_) => None,
        })
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create child bucket `name`; returns whether it was newly created
    fn create_bucket(&mut self, name: &[u8]) -> Result<bool> {
        if name.is_empty() {
            return Err(BucketKvError::BucketNameRequired);
        }
        match self.entries.get(name) {
            Some(Entry::Bucket(_)) => Ok(false),
            Some(Entry::Value(_)) => Err(BucketKvError::IncompatibleValue),
            None => {
                self.entries
                    .insert(name.to_vec(), Entry::Bucket(Arc::new(BucketNode::new())));
                Ok(true)
            }
        }
    }

    fn delete_bucket(&mut self, name: &[u8]) -> Result<()> {
        match self.entries.get(name) {
            Some(Entry::Bucket(_)) => {
                self.entries.remove(name);
                Ok(())
            }
            Some(Entry::Value(_)) => Err(BucketKvError::IncompatibleValue),
            None => Err(BucketKvError::BucketNotFound),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(BucketKvError::KeyRequired);
        }
        if let Some(Entry::Bucket(_)) = self.entries.get(key) {
            return Err(BucketKvError::IncompatibleValue);
        }
        self.entries.insert(key.to_vec(), Entry::Value(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        match self.entries.get(key) {
            Some(Entry::Bucket(_)) => Err(BucketKvError::IncompatibleValue),
            Some(Entry::Value(_)) => {
                self.entries.remove(key);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Mutable access to the bucket at `path`, cloning shared nodes on the way
pub fn descend_mut<'a>(
    root: &'a mut Arc<BucketNode>,
    path: &[Vec<u8>],
) -> Option<&'a mut BucketNode> {
    let mut node = Arc::make_mut(root);
    for name in path {
        node = match node.entries.get_mut(name.as_slice()) {
            Some(Entry::Bucket(child)) => Arc::make_mut(child),
            _ => return None,
        };
    }
    Some(node)
}

/// Apply one logged operation to the tree rooted at `root`
///
/// Used both by live transactions and by WAL replay, so both produce the
/// same tree.
pub fn apply(root: &mut Arc<BucketNode>, operation: &Operation) -> Result<()> {
    match operation {
        Operation::CreateBucket { path } => {
            let (name, parent) = split_last(path)?;
            parent_mut(root, parent)?.create_bucket(name)?;
        }
        Operation::DeleteBucket { path } => {
            let (name, parent) = split_last(path)?;
            parent_mut(root, parent)?.delete_bucket(name)?;
        }
        Operation::Put { path, key, value } => {
            parent_mut(root, path)?.put(key, value)?;
        }
        Operation::Delete { path, key } => {
            parent_mut(root, path)?.delete(key)?;
        }
    }
    Ok(())
}

fn split_last(path: &[Vec<u8>]) -> Result<(&[u8], &[Vec<u8>])> {
    path.split_last()
        .map(|(name, parent)| (name.as_slice(), parent))
        .ok_or(BucketKvError::BucketNameRequired)
}

fn parent_mut<'a>(root: &'a mut Arc<BucketNode>, path: &[Vec<u8>]) -> Result<&'a mut BucketNode> {
    descend_mut(root, path).ok_or(BucketKvError::PathNotFound)
}
