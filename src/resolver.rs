//! Path resolution
//!
//! Maps a bucket path to the bucket it names inside one transaction.

use crate::engine::{Bucket, Transaction};
use crate::error::{BucketKvError, Result};

/// Outcome of resolving a bucket path
pub enum Resolution<'t, 'e> {
    /// Every level exists; the terminal bucket
    Found(Bucket<'t, 'e>),

    /// Some level is missing (or the path was empty)
    NotFound,
}

impl<'t, 'e> Resolution<'t, 'e> {
    /// The resolved bucket, or `PathNotFound`
    pub fn found(self) -> Result<Bucket<'t, 'e>> {
        match self {
            Resolution::Found(bucket) => Ok(bucket),
            Resolution::NotFound => Err(BucketKvError::PathNotFound),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Walk `path` from the root of `tx`, one level at a time
///
/// Stops at the first missing level. Never creates buckets. An empty path
/// names no bucket and yields `NotFound`; callers that treat it as the root
/// namespace must handle it before calling.
pub fn resolve<'t, 'e>(tx: &'t Transaction<'e>, path: &[Vec<u8>]) -> Resolution<'t, 'e> {
    let Some((first, rest)) = path.split_first() else {
        return Resolution::NotFound;
    };

    let mut bucket = match tx.bucket(first) {
        Some(bucket) => bucket,
        None => return Resolution::NotFound,
    };

    for name in rest {
        bucket = match bucket.bucket(name) {
            Some(child) => child,
            None => return Resolution::NotFound,
        };
    }

    Resolution::Found(bucket)
}
