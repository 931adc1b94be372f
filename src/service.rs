//! Service Module
//!
//! The operations clients invoke, each run in exactly one transaction.
//!
//! ## Transaction policy
//! - `get_key`: read-only transaction
//! - everything else: read-write transaction, committed on success and
//!   rolled back on any error
//!
//! Errors stay typed inside the service and are rendered into a
//! [`Response`] only by [`Service::execute`].

use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{BucketKvError, Result};
use crate::protocol::{Method, Query, Request, Response};
use crate::resolver::resolve;

/// Request handler shared by all request workers
///
/// Holds nothing but the engine handle, so it is freely shared across
/// threads.
#[derive(Clone)]
pub struct Service {
    engine: Arc<Engine>,
}

impl Service {
    /// Create a service over `engine`
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// The engine this service runs against
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Create bucket `name` under `path` (at the root if `path` is empty)
    ///
    /// Succeeds if the bucket already exists.
    pub fn create_bucket(&self, path: &[Vec<u8>], name: &[u8]) -> Result<()> {
        self.engine.update(|tx| {
            if path.is_empty() {
                tx.create_bucket_if_not_exists(name)?;
            } else {
                resolve(tx, path).found()?.create_bucket_if_not_exists(name)?;
            }
            Ok(())
        })
    }

    /// Store `value` under `key` in the bucket at `path`
    pub fn set_key(&self, path: &[Vec<u8>], key: &[u8], value: &[u8]) -> Result<()> {
        self.engine
            .update(|tx| resolve(tx, path).found()?.put(key, value))
    }

    /// Read the value under `key` in the bucket at `path`
    pub fn get_key(&self, path: &[Vec<u8>], key: &[u8]) -> Result<Vec<u8>> {
        self.engine.view(|tx| {
            resolve(tx, path)
                .found()?
                .get(key)
                .ok_or(BucketKvError::KeyNotFound)
        })
    }

    /// Remove `key` from the bucket at `path`; a missing key is fine
    pub fn delete(&self, path: &[Vec<u8>], key: &[u8]) -> Result<()> {
        self.engine
            .update(|tx| resolve(tx, path).found()?.delete(key))
    }

    /// Remove bucket `name` under `path` (at the root if `path` is empty)
    /// together with everything nested in it
    pub fn delete_bucket(&self, path: &[Vec<u8>], name: &[u8]) -> Result<()> {
        self.engine.update(|tx| {
            if path.is_empty() {
                tx.delete_bucket(name)
            } else {
                resolve(tx, path).found()?.delete_bucket(name)
            }
        })
    }

    /// Run one request and render the outcome as a response
    ///
    /// Never fails: every error becomes the response's error string.
    pub fn execute(&self, request: &Request) -> Response {
        let Request { method, query } = request;
        tracing::trace!("Executing {:?} at depth {}", method, query.bucket.len());

        let result = self.dispatch(*method, query);
        if let Err(e) = &result {
            match e.kind() {
                crate::ErrorKind::Engine => {
                    tracing::warn!("{:?} failed: {}", method, e)
                }
                _ => tracing::debug!("{:?}: {}", method, e),
            }
        }

        Response::from_result(result)
    }

    fn dispatch(&self, method: Method, query: &Query) -> Result<Option<Vec<u8>>> {
        match method {
            Method::CreateBucket => self.create_bucket(&query.bucket, &query.key).map(|_| None),
            Method::SetKey => {
                let value = query.value.as_deref().unwrap_or_default();
                self.set_key(&query.bucket, &query.key, value).map(|_| None)
            }
            Method::GetKey => self.get_key(&query.bucket, &query.key).map(Some),
            Method::Delete => self.delete(&query.bucket, &query.key).map(|_| None),
            Method::DeleteBucket => self.delete_bucket(&query.bucket, &query.key).map(|_| None),
            Method::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }
}
