//! # bucketkv
//!
//! A nested-bucket key-value store served over a small binary RPC protocol:
//! - Buckets nest to any depth; keys live inside buckets
//! - Every request runs in exactly one transaction
//! - Single-writer/multi-reader transactions over a copy-on-write tree
//! - Write-Ahead Logging (WAL) and snapshots for durability
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │      (Acceptor + Connection Threads + Worker Pool)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Request / Response
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Service                                 │
//! │        (one transaction per call, error mapping)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ resolve(path)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                  │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  Snapshot   │
//!   │  (Append)   │          │ (Checkpoint)│
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bucketkv::{Config, Engine, Service};
//!
//! # fn main() -> bucketkv::Result<()> {
//! let engine = Arc::new(Engine::open(Config::default())?);
//! let service = Service::new(engine);
//!
//! service.create_bucket(&[], b"users")?;
//! service.set_key(&[b"users".to_vec()], b"alice", b"admin")?;
//! assert_eq!(service.get_key(&[b"users".to_vec()], b"alice")?, b"admin");
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod storage;
pub mod engine;
pub mod resolver;
pub mod service;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BucketKvError, ErrorKind, Result};
pub use config::Config;
pub use engine::Engine;
pub use service::Service;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bucketkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
