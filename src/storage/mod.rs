//! Storage Module
//!
//! Persistent checkpoints of the bucket tree.
//!
//! ## Responsibilities
//! - Persist the full tree so the WAL can be truncated
//! - Detect torn or corrupted checkpoints on load
//!
//! ## File Format (V1)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header                                 │
//! │ ┌──────────┬──────────┬──────┬───────┐ │
//! │ │Magic (4) │Version(2)│LSN(8)│Len (8)│ │
//! │ └──────────┴──────────┴──────┴───────┘ │
//! ├────────────────────────────────────────┤
//! │ Data (bincode-encoded root bucket)     │
//! ├────────────────────────────────────────┤
//! │ Footer                                 │
//! │ ┌────────────────────────────────────┐ │
//! │ │ CRC32 of data (4)                  │ │
//! │ └────────────────────────────────────┘ │
//! └────────────────────────────────────────┘
//! ```

mod snapshot;

pub use snapshot::Snapshot;

/// File magic
pub const MAGIC: &[u8; 4] = b"BKVS";

/// Format version
pub const VERSION: u16 = 1;

/// Magic + version + LSN + data length
pub const HEADER_SIZE: usize = 4 + 2 + 8 + 8;

/// CRC32 of the data section
pub const FOOTER_SIZE: usize = 4;
