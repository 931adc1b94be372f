//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{BucketKvError, Result};

/// Entry header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest entry body accepted when reading back (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the WAL
///
/// One entry holds every operation of one committed write transaction,
/// so replay is all-or-nothing per transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations committed together
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
///
/// Every path is absolute from the root namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create the bucket at `path` (last segment) if absent
    CreateBucket { path: Vec<Vec<u8>> },

    /// Remove the bucket at `path` with everything beneath it
    DeleteBucket { path: Vec<Vec<u8>> },

    /// Put a key-value pair into the bucket at `path`
    Put {
        path: Vec<Vec<u8>>,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key from the bucket at `path`
    Delete { path: Vec<Vec<u8>>, key: Vec<u8> },
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Encode to the on-disk frame: header + bincode body
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_ENTRY_SIZE as usize {
            return Err(BucketKvError::WalWrite(format!(
                "Entry too large: {} bytes (max {})",
                data.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_be_bytes());
        frame.extend_from_slice(&compute_crc(&data).to_be_bytes());
        frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Decode an entry body after its header has been parsed
    pub fn decode(header: &EntryHeader, data: &[u8]) -> Result<Self> {
        let actual = compute_crc(data);
        if actual != header.crc {
            return Err(BucketKvError::WalCorruption(format!(
                "CRC mismatch at LSN {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| BucketKvError::WalCorruption(format!("undecodable entry: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(BucketKvError::WalCorruption(format!(
                "LSN mismatch: header {}, body {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Parsed fixed-size entry header
#[derive(Debug, Clone, Copy)]
pub struct EntryHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl EntryHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let header = Self {
            lsn: u64::from_be_bytes(lsn),
            crc: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            len: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        };

        if header.len > MAX_ENTRY_SIZE {
            return Err(BucketKvError::WalCorruption(format!(
                "Entry length {} exceeds max {}",
                header.len, MAX_ENTRY_SIZE
            )));
        }

        Ok(header)
    }
}

/// CRC32 of an entry body
pub fn compute_crc(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
