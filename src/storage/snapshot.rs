//! Snapshot file
//!
//! Checkpoint of the whole bucket tree, tagged with the LSN of the last
//! transaction it contains.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::engine::BucketNode;
use crate::error::{BucketKvError, Result};

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// A loaded snapshot
#[derive(Debug)]
pub struct Snapshot {
    /// LSN of the last transaction folded into `root`
    pub lsn: u64,

    /// Root namespace of the tree
    pub root: BucketNode,
}

impl Snapshot {
    /// Atomically replace the snapshot at `path`
    ///
    /// Writes `{path}.tmp`, fsyncs it, then renames over `path`.
    pub fn write(path: &Path, root: &BucketNode, lsn: u64) -> Result<()> {
        let data = bincode::serialize(root)?;
        let tmp_path = path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;
            writer.write_all(&lsn.to_le_bytes())?;
            writer.write_all(&(data.len() as u64).to_le_bytes())?;
            writer.write_all(&data)?;
            writer.write_all(&crc32fast::hash(&data).to_le_bytes())?;

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, path)?;

        // Persist the rename itself
        if let Some(dir) = path.parent() {
            if let Ok(dir) = File::open(dir) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Load and verify the snapshot at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(BucketKvError::SnapshotCorruption(format!(
                "file too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(BucketKvError::SnapshotCorruption(format!(
                "invalid magic: expected BKVS, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(BucketKvError::SnapshotCorruption(format!(
                "unsupported version: {}",
                version
            )));
        }

        let lsn = read_u64(&bytes[6..14]);
        let declared_len = read_u64(&bytes[14..22]);
        let data_len = bytes.len() - HEADER_SIZE - FOOTER_SIZE;

        if declared_len != data_len as u64 {
            return Err(BucketKvError::SnapshotCorruption(format!(
                "length mismatch: header says {} data bytes, file has {}",
                declared_len, data_len
            )));
        }

        let data = &bytes[HEADER_SIZE..HEADER_SIZE + data_len];
        let footer = &bytes[HEADER_SIZE + data_len..];
        let expected = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual = crc32fast::hash(data);
        if expected != actual {
            return Err(BucketKvError::SnapshotCorruption(format!(
                "CRC mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        let root = bincode::deserialize(data).map_err(|e| {
            BucketKvError::SnapshotCorruption(format!("undecodable tree: {}", e))
        })?;

        Ok(Self { lsn, root })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
