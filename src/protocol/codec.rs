//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Method(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{BucketKvError, Result};
use super::{Method, Query, Request, Response, Status};

/// Header size: 1 byte method/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
///
/// Format: method (1) + payload_len (4) + payload
pub fn encode_request(request: &Request) -> Vec<u8> {
    let payload = match request.method {
        Method::Ping => BytesMut::new(),
        _ => encode_query(&request.query),
    };

    frame(request.method as u8, &payload)
}

fn encode_query(query: &Query) -> BytesMut {
    let names: usize = query.bucket.iter().map(|n| 4 + n.len()).sum();
    let value_len = query.value.as_ref().map_or(0, Vec::len);
    let mut payload = BytesMut::with_capacity(4 + names + 4 + query.key.len() + 1 + value_len);

    payload.put_u32(query.bucket.len() as u32);
    for name in &query.bucket {
        payload.put_u32(name.len() as u32);
        payload.put_slice(name);
    }

    payload.put_u32(query.key.len() as u32);
    payload.put_slice(&query.key);

    match &query.value {
        Some(value) => {
            payload.put_u8(1);
            payload.put_slice(value);
        }
        None => payload.put_u8(0),
    }

    payload
}

/// Decode a request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (tag, payload) = split_frame(bytes, "request")?;

    let method = Method::from_byte(tag).ok_or_else(|| {
        BucketKvError::Protocol(format!("Unknown method: 0x{:02x}", tag))
    })?;

    let query = match method {
        Method::Ping => {
            if !payload.is_empty() {
                return Err(BucketKvError::Protocol(format!(
                    "PING: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Query::default()
        }
        _ => decode_query(method, payload)?,
    };

    Ok(Request { method, query })
}

fn decode_query(method: Method, mut payload: &[u8]) -> Result<Query> {
    let count = take_u32(&mut payload, method, "bucket path length")? as usize;

    // Every name needs at least its length prefix
    if count > payload.remaining() / 4 {
        return Err(BucketKvError::Protocol(format!(
            "{:?}: bucket path of {} names exceeds payload",
            method, count
        )));
    }

    let mut bucket = Vec::with_capacity(count);
    for _ in 0..count {
        bucket.push(take_chunk(&mut payload, method, "bucket name")?);
    }

    let key = take_chunk(&mut payload, method, "key")?;

    if !payload.has_remaining() {
        return Err(BucketKvError::Protocol(format!(
            "{:?}: missing value flag",
            method
        )));
    }

    let value = match payload.get_u8() {
        0 if payload.has_remaining() => {
            return Err(BucketKvError::Protocol(format!(
                "{:?}: {} trailing bytes",
                method,
                payload.remaining()
            )));
        }
        0 => None,
        1 => Some(payload.to_vec()),
        flag => {
            return Err(BucketKvError::Protocol(format!(
                "{:?}: invalid value flag 0x{:02x}",
                method, flag
            )));
        }
    };

    Ok(Query { bucket, key, value })
}

fn take_u32(buf: &mut &[u8], method: Method, what: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(BucketKvError::Protocol(format!(
            "{:?}: missing {}",
            method, what
        )));
    }
    Ok(buf.get_u32())
}

fn take_chunk(buf: &mut &[u8], method: Method, what: &str) -> Result<Vec<u8>> {
    let len = take_u32(buf, method, what)? as usize;
    if buf.remaining() < len {
        return Err(BucketKvError::Protocol(format!(
            "{:?}: incomplete {} (expected {}, got {})",
            method,
            what,
            len,
            buf.remaining()
        )));
    }
    let chunk = buf[..len].to_vec();
    buf.advance(len);
    Ok(chunk)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let status = response.status();
    let payload: &[u8] = match status {
        Status::Ok => &[],
        Status::Value => response.value.as_deref().unwrap_or_default(),
        Status::Error => response.error.as_bytes(),
    };

    frame(status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    match status_byte {
        0x00 => Ok(Response::ok(None)),
        0x01 => Ok(Response::ok(Some(payload.to_vec()))),
        0x02 => {
            let message = String::from_utf8(payload.to_vec()).map_err(|_| {
                BucketKvError::Protocol("Error message is not valid UTF-8".to_string())
            })?;
            Ok(Response::error(message))
        }
        _ => Err(BucketKvError::Protocol(format!(
            "Unknown response status: 0x{:02x}",
            status_byte
        ))),
    }
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Validate a complete frame and split off its tag and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(BucketKvError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = check_payload_len(&bytes[1..HEADER_SIZE], what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(BucketKvError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(len_bytes: &[u8], what: &str) -> Result<usize> {
    let payload_len =
        u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(BucketKvError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    Ok(payload_len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len(&header[1..], what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let message = read_frame(reader, "request")?;
    decode_request(&message)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
