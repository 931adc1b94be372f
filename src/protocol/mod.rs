//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Method(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Methods
//! - 0x01: CREATE_BUCKET - Payload: query (key = bucket name)
//! - 0x02: SET_KEY       - Payload: query with value
//! - 0x03: GET_KEY       - Payload: query
//! - 0x04: DELETE        - Payload: query
//! - 0x05: DELETE_BUCKET - Payload: query (key = bucket name)
//! - 0x06: PING          - Payload: empty
//!
//! ### Query Payload
//! ```text
//! path_count (4) | { name_len (4) | name }* | key_len (4) | key | has_value (1) | value
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK     - empty payload
//! - 0x01: VALUE  - payload is the value
//! - 0x02: ERROR  - payload is the UTF-8 error message

mod request;
mod response;
mod codec;

pub use request::{Method, Query, Request};
pub use response::{Response, Status};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
