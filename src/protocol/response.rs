//! Response definitions
//!
//! Represents responses to clients.

use crate::error::Result;

/// Response status codes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Success without a value
    Ok = 0x00,

    /// Success carrying a value
    Value = 0x01,

    /// Failure; payload is the error message
    Error = 0x02,
}

/// A response to send to client
///
/// `error` is empty on success. `value` is only ever set on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub value: Option<Vec<u8>>,
    pub error: String,
}

impl Response {
    /// Create a successful response with optional value
    pub fn ok(value: Option<Vec<u8>>) -> Self {
        Self {
            value,
            error: String::new(),
        }
    }

    /// Create a failed response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            value: None,
            error: message.into(),
        }
    }

    /// Render an operation outcome
    pub fn from_result(result: Result<Option<Vec<u8>>>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::error(e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }

    /// Wire status for this response
    pub fn status(&self) -> Status {
        match (&self.value, self.error.is_empty()) {
            (_, false) => Status::Error,
            (Some(_), true) => Status::Value,
            (None, true) => Status::Ok,
        }
    }

    /// Value on success, error message otherwise
    pub fn into_result(self) -> std::result::Result<Option<Vec<u8>>, String> {
        if self.error.is_empty() {
            Ok(self.value)
        } else {
            Err(self.error)
        }
    }
}
