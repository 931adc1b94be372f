//! Request definitions
//!
//! Represents calls from clients.

/// RPC methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    CreateBucket = 0x01,
    SetKey = 0x02,
    GetKey = 0x03,
    Delete = 0x04,
    DeleteBucket = 0x05,
    Ping = 0x06,
}

impl Method {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Method::CreateBucket),
            0x02 => Some(Method::SetKey),
            0x03 => Some(Method::GetKey),
            0x04 => Some(Method::Delete),
            0x05 => Some(Method::DeleteBucket),
            0x06 => Some(Method::Ping),
            _ => None,
        }
    }
}

/// Arguments of a call
///
/// For `CreateBucket` and `DeleteBucket`, `key` is the name of the bucket
/// created or deleted under `bucket`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Bucket path from the root
    pub bucket: Vec<Vec<u8>>,

    pub key: Vec<u8>,

    /// Only used by `SetKey`
    pub value: Option<Vec<u8>>,
}

impl Query {
    /// Query addressing the bucket at `path`
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Self {
            bucket: path.into_iter().map(|s| s.as_ref().to_vec()).collect(),
            key: Vec::new(),
            value: None,
        }
    }

    pub fn key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    pub fn value(mut self, value: impl AsRef<[u8]>) -> Self {
        self.value = Some(value.as_ref().to_vec());
        self
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub query: Query,
}

impl Request {
    pub fn new(method: Method, query: Query) -> Self {
        Self { method, query }
    }

    /// Health check
    pub fn ping() -> Self {
        Self::new(Method::Ping, Query::default())
    }
}
