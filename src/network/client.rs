//! TCP Client
//!
//! Blocking client for the request/response protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::{read_response, write_request, Method, Query, Request, Response};

/// A connection to a bucketkv server
///
/// Application-level failures come back inside the [`Response`]; only
/// transport problems surface as `Err`.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one request and wait for its response
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader)
    }

    pub fn create_bucket(&mut self, path: &[Vec<u8>], name: &[u8]) -> Result<Response> {
        self.call_with(Method::CreateBucket, path, name, None)
    }

    pub fn delete_bucket(&mut self, path: &[Vec<u8>], name: &[u8]) -> Result<Response> {
        self.call_with(Method::DeleteBucket, path, name, None)
    }

    pub fn set_key(&mut self, path: &[Vec<u8>], key: &[u8], value: &[u8]) -> Result<Response> {
        self.call_with(Method::SetKey, path, key, Some(value))
    }

    pub fn get_key(&mut self, path: &[Vec<u8>], key: &[u8]) -> Result<Response> {
        self.call_with(Method::GetKey, path, key, None)
    }

    pub fn delete(&mut self, path: &[Vec<u8>], key: &[u8]) -> Result<Response> {
        self.call_with(Method::Delete, path, key, None)
    }

    pub fn ping(&mut self) -> Result<Response> {
        self.call(&Request::ping())
    }

    fn call_with(
        &mut self,
        method: Method,
        path: &[Vec<u8>],
        key: &[u8],
        value: Option<&[u8]>,
    ) -> Result<Response> {
        let query = Query {
            bucket: path.to_vec(),
            key: key.to_vec(),
            value: value.map(<[u8]>::to_vec),
        };
        self.call(&Request::new(method, query))
    }
}
