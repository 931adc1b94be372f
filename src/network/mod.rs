//! Network Module
//!
//! TCP server, client, and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One reader thread per client connection
//! - Worker thread pool executing requests through the Service

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, RequestHandler};
pub use client::Client;
