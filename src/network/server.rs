//! TCP Server
//!
//! Accepts connections, gives each its own reader thread, and executes
//! requests on a pool of worker threads.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{BucketKvError, Result};
use crate::protocol::{write_response, Request, Response};
use crate::service::Service;

use super::connection::RequestHandler;
use super::Connection;

/// How often the acceptor re-checks the shutdown flag when idle
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Open client sockets, by connection id
type LiveConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for bucketkv
pub struct Server {
    config: Config,
    service: Service,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// One request waiting for a worker
struct Job {
    request: Request,
    reply: Sender<Response>,
}

/// Connection-side end of the worker pool
#[derive(Clone)]
struct Dispatcher {
    jobs: Sender<Job>,
}

impl RequestHandler for Dispatcher {
    fn handle(&self, request: Request) -> Response {
        let (reply, answer) = channel::bounded(1);
        if self.jobs.send(Job { request, reply }).is_err() {
            return Response::error("server shutting down");
        }
        answer
            .recv()
            .unwrap_or_else(|_| Response::error("worker exited"))
    }
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// Port 0 picks a free port; see [`Server::local_addr`].
    pub fn bind(config: Config, service: Service) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            BucketKvError::Network(format!("bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            service,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Start the server (blocking until shutdown)
    pub fn run(self) -> Result<()> {
        let workers = self.config.workers.max(1);
        let max_connections = self.config.max_connections.max(1);

        // Each connection has at most one request in flight
        let (jobs, queue) = channel::bounded::<Job>(max_connections);

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| self.spawn_worker(id, queue.clone()))
            .collect::<std::io::Result<_>>()?;
        drop(queue);

        let dispatcher = Dispatcher { jobs };
        let live: LiveConnections = Arc::new(Mutex::new(HashMap::new()));
        let mut next_id = 0u64;

        tracing::info!("Listening on {} with {} workers", self.local_addr, workers);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping {}: {}", peer, e);
                        continue;
                    }
                    if live.lock().len() >= max_connections {
                        tracing::warn!("Rejecting {}: {} connections open", peer, max_connections);
                        let _ = write_response(&mut stream, &Response::error("server busy"));
                        continue;
                    }

                    next_id += 1;
                    if let Err(e) =
                        self.spawn_connection(next_id, stream, dispatcher.clone(), &live)
                    {
                        tracing::warn!("Dropping {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Shutting down, closing {} connections", live.lock().len());
        drop(dispatcher);
        for stream in live.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        // Workers exit once every connection thread dropped its dispatcher
        for handle in handles {
            let _ = handle.join();
        }

        Ok(())
    }

    fn spawn_worker(&self, id: usize, queue: Receiver<Job>) -> std::io::Result<JoinHandle<()>> {
        let service = self.service.clone();

        thread::Builder::new()
            .name(format!("bucketkv-worker-{}", id))
            .spawn(move || {
                for Job { request, reply } in queue.iter() {
                    let response = service.execute(&request);
                    // The connection may already be gone
                    let _ = reply.send(response);
                }
            })
    }

    fn spawn_connection(
        &self,
        id: u64,
        stream: TcpStream,
        dispatcher: Dispatcher,
        live: &LiveConnections,
    ) -> Result<()> {
        live.lock().insert(id, stream.try_clone()?);

        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;
        let registry = Arc::clone(live);

        let spawned = thread::Builder::new()
            .name(format!("bucketkv-conn-{}", id))
            .spawn(move || {
                let result = Connection::new(stream, dispatcher).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection closed with error: {}", e);
                }
                registry.lock().remove(&id);
            });

        if let Err(e) = spawned {
            live.lock().remove(&id);
            return Err(e.into());
        }
        Ok(())
    }
}
