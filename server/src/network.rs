//! Server network layer: listener, accept loop and handler threads

use crate::config::ServerConfig;
use crate::handler::{ExitReason, SessionHandler};
use crate::registry::Registry;
use crate::session::{spawn_position, Session};
use crate::shutdown::{teardown, ShutdownHandle, TeardownReport};
use log::{error, info, warn};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure listener: {0}")]
    Listen(#[source] io::Error),
}

/// Accepts players and runs one handler thread per connection.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: ShutdownHandle,
    config: ServerConfig,
    next_session_id: u32,
}

impl Server {
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        // Non-blocking so the accept loop can observe the run flag.
        listener.set_nonblocking(true).map_err(ServerError::Listen)?;
        let local_addr = listener.local_addr().map_err(ServerError::Listen)?;
        info!("Server listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            registry: Arc::new(Registry::new()),
            shutdown: ShutdownHandle::new(),
            config,
            next_session_id: 1,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts connections until the run flag is cleared, then tears every
    /// session down and releases the listener.
    pub fn run(mut self) -> TeardownReport {
        let mut handlers: Vec<JoinHandle<ExitReason>> = Vec::new();

        while self.shutdown.is_running() {
            match self.listener.accept() {
                Ok((stream, addr)) => match self.spawn_handler(stream, addr) {
                    Ok(handle) => handlers.push(handle),
                    Err(e) => warn!("Failed to start session for {}: {}", addr, e),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    reap_finished(&mut handlers);
                    thread::sleep(self.config.poll_interval);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Accept error: {}", e);
                    thread::sleep(self.config.poll_interval);
                }
            }
        }

        let report = teardown(&self.registry, handlers);
        drop(self.listener);
        info!("Listener on {} released", self.local_addr);
        report
    }

    fn spawn_handler(
        &mut self,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> io::Result<JoinHandle<ExitReason>> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;

        let id = self.next_session_id;
        self.next_session_id = self.next_session_id.wrapping_add(1).max(1);

        let session = Arc::new(Session::new(
            id,
            stream,
            spawn_position(&mut rand::thread_rng()),
        ));
        info!("Accepted connection from {} as player {}", addr, id);

        let handler = SessionHandler::new(
            session,
            Arc::clone(&self.registry),
            self.shutdown.clone(),
            self.config.unknown_tag_policy,
        );
        thread::Builder::new()
            .name(format!("session-{}", id))
            .spawn(move || handler.run())
    }
}

/// Joins handlers that have already exited so the list does not grow with
/// every connection ever accepted.
fn reap_finished(handlers: &mut Vec<JoinHandle<ExitReason>>) {
    let (finished, running): (Vec<_>, Vec<_>) =
        handlers.drain(..).partition(|handle| handle.is_finished());
    *handlers = running;

    for handle in finished {
        if handle.join().is_err() {
            error!("Session handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{recv_message, Message};
    use std::time::{Duration, Instant};

    fn test_config() -> ServerConfig {
        ServerConfig {
            poll_interval: Duration::from_millis(10),
            ..ServerConfig::new("127.0.0.1", 0)
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let server = Server::bind(test_config()).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.registry().is_empty());
        assert!(server.shutdown_handle().is_running());
    }

    #[test]
    fn test_bind_unassigned_address_fails() {
        let result = Server::bind(ServerConfig::new("192.0.2.1", 0));
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_bind_port_in_use_fails() {
        let first = Server::bind(test_config()).unwrap();
        let config = ServerConfig::new("127.0.0.1", first.local_addr().port());
        assert!(matches!(Server::bind(config), Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_run_stops_when_flag_cleared() {
        let server = Server::bind(test_config()).unwrap();
        let shutdown = server.shutdown_handle();
        let runner = thread::spawn(move || server.run());

        shutdown.trigger();
        let report = runner.join().unwrap();
        assert_eq!(report, TeardownReport::default());
    }

    #[test]
    fn test_session_ids_are_unique_and_increasing() {
        let server = Server::bind(test_config()).unwrap();
        let addr = server.local_addr();
        let registry = server.registry();
        let shutdown = server.shutdown_handle();
        let runner = thread::spawn(move || server.run());

        let mut first = TcpStream::connect(addr).unwrap();
        let own = recv_message(&mut first).unwrap().unwrap();
        assert!(matches!(own, Message::PositionUpdate { player_id: 1, .. }));

        let mut second = TcpStream::connect(addr).unwrap();
        let own = recv_message(&mut second).unwrap().unwrap();
        assert!(matches!(own, Message::PositionUpdate { player_id: 2, .. }));

        wait_for(|| registry.len() == 2);
        assert_eq!(registry.ids(), vec![1, 2]);

        shutdown.trigger();
        let report = runner.join().unwrap();
        assert_eq!(report.handlers_joined, 2);
        assert_eq!(report.handlers_failed, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_finished_handlers_are_reaped() {
        let mut handlers: Vec<JoinHandle<ExitReason>> = (0..3)
            .map(|_| thread::spawn(|| ExitReason::PeerClosed))
            .collect();
        wait_for(|| handlers.iter().all(|h| h.is_finished()));

        reap_finished(&mut handlers);
        assert!(handlers.is_empty());
    }
}
