//! Server-side record of one connected player
//!
//! A `Session` owns the player's TCP stream and current position. Only the
//! session's own handler thread changes the position; every other thread
//! reads a copy of it while holding the registry lock.

use log::warn;
use rand::Rng;
use shared::{recv_message, send_message, Direction, FrameError, Message, Position};
use shared::{BOARD_HEIGHT, BOARD_WIDTH};
use std::io::{self, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
pub struct Session {
    id: u32,
    addr: Option<SocketAddr>,
    stream: TcpStream,
    position: Mutex<Position>,
}

impl Session {
    pub fn new(id: u32, stream: TcpStream, position: Position) -> Self {
        Self {
            id,
            addr: stream.peer_addr().ok(),
            stream,
            position: Mutex::new(position),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Copy of the current position.
    pub fn position(&self) -> Position {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves one unit in `direction` and returns the new position.
    pub(crate) fn apply_move(&self, direction: Direction) -> Position {
        let mut position = self.position.lock().unwrap_or_else(PoisonError::into_inner);
        *position = position.step(direction);
        *position
    }

    pub fn position_update(&self) -> Message {
        let Position { x, y } = self.position();
        Message::PositionUpdate {
            player_id: self.id,
            x,
            y,
        }
    }

    /// Writes one message to the player.
    ///
    /// Callers must hold the registry lock so frames from different
    /// broadcasts never interleave on the stream.
    pub(crate) fn send(&self, message: &Message) -> Result<(), FrameError> {
        let mut stream = &self.stream;
        send_message(&mut stream, message)
    }

    /// Blocks until the next message from the player. Only the handler
    /// thread reads.
    pub(crate) fn recv(&self) -> Result<Option<Message>, FrameError> {
        let mut stream = &self.stream;
        recv_message(&mut stream)
    }

    /// Closes the read direction only, waking a handler blocked in `recv`
    /// while leaving in-flight writes to this player intact.
    pub fn shutdown_read(&self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Read)
    }

    pub fn close(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != ErrorKind::NotConnected {
                warn!("Failed to close connection for player {}: {}", self.id, e);
            }
        }
    }
}

/// Picks a random starting cell inside the board walls.
pub fn spawn_position<R: Rng>(rng: &mut R) -> Position {
    Position::new(
        rng.gen_range(1..BOARD_WIDTH - 1),
        rng.gen_range(1..BOARD_HEIGHT - 1),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::time::Duration;

    /// Returns a session backed by a loopback connection together with the
    /// remote end a test can read from and write to.
    pub fn session_pair(id: u32, position: Position) -> (Arc<Session>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let remote = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        remote
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        (Arc::new(Session::new(id, server_side, position)), remote)
    }

    /// Asserts nothing arrives on `remote` within a short window.
    pub fn assert_silent(remote: &TcpStream) {
        let mut probe = [0u8; 1];
        remote
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let result = remote.peek(&mut probe);
        remote
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        match result {
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            other => panic!("Expected no data, got {:?}", other),
        }
    }

    pub fn read_message(remote: &mut TcpStream) -> Message {
        recv_message(remote)
            .expect("frame error")
            .expect("connection closed")
    }
}
