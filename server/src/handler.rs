//! Per-connection control loop
//!
//! A handler registers its session, receives key presses, moves its own
//! player and fans the new position out to everyone, mover included. When the
//! loop ends for any reason the session is removed, the remaining players are
//! told, and the connection is closed.

use crate::config::UnknownTagPolicy;
use crate::registry::Registry;
use crate::session::Session;
use crate::shutdown::ShutdownHandle;
use log::{debug, info, warn};
use shared::{FrameError, KeyAction, Message};
use std::sync::Arc;

/// Why a session's receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The player closed the connection between messages.
    PeerClosed,
    /// The player pressed escape.
    Quit,
    /// The server is shutting down.
    Shutdown,
    /// The transport failed or the player left mid-message.
    TransportError,
    /// The player sent an unrecognised tag and the policy is to disconnect.
    ProtocolError,
    /// The session could not be registered.
    Rejected,
}

pub struct SessionHandler {
    session: Arc<Session>,
    registry: Arc<Registry>,
    shutdown: ShutdownHandle,
    unknown_tag_policy: UnknownTagPolicy,
}

impl SessionHandler {
    pub fn new(
        session: Arc<Session>,
        registry: Arc<Registry>,
        shutdown: ShutdownHandle,
        unknown_tag_policy: UnknownTagPolicy,
    ) -> Self {
        Self {
            session,
            registry,
            shutdown,
            unknown_tag_policy,
        }
    }

    /// Runs the session to completion on the calling thread.
    pub fn run(self) -> ExitReason {
        let id = self.session.id();

        if !self.registry.join(Arc::clone(&self.session)) {
            self.session.close();
            return ExitReason::Rejected;
        }
        let start = self.session.position();
        info!(
            "Player {} joined from {} at ({}, {})",
            id,
            self.peer(),
            start.x,
            start.y
        );

        // A shutdown that began before registration finished will not have
        // half-closed this session, so check before blocking.
        let reason = if self.shutdown.is_running() {
            self.receive_loop()
        } else {
            ExitReason::Shutdown
        };

        self.disconnect(reason);
        reason
    }

    fn receive_loop(&self) -> ExitReason {
        loop {
            let outcome = match self.session.recv() {
                Ok(Some(message)) => self.process(message),
                Ok(None) => Some(self.closed_reason(ExitReason::PeerClosed)),
                Err(e) => self.frame_error(e),
            };
            if let Some(reason) = outcome {
                return reason;
            }
        }
    }

    /// Decides whether a receive failure ends the session.
    fn frame_error(&self, error: FrameError) -> Option<ExitReason> {
        let id = self.session.id();
        match error {
            FrameError::Interrupted if self.shutdown.is_running() => None,
            FrameError::Interrupted => Some(ExitReason::Shutdown),
            FrameError::Protocol(e) => match self.unknown_tag_policy {
                UnknownTagPolicy::Continue => {
                    warn!("Player {} sent a malformed frame, ignoring: {}", id, e);
                    None
                }
                UnknownTagPolicy::Disconnect => {
                    warn!("Player {} sent a malformed frame, disconnecting: {}", id, e);
                    Some(ExitReason::ProtocolError)
                }
            },
            FrameError::Io(e) => {
                if self.shutdown.is_running() {
                    warn!("Connection error for player {}: {}", id, e);
                } else {
                    debug!("Connection error for player {} during shutdown: {}", id, e);
                }
                Some(self.closed_reason(ExitReason::TransportError))
            }
        }
    }

    fn peer(&self) -> String {
        self.session
            .addr()
            .map_or_else(|| "unknown address".to_string(), |addr| addr.to_string())
    }

    fn closed_reason(&self, reason: ExitReason) -> ExitReason {
        if self.shutdown.is_running() {
            reason
        } else {
            ExitReason::Shutdown
        }
    }

    /// Applies one inbound message. Returns an exit reason when the session
    /// should end.
    fn process(&self, message: Message) -> Option<ExitReason> {
        let id = self.session.id();
        match message {
            Message::KeyPress { key_code } => match KeyAction::from_code(key_code) {
                KeyAction::Quit => Some(ExitReason::Quit),
                KeyAction::Move(direction) => {
                    let position = self.session.apply_move(direction);
                    debug!(
                        "Player {} moved {:?} to ({}, {})",
                        id, direction, position.x, position.y
                    );
                    let update = Message::PositionUpdate {
                        player_id: id,
                        x: position.x,
                        y: position.y,
                    };
                    self.registry.broadcast(None, |_| update);
                    None
                }
                KeyAction::Ignore => {
                    debug!("Player {} pressed unbound key {}", id, key_code);
                    None
                }
            },
            other => {
                warn!("Player {} sent unexpected message {:?}", id, other);
                None
            }
        }
    }

    fn disconnect(&self, reason: ExitReason) {
        let id = self.session.id();
        self.registry.remove(id);
        let notified = self
            .registry
            .broadcast(None, |_| Message::Disconnect { player_id: id });
        self.session.close();
        info!(
            "Player {} ({}) disconnected ({:?}); notified {} player(s)",
            id,
            self.peer(),
            reason,
            notified
        );
    }
}
