//! Client-side mirror of every player's last known position

use log::warn;
use serde::Serialize;
use shared::{Message, Position};
use std::collections::HashMap;

/// A change to the peer map, suitable for a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PeerEvent {
    Joined {
        player_id: u32,
        position: Position,
        is_self: bool,
    },
    Moved {
        player_id: u32,
        position: Position,
        is_self: bool,
    },
    Left {
        player_id: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PeerMap {
    players: HashMap<u32, Position>,
    self_id: Option<u32>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one server message into the map.
    ///
    /// The server always sends a new player its own position first, so the
    /// id in the first update is recorded as this client's id.
    pub fn apply(&mut self, message: Message) -> Option<PeerEvent> {
        match message {
            Message::PositionUpdate { player_id, x, y } => {
                let self_id = *self.self_id.get_or_insert(player_id);
                let is_self = self_id == player_id;
                let position = Position::new(x, y);

                let event = if self.players.insert(player_id, position).is_some() {
                    PeerEvent::Moved {
                        player_id,
                        position,
                        is_self,
                    }
                } else {
                    PeerEvent::Joined {
                        player_id,
                        position,
                        is_self,
                    }
                };
                Some(event)
            }
            Message::Disconnect { player_id } => self
                .players
                .remove(&player_id)
                .map(|_| PeerEvent::Left { player_id }),
            Message::KeyPress { key_code } => {
                warn!("Server sent unexpected key press {}", key_code);
                None
            }
        }
    }

    pub fn self_id(&self) -> Option<u32> {
        self.self_id
    }

    pub fn own_position(&self) -> Option<Position> {
        self.self_id.and_then(|id| self.get(id))
    }

    pub fn get(&self, player_id: u32) -> Option<Position> {
        self.players.get(&player_id).copied()
    }

    pub fn contains(&self, player_id: u32) -> bool {
        self.players.contains_key(&player_id)
    }

    /// All known players ordered by id.
    pub fn players(&self) -> Vec<(u32, Position)> {
        let mut players: Vec<_> = self.players.iter().map(|(id, p)| (*id, *p)).collect();
        players.sort_unstable_by_key(|(id, _)| *id);
        players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
