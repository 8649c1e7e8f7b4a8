//! Types and wire protocol shared by the server and the client.
//!
//! The protocol is a fixed-width binary format: a one-byte tag followed by a
//! big-endian payload whose length is implied by the tag. See [`codec`] for
//! the byte layout and [`framing`] for reading and writing whole messages
//! over a blocking byte stream.

use serde::Serialize;

pub mod codec;
pub mod framing;

pub use codec::{payload_size, CodecError, Message, MAX_FRAME_SIZE};
pub use framing::{recv_message, send_message, FrameError};

pub const BOARD_WIDTH: i16 = 38;
pub const BOARD_HEIGHT: i16 = 20;

pub const KEY_ESCAPE: u32 = 27;
pub const KEY_DOWN: u32 = 258;
pub const KEY_UP: u32 = 259;
pub const KEY_LEFT: u32 = 260;
pub const KEY_RIGHT: u32 = 261;

/// A player's coordinates on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Returns the position one unit away in `direction`.
    ///
    /// Arithmetic wraps at the `i16` boundary so a move is always exactly one
    /// unit modulo 2^16.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i16, i16) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn key_code(self) -> u32 {
        match self {
            Direction::Up => KEY_UP,
            Direction::Down => KEY_DOWN,
            Direction::Left => KEY_LEFT,
            Direction::Right => KEY_RIGHT,
        }
    }
}

/// What a raw key code means to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Move(Direction),
    Quit,
    Ignore,
}

impl KeyAction {
    pub fn from_code(key_code: u32) -> Self {
        match key_code {
            KEY_ESCAPE => KeyAction::Quit,
            KEY_UP => KeyAction::Move(Direction::Up),
            KEY_DOWN => KeyAction::Move(Direction::Down),
            KEY_LEFT => KeyAction::Move(Direction::Left),
            KEY_RIGHT => KeyAction::Move(Direction::Right),
            _ => KeyAction::Ignore,
        }
    }
}
