//! Whole-message transfer over a blocking byte stream
//!
//! `send_message` writes the full encoded frame or fails; `recv_message`
//! yields a complete message, `None` when the peer closed cleanly between
//! messages, or an error. A partially received message is never returned.

use crate::codec::{payload_size, CodecError, Message, MAX_FRAME_SIZE};
use std::io::{self, ErrorKind, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("receive interrupted at a message boundary")]
    Interrupted,
}

impl FrameError {
    /// True when the peer went away in the middle of a frame.
    pub fn is_truncated_frame(&self) -> bool {
        matches!(self, FrameError::Io(e) if e.kind() == ErrorKind::UnexpectedEof)
    }
}

pub fn send_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), FrameError> {
    writer.write_all(&message.encode())?;
    writer.flush()?;
    Ok(())
}

/// Reads exactly one message.
///
/// An interrupted read before the tag byte is reported as
/// [`FrameError::Interrupted`] so the caller can re-check its run state;
/// interruptions inside the payload are retried.
pub fn recv_message<R: Read>(reader: &mut R) -> Result<Option<Message>, FrameError> {
    let mut tag = [0u8; 1];
    match reader.read(&mut tag) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::Interrupted => return Err(FrameError::Interrupted),
        Err(e) => return Err(FrameError::Io(e)),
    }

    let size = payload_size(tag[0])?;
    let mut buf = [0u8; MAX_FRAME_SIZE - 1];
    let payload = &mut buf[..size];
    reader.read_exact(payload)?;

    Ok(Some(Message::decode(tag[0], payload)?))
}
