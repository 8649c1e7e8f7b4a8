//! Binary encoding of protocol messages
//!
//! Every message is `[tag: u8][payload]` with all multi-byte fields in
//! network byte order:
//!
//! | tag | message          | payload                                   |
//! |-----|------------------|-------------------------------------------|
//! | 0   | `PositionUpdate` | `player_id: u32`, `x: i16`, `y: i16`      |
//! | 1   | `KeyPress`       | `key_code: u32`                           |
//! | 2   | `Disconnect`     | `player_id: u32`                          |
//!
//! There is no length prefix and no version field; the payload size is fixed
//! per tag, so an unknown tag cannot be skipped.

use thiserror::Error;

pub const TAG_POSITION_UPDATE: u8 = 0;
pub const TAG_KEY_PRESS: u8 = 1;
pub const TAG_DISCONNECT: u8 = 2;

/// Largest encoded message, tag included.
pub const MAX_FRAME_SIZE: usize = 1 + 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("truncated payload for tag {tag}: expected {expected} bytes, got {actual}")]
    TruncatedInput {
        tag: u8,
        expected: usize,
        actual: usize,
    },
    #[error("trailing bytes in payload for tag {tag}: expected {expected} bytes, got {actual}")]
    TrailingBytes {
        tag: u8,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    PositionUpdate { player_id: u32, x: i16, y: i16 },
    KeyPress { key_code: u32 },
    Disconnect { player_id: u32 },
}

/// Returns the fixed payload length for `tag`.
pub fn payload_size(tag: u8) -> Result<usize, CodecError> {
    match tag {
        TAG_POSITION_UPDATE => Ok(8),
        TAG_KEY_PRESS => Ok(4),
        TAG_DISCONNECT => Ok(4),
        other => Err(CodecError::UnknownTag(other)),
    }
}

impl Message {
    pub fn tag(&self) -> u8 {
        match self {
            Message::PositionUpdate { .. } => TAG_POSITION_UPDATE,
            Message::KeyPress { .. } => TAG_KEY_PRESS,
            Message::Disconnect { .. } => TAG_DISCONNECT,
        }
    }

    /// Encodes the tag followed by the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
        buf.push(self.tag());
        match *self {
            Message::PositionUpdate { player_id, x, y } => {
                buf.extend_from_slice(&player_id.to_be_bytes());
                buf.extend_from_slice(&x.to_be_bytes());
                buf.extend_from_slice(&y.to_be_bytes());
            }
            Message::KeyPress { key_code } => {
                buf.extend_from_slice(&key_code.to_be_bytes());
            }
            Message::Disconnect { player_id } => {
                buf.extend_from_slice(&player_id.to_be_bytes());
            }
        }
        buf
    }

    /// Rebuilds a message from its tag and payload bytes.
    ///
    /// The payload must be exactly `payload_size(tag)` bytes long.
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Self, CodecError> {
        let expected = payload_size(tag)?;
        if payload.len() < expected {
            return Err(CodecError::TruncatedInput {
                tag,
                expected,
                actual: payload.len(),
            });
        }
        if payload.len() > expected {
            return Err(CodecError::TrailingBytes {
                tag,
                expected,
                actual: payload.len(),
            });
        }

        let mut reader = PayloadReader::new(tag, payload);
        let message = match tag {
            TAG_POSITION_UPDATE => Message::PositionUpdate {
                player_id: u32::from_be_bytes(reader.take()?),
                x: i16::from_be_bytes(reader.take()?),
                y: i16::from_be_bytes(reader.take()?),
            },
            TAG_KEY_PRESS => Message::KeyPress {
                key_code: u32::from_be_bytes(reader.take()?),
            },
            TAG_DISCONNECT => Message::Disconnect {
                player_id: u32::from_be_bytes(reader.take()?),
            },
            other => return Err(CodecError::UnknownTag(other)),
        };
        Ok(message)
    }
}

struct PayloadReader<'a> {
    tag: u8,
    payload: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(tag: u8, payload: &'a [u8]) -> Self {
        Self {
            tag,
            payload,
            offset: 0,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.offset + N;
        let bytes = self
            .payload
            .get(self.offset..end)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(CodecError::TruncatedInput {
                tag: self.tag,
                expected: end,
                actual: self.payload.len(),
            })?;
        self.offset = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) -> Message {
        let encoded = message.encode();
        Message::decode(encoded[0], &encoded[1..]).unwrap()
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(payload_size(TAG_POSITION_UPDATE), Ok(8));
        assert_eq!(payload_size(TAG_KEY_PRESS), Ok(4));
        assert_eq!(payload_size(TAG_DISCONNECT), Ok(4));
        assert_eq!(payload_size(3), Err(CodecError::UnknownTag(3)));
        assert_eq!(payload_size(0xFF), Err(CodecError::UnknownTag(0xFF)));
    }

    #[test]
    fn test_encoded_length_matches_payload_size() {
        let messages = [
            Message::PositionUpdate {
                player_id: 1,
                x: 2,
                y: 3,
            },
            Message::KeyPress { key_code: 4 },
            Message::Disconnect { player_id: 5 },
        ];
        for message in messages {
            let encoded = message.encode();
            assert_eq!(encoded.len(), 1 + payload_size(message.tag()).unwrap());
            assert!(encoded.len() <= MAX_FRAME_SIZE);
        }
    }

    #[test]
    fn test_position_update_byte_layout() {
        let message = Message::PositionUpdate {
            player_id: 0x0102_0304,
            x: -2,
            y: 0x0506,
        };
        assert_eq!(
            message.encode(),
            vec![0x00, 0x01, 0x02, 0x03, 0x04, 0xFF, 0xFE, 0x05, 0x06]
        );
    }

    #[test]
    fn test_key_press_byte_layout() {
        let message = Message::KeyPress { key_code: 261 };
        assert_eq!(message.encode(), vec![0x01, 0x00, 0x00, 0x01, 0x05]);
    }

    #[test]
    fn test_disconnect_byte_layout() {
        let message = Message::Disconnect {
            player_id: u32::MAX,
        };
        assert_eq!(message.encode(), vec![0x02, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_position_update_boundary_values_roundtrip() {
        let coords = [i16::MIN, -1, 0, 1, i16::MAX];
        for player_id in [0, u32::MAX] {
            for x in coords {
                for y in coords {
                    let message = Message::PositionUpdate { player_id, x, y };
                    assert_eq!(roundtrip(message), message);
                }
            }
        }
    }

    #[test]
    fn test_id_only_messages_roundtrip() {
        for value in [0, 1, 27, u32::MAX] {
            let key = Message::KeyPress { key_code: value };
            let disconnect = Message::Disconnect { player_id: value };
            assert_eq!(roundtrip(key), key);
            assert_eq!(roundtrip(disconnect), disconnect);
        }
    }

    #[test]
    fn test_decode_negative_coordinates_from_raw_bytes() {
        let payload = [0x00, 0x00, 0x00, 0x07, 0x80, 0x00, 0xFF, 0xFF];
        assert_eq!(
            Message::decode(TAG_POSITION_UPDATE, &payload),
            Ok(Message::PositionUpdate {
                player_id: 7,
                x: i16::MIN,
                y: -1,
            })
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            Message::decode(9, &[0, 0, 0, 0]),
            Err(CodecError::UnknownTag(9))
        );
    }

    #[test]
    fn test_decode_truncated_payload() {
        assert_eq!(
            Message::decode(TAG_POSITION_UPDATE, &[0, 0, 0, 1, 0]),
            Err(CodecError::TruncatedInput {
                tag: TAG_POSITION_UPDATE,
                expected: 8,
                actual: 5,
            })
        );
        assert!(matches!(
            Message::decode(TAG_KEY_PRESS, &[]),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        assert_eq!(
            Message::decode(TAG_DISCONNECT, &[0, 0, 0, 1, 0]),
            Err(CodecError::TrailingBytes {
                tag: TAG_DISCONNECT,
                expected: 4,
                actual: 5,
            })
        );
    }
}
