//! Text commands to key codes
//!
//! The terminal front end is outside this crate; the client reads
//! whitespace-separated commands from standard input and turns each one into
//! the key code the server expects.

use log::{debug, warn};
use shared::{Direction, KEY_ESCAPE};
use std::io::BufRead;
use tokio::sync::mpsc;

/// Maps one command word to a key code.
pub fn key_code_for(word: &str) -> Option<u32> {
    let direction = match word.to_ascii_lowercase().as_str() {
        "w" | "k" | "up" => Direction::Up,
        "s" | "j" | "down" => Direction::Down,
        "a" | "h" | "left" => Direction::Left,
        "d" | "l" | "right" => Direction::Right,
        "q" | "quit" | "esc" | "exit" => return Some(KEY_ESCAPE),
        _ => return None,
    };
    Some(direction.key_code())
}

/// Maps every recognised word on a line, skipping the rest.
pub fn parse_line(line: &str) -> Vec<u32> {
    line.split_whitespace()
        .filter_map(|word| {
            let code = key_code_for(word);
            if code.is_none() {
                warn!("Unknown command '{}'", word);
            }
            code
        })
        .collect()
}

/// Reads commands from `reader` until EOF, escape, or the receiver goes away.
///
/// Runs on a dedicated blocking thread; the channel is the only link to the
/// async side.
pub fn forward_commands<R: BufRead>(reader: R, keys: mpsc::Sender<u32>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };

        for code in parse_line(&line) {
            if keys.blocking_send(code).is_err() {
                debug!("Key channel closed, stopping input");
                return;
            }
            if code == KEY_ESCAPE {
                return;
            }
        }
    }
    debug!("Input exhausted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_UP};
    use std::io::Cursor;

    #[test]
    fn test_key_code_mapping() {
        assert_eq!(key_code_for("w"), Some(KEY_UP));
        assert_eq!(key_code_for("DOWN"), Some(KEY_DOWN));
        assert_eq!(key_code_for("h"), Some(KEY_LEFT));
        assert_eq!(key_code_for("right"), Some(KEY_RIGHT));
        assert_eq!(key_code_for("q"), Some(KEY_ESCAPE));
        assert_eq!(key_code_for("jump"), None);
    }

    #[test]
    fn test_parse_line_skips_unknown_words() {
        assert_eq!(
            parse_line("  up up  dance left\t"),
            vec![KEY_UP, KEY_UP, KEY_LEFT]
        );
        assert!(parse_line("").is_empty());
    }

    #[test]
    fn test_forward_stops_at_escape() {
        let (tx, mut rx) = mpsc::channel(16);
        forward_commands(Cursor::new("d d\nq\nw\n"), tx);

        let mut received = Vec::new();
        while let Ok(code) = rx.try_recv() {
            received.push(code);
        }
        assert_eq!(received, vec![KEY_RIGHT, KEY_RIGHT, KEY_ESCAPE]);
    }

    #[test]
    fn test_forward_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        forward_commands(Cursor::new("w\nw\n"), tx);
    }
}
