//! # Game Server Library
//!
//! Authoritative session server for the terminal multiplayer game. Each
//! player holds one TCP connection; the server owns every player's position,
//! applies their key presses and fans the resulting positions out to all
//! connected players.
//!
//! ## Architecture Design
//!
//! ### Thread per Connection
//! The accept loop runs on one thread and spawns a handler thread for every
//! accepted connection. Reads and writes are plain blocking socket calls;
//! there is no async runtime inside the server core.
//!
//! ### Shared Registry
//! The [`registry::Registry`] is the only mutable state shared between
//! handlers. A single mutex serialises registration, removal and every
//! broadcast, so all players observe a given player's moves in the order
//! they were made.
//!
//! ### Deterministic Shutdown
//! Shutdown clears the run flag, closes the read side of every live
//! connection to wake blocked handlers, joins all of them and only then
//! releases the listener. No thread is ever killed while it holds the
//! registry lock.
//!
//! ## Module Organization
//!
//! - `config`: listener address, polling interval and protocol policy
//! - `session`: one player's connection and position
//! - `registry`: the set of live sessions and message fan-out
//! - `handler`: the per-connection receive loop
//! - `shutdown`: run flag and teardown
//! - `network`: listener and accept loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::new("127.0.0.1", 8080))?;
//!     let shutdown = server.shutdown_handle();
//!
//!     let runner = std::thread::spawn(move || server.run());
//!
//!     // ... later, from a signal handler or another thread:
//!     shutdown.trigger();
//!     let report = runner.join().expect("accept loop panicked");
//!     println!("joined {} handlers", report.handlers_joined);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod handler;
pub mod network;
pub mod registry;
pub mod session;
pub mod shutdown;
