//! # Game Client Library
//!
//! Client side of the terminal multiplayer game. The client holds one TCP
//! connection to the server, forwards the player's key presses and keeps a
//! mirror of every player's last known position.
//!
//! ## Architecture Overview
//!
//! ### Reader and Writer Tasks
//! The connection is split into two halves. A reader task decodes server
//! messages into the [`peers::PeerMap`]; a writer task sends key presses.
//! Both share a cancellation token: when the reader sees the server close
//! the connection it cancels the writer, and either side can be stopped from
//! outside through the same token.
//!
//! ### Self Identification
//! The server sends a newly joined player its own position before anyone
//! else's, so the first position update names this client's player id.
//!
//! ## Module Organization
//!
//! - `input`: text commands to key codes
//! - `network`: async framing, connection and task pair
//! - `peers`: the position mirror and the events it emits
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), client::network::ClientError> {
//! let client = Client::connect("127.0.0.1", 8080).await?;
//! let (keys, key_rx) = mpsc::channel(64);
//! let (events, mut event_rx) = mpsc::unbounded_channel();
//!
//! let session = tokio::spawn(client.run(key_rx, events, CancellationToken::new()));
//! keys.send(shared::KEY_UP).await.ok();
//! keys.send(shared::KEY_ESCAPE).await.ok();
//!
//! while let Some(event) = event_rx.recv().await {
//!     println!("{:?}", event);
//! }
//! let peers = session.await??;
//! println!("{} players left on the board", peers.len());
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod network;
pub mod peers;
