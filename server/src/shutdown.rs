//! Run flag and ordered teardown of all sessions
//!
//! Teardown never kills a thread. It flips the run flag, closes the read side
//! of every registered session so blocked receives return, and then joins
//! every handler. The registry lock is held only while copying the session
//! list, never across a join.

use crate::handler::ExitReason;
use crate::registry::Registry;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared view of the process-wide run flag.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the run flag. Returns true only for the call that changed it.
    pub fn trigger(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Sessions whose read side was closed.
    pub sessions_closed: usize,
    /// Handlers joined, whether they exited normally or not.
    pub handlers_joined: usize,
    /// Handlers that panicked.
    pub handlers_failed: usize,
}

/// Unblocks and joins every handler.
///
/// Must be called after the run flag is cleared and after the accept loop
/// has stopped spawning handlers.
pub fn teardown(registry: &Registry, handlers: Vec<JoinHandle<ExitReason>>) -> TeardownReport {
    let mut report = TeardownReport::default();

    let sessions = registry.snapshot();
    info!("Shutting down {} active session(s)", sessions.len());

    for session in &sessions {
        match session.shutdown_read() {
            Ok(()) => report.sessions_closed += 1,
            Err(e) => warn!(
                "Failed to half-close connection for player {}: {}",
                session.id(),
                e
            ),
        }
    }
    drop(sessions);

    for handle in handlers {
        let name = handle.thread().name().unwrap_or("session").to_string();
        match handle.join() {
            Ok(reason) => debug!("Handler {} exited: {:?}", name, reason),
            Err(_) => {
                error!("Handler {} panicked", name);
                report.handlers_failed += 1;
            }
        }
        report.handlers_joined += 1;
    }

    info!("All handlers joined ({} failed)", report.handlers_failed);
    report
}
