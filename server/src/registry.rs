//! Registry of live sessions and message fan-out
//!
//! One mutex guards both structural changes and iteration, and a broadcast
//! holds it for the whole fan-out. A session that is removed can therefore
//! never be written to by a broadcast that started after the removal, and
//! every session registered when a broadcast starts receives it.
//!
//! The cost is that a peer whose socket buffer is full stalls all other
//! broadcasts until its write completes or fails.

use crate::session::Session;
use log::{debug, warn};
use shared::Message;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<Vec<Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a session. Returns false if a session with the same id is
    /// already registered.
    pub fn register(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.lock();
        Self::insert(&mut sessions, session)
    }

    fn insert(sessions: &mut Vec<Arc<Session>>, session: Arc<Session>) -> bool {
        if sessions.iter().any(|s| s.id() == session.id()) {
            warn!("Player {} is already registered", session.id());
            return false;
        }
        sessions.push(session);
        true
    }

    /// Registers a newcomer and performs the initial state exchange under a
    /// single hold of the lock.
    ///
    /// The newcomer's position goes to every session, newcomer included, and
    /// then every other session's position goes to the newcomer. The first
    /// message a new player receives is therefore its own position.
    pub fn join(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.lock();
        if !Self::insert(&mut sessions, Arc::clone(&session)) {
            return false;
        }

        let announcement = session.position_update();
        let delivered = sessions
            .iter()
            .filter(|target| deliver(target, &announcement))
            .count();

        for other in sessions.iter().filter(|s| s.id() != session.id()) {
            deliver(&session, &other.position_update());
        }

        debug!(
            "Player {} joined; announced to {} of {} sessions",
            session.id(),
            delivered,
            sessions.len()
        );
        true
    }

    /// Removes the session with `id`, handing ownership of its teardown to
    /// the caller.
    pub fn remove(&self, id: u32) -> Option<Arc<Session>> {
        let mut sessions = self.lock();
        let index = sessions.iter().position(|s| s.id() == id)?;
        Some(sessions.remove(index))
    }

    /// Sends a message built per target to every registered session except
    /// `exclude`. Returns how many sends succeeded.
    pub fn broadcast<F>(&self, exclude: Option<u32>, mut build: F) -> usize
    where
        F: FnMut(&Session) -> Message,
    {
        let sessions = self.lock();
        let mut delivered = 0;
        for target in sessions.iter() {
            if Some(target.id()) == exclude {
                continue;
            }
            let message = build(target.as_ref());
            if deliver(target, &message) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Copies the current list of sessions and releases the lock.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.lock().clone()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.lock().iter().any(|s| s.id() == id)
    }

    /// Registered ids in insertion order.
    pub fn ids(&self) -> Vec<u32> {
        self.lock().iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn deliver(target: &Session, message: &Message) -> bool {
    match target.send(message) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to send {:?} to player {}: {}", message, target.id(), e);
            false
        }
    }
}
