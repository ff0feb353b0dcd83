use std::sync::Arc;

use common::Round;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::quiz::QuizSession;

/// A session wrapped in its single-writer lock.
pub type SharedSession = Arc<Mutex<QuizSession>>;

/// In-memory home of every in-flight quiz session.
///
/// The per-session mutex is the single-writer-per-session invariant: timer
/// auto-submit, explicit submit and revocation all serialize on it, so
/// exactly one of them performs the terminal transition.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, SharedSession>,
    by_participant: DashMap<(i32, i32), Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: QuizSession) -> SharedSession {
        let id = session.id;
        let key = (session.user_id, session.round.number());
        let shared: SharedSession = Arc::new(Mutex::new(session));
        self.sessions.insert(id, shared.clone());
        self.by_participant.insert(key, id);
        shared
    }

    pub fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// The participant's live session for a round, if any. Used to make
    /// session start idempotent.
    pub fn find_for(&self, user_id: i32, round: Round) -> Option<SharedSession> {
        let id = *self.by_participant.get(&(user_id, round.number()))?;
        self.get(id)
    }

    /// Retire a session after its terminal transition. The participant
    /// index frees up immediately; the terminal session itself stays
    /// behind so a late racer observes "already submitted" rather than a
    /// vanished session id.
    pub fn retire(&self, id: Uuid, user_id: i32, round: Round) {
        self.by_participant
            .remove_if(&(user_id, round.number()), |_, v| *v == id);
    }

    /// Snapshot of all live sessions, for the sweeper.
    pub fn all(&self) -> Vec<SharedSession> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
