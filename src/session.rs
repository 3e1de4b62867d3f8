use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::conversation::{Conversation, ConversationError, Pacing, Step};
use crate::locale::Language;
use crate::presentation::{self, SaveStatus, SessionContext, SessionSnapshot};

pub type SharedSession = Arc<Mutex<Session>>;

/// One browser session: its conversation plus display context.
pub struct Session {
    pub id: Uuid,
    pub context: SessionContext,
    pub conversation: Conversation,
    pub save_status: SaveStatus,
    events: broadcast::Sender<SessionSnapshot>,
}

impl Session {
    /// A fresh session, already greeted and waiting for a name.
    pub fn new(id: Uuid, language: Language, pacing: Pacing) -> Result<Self, ConversationError> {
        let mut conversation = Conversation::new(language, pacing);
        conversation.greet()?;
        let (events, _) = broadcast::channel(32);
        Ok(Self {
            id,
            context: SessionContext { language, ..SessionContext::default() },
            conversation,
            save_status: SaveStatus::default(),
            events,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        presentation::snapshot(self.id, &self.conversation, self.context, self.save_status, Instant::now())
    }

    /// Snapshot and push it to every open WebSocket of this session.
    pub fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        if self.events.send(snapshot.clone()).is_err() {
            debug!(session = %self.id, "No live subscribers for session update");
        }
        snapshot
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.events.subscribe()
    }

    /// Starts the conversation over. The display context is kept.
    pub fn reset(&mut self) -> Result<Step, ConversationError> {
        self.save_status = SaveStatus::Idle;
        self.conversation.reset()
    }

    /// Records how the save for `ticket` went. Ignored unless that request is
    /// still the latest finished search and nothing newer is pending.
    pub fn finish_save(&mut self, ticket: u64, status: SaveStatus) -> bool {
        let conversation = &self.conversation;
        if conversation.pending_ticket().is_some() || conversation.completed_ticket() != Some(ticket) {
            debug!(session = %self.id, ticket, "Dropping save status of an outdated search");
            return false;
        }
        self.save_status = status;
        true
    }

    pub fn toggle_theme(&mut self) {
        self.context.theme = self.context.theme.toggled();
    }
}

/// All live sessions, keyed by id.
// TODO: evict sessions that have been idle for longer than a day.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    language: Language,
    pacing: Pacing,
}

impl SessionRegistry {
    pub fn new(language: Language, pacing: Pacing) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), language, pacing }
    }

    pub async fn create(&self, language: Option<Language>) -> Result<SharedSession, ConversationError> {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id, language.unwrap_or(self.language), self.pacing)?));
        self.sessions.write().await.insert(id, session.clone());
        info!(session = %id, "Session started");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
