use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ei_core::wire::{
    ChatReply, ChatRequest, GamificationUpdate, HistoryEntry, SessionSummary, SubscriptionStatus,
    UserProfile,
};
use uuid::Uuid;

use crate::api::{ChatService, ClientError};
use crate::app::App;
use crate::store::LocalStore;
use crate::view::RecordingView;

#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub delay: Duration,
    pub result: Result<String, ClientErrorKind>,
}

#[derive(Debug, Clone, Copy)]
pub enum ClientErrorKind {
    Backend,
    Garbled,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub profile: Option<UserProfile>,
    pub sessions: Vec<SessionSummary>,
    pub histories: HashMap<Uuid, Vec<HistoryEntry>>,
    pub replies: HashMap<String, ScriptedReply>,
    pub fail_updates: bool,
    pub fail_sessions: bool,
    pub fail_deletes: bool,
    pub updates: Vec<GamificationUpdate>,
    pub chats: Vec<ChatRequest>,
    pub deleted: Vec<Uuid>,
    pub edits: Vec<(String, String)>,
}

/// In-memory `ChatService`. Unscripted messages are echoed back immediately.
#[derive(Debug, Default)]
pub struct FakeService {
    inner: Mutex<FakeState>,
}

impl FakeService {
    pub fn with_profile(xp: u64, badges: &[&str]) -> Arc<Self> {
        let service = Self::default();
        service.state().profile = Some(UserProfile {
            username: "mira".to_string(),
            xp,
            badges: badges.iter().map(|id| id.to_string()).collect(),
            subscription_status: SubscriptionStatus::None,
        });
        Arc::new(service)
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    pub fn reply_after(&self, message: &str, delay_ms: u64, reply: &str) {
        self.state().replies.insert(
            message.to_string(),
            ScriptedReply {
                delay: Duration::from_millis(delay_ms),
                result: Ok(reply.to_string()),
            },
        );
    }

    pub fn fail_after(&self, message: &str, delay_ms: u64, kind: ClientErrorKind) {
        self.state().replies.insert(
            message.to_string(),
            ScriptedReply {
                delay: Duration::from_millis(delay_ms),
                result: Err(kind),
            },
        );
    }

    pub fn add_session(&self, session_id: Uuid, preview: &str, history: Vec<HistoryEntry>) {
        let mut state = self.state();
        state.sessions.push(SessionSummary {
            session_id,
            first_user_message_preview: Some(preview.to_string()),
            first_timestamp: Some("2025-07-01T12:00:00Z".to_string()),
        });
        state.histories.insert(session_id, history);
    }
}

pub fn exchange(id: &str, user: &str, reply: &str) -> HistoryEntry {
    HistoryEntry {
        message_id: id.to_string(),
        user_message: Some(user.to_string()),
        ei_response: Some(reply.to_string()),
    }
}

impl ChatService for FakeService {
    async fn user_profile(&self) -> Result<UserProfile, ClientError> {
        self.state().profile.clone().ok_or(ClientError::AuthRequired)
    }

    async fn update_gamification(&self, update: GamificationUpdate) -> Result<(), ClientError> {
        let mut state = self.state();
        state.updates.push(update.clone());
        if state.fail_updates {
            return Err(ClientError::Backend {
                status: 503,
                message: "profile store unavailable".to_string(),
            });
        }
        if let Some(profile) = state.profile.as_mut() {
            if let Some(xp) = update.xp {
                profile.xp = xp;
            }
            if let Some(badges) = update.badges {
                profile.badges = badges;
            }
        }
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ClientError> {
        let scripted = {
            let mut state = self.state();
            state.chats.push(request.clone());
            state.replies.get(&request.message).cloned()
        };
        let Some(scripted) = scripted else {
            return Ok(ChatReply {
                reply: format!("echo: {}", request.message),
            });
        };
        tokio::time::sleep(scripted.delay).await;
        match scripted.result {
            Ok(reply) => Ok(ChatReply { reply }),
            Err(ClientErrorKind::Backend) => Err(ClientError::Backend {
                status: 500,
                message: "An internal error occurred processing your request.".to_string(),
            }),
            Err(ClientErrorKind::Garbled) => Err(ClientError::Decode("expected value".to_string())),
        }
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let state = self.state();
        if state.fail_sessions {
            return Err(ClientError::Backend {
                status: 500,
                message: "Database not connected".to_string(),
            });
        }
        Ok(state.sessions.clone())
    }

    async fn history(&self, session_id: Uuid) -> Result<Vec<HistoryEntry>, ClientError> {
        Ok(self
            .state()
            .histories
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), ClientError> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(ClientError::Backend {
                status: 500,
                message: "Failed to delete session".to_string(),
            });
        }
        state.sessions.retain(|s| s.session_id != session_id);
        state.histories.remove(&session_id);
        state.deleted.push(session_id);
        Ok(())
    }

    async fn edit_message(&self, message_id: &str, new_message: &str) -> Result<(), ClientError> {
        self.state()
            .edits
            .push((message_id.to_string(), new_message.to_string()));
        Ok(())
    }
}

pub fn app(service: &Arc<FakeService>, store: LocalStore) -> App<FakeService, RecordingView> {
    App::new(service.clone(), store, RecordingView::default())
}
