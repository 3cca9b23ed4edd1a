use std::sync::Arc;

use ei_core::badges::BadgeId;
use ei_core::persona::Persona;
use ei_core::stale::{RequestTicket, StaleGuard};
use ei_core::wire::ChatReply;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::{ChatService, ClientError};
use crate::reconciler::GamificationSync;
use crate::state::ClientState;
use crate::store::LocalStore;
use crate::view::{ChatView, ViewEvent};

/// A chat reply delivered back to the event loop.
#[derive(Debug)]
pub struct ReplyEnvelope {
    pub ticket: RequestTicket,
    pub session_id: Uuid,
    pub persona: Persona,
    pub result: Result<ChatReply, ClientError>,
}

/// The client: state, local store, view and the remote service, driven by a
/// single event loop. Component behaviour lives in `sessions`, `pipeline`
/// and `reconciler`.
pub struct App<S: ChatService, V: ChatView> {
    pub(crate) service: Arc<S>,
    pub(crate) store: LocalStore,
    pub(crate) state: ClientState,
    pub(crate) view: V,
    pub(crate) guard: StaleGuard,
    pub(crate) sync: GamificationSync,
    pub(crate) replies_tx: mpsc::UnboundedSender<ReplyEnvelope>,
    replies_rx: mpsc::UnboundedReceiver<ReplyEnvelope>,
}

impl<S: ChatService, V: ChatView> App<S, V> {
    /// Must be called inside a tokio runtime (the sync worker is spawned here).
    pub fn new(service: Arc<S>, store: LocalStore, view: V) -> Self {
        let state = ClientState::new(store.persona(), store.current_session(), store.usage());
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            sync: GamificationSync::spawn(service.clone()),
            service,
            store,
            state,
            view,
            guard: StaleGuard::new(),
            replies_tx,
            replies_rx,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Application start: reconcile gamification with the remote profile,
    /// then make sure a current session exists.
    ///
    /// Fails with `ClientError::AuthRequired` when the profile cannot be
    /// fetched.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        self.reconcile().await?;
        match self.state.current_session {
            Some(session_id) => {
                if self.state.usage.sessions_interacted.insert(session_id) {
                    self.persist_usage();
                }
            }
            None => {
                self.start_new_session().await;
            }
        }
        self.evaluate_badges();
        Ok(())
    }

    /// Show the chat: session list, the current session's log and the XP bar.
    pub async fn open_chat(&mut self) {
        self.view.emit(ViewEvent::PersonaChanged {
            persona: self.state.persona,
        });
        self.refresh_sessions().await;
        if let Some(session_id) = self.state.current_session {
            self.view.emit(ViewEvent::ClearLog);
            self.state.log_user_messages = 0;
            self.load_history(session_id).await;
        }
        self.view.emit(ViewEvent::Progress {
            progress: self.state.progress(),
        });
    }

    pub fn set_persona(&mut self, persona: Persona) -> bool {
        if persona == self.state.persona {
            return false;
        }
        self.state.persona = persona;
        self.store.set_persona(persona);
        tracing::debug!(persona = %persona, "persona changed");
        self.view.emit(ViewEvent::PersonaChanged { persona });

        // Selecting a persona counts as trying it.
        self.state.usage.personas_tried.insert(persona);
        self.persist_usage();
        self.evaluate_badges();
        true
    }

    /// Show the level bar and the unlocked badges.
    pub fn show_profile(&mut self) {
        self.view.emit(ViewEvent::Progress {
            progress: self.state.progress(),
        });
        let known: Vec<BadgeId> = self
            .state
            .gamification
            .badges
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect();
        let text = if known.is_empty() {
            "No badges yet.".to_string()
        } else {
            let names: Vec<String> = known
                .iter()
                .map(|badge| {
                    let def = badge.definition();
                    format!("{} {}", def.emoji, def.name)
                })
                .collect();
            format!("Badges: {}", names.join(", "))
        };
        self.notify(text);
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.view.emit(ViewEvent::SystemInfo { text: text.into() });
    }

    /// Wait for the next reply from any in-flight request.
    pub async fn next_reply(&mut self) -> Option<ReplyEnvelope> {
        self.replies_rx.recv().await
    }

    /// Wait for queued gamification pushes to finish. Used before exit so a
    /// short-lived process does not drop them.
    pub async fn shutdown(mut self) {
        self.sync.flush().await;
    }

    pub(crate) fn persist_usage(&mut self) {
        if let Err(err) = self.store.set_usage(&self.state.usage) {
            tracing::warn!(error = %err, "could not encode usage counters");
        }
        self.store.flush();
    }
}
