//! Session manager: which conversation is current, and keeping the visible
//! log and session list in step with it.

use ei_core::wire::SessionSummary;
use uuid::Uuid;

use crate::api::{ChatService, ClientError};
use crate::app::App;
use crate::view::{ChatView, SessionRow, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Confirmation was not given; nothing was sent.
    NotConfirmed,
    Deleted {
        /// Set when the current session was removed and a fresh one started.
        replaced_by: Option<Uuid>,
    },
}

impl<S: ChatService, V: ChatView> App<S, V> {
    /// Start an empty conversation under a fresh id.
    pub async fn start_new_session(&mut self) -> Uuid {
        let session_id = Uuid::new_v4();
        self.set_current_session(session_id);
        tracing::debug!(%session_id, "started new session");

        self.view.emit(ViewEvent::ClearLog);
        self.state.log_user_messages = 0;
        self.view.emit(ViewEvent::EmptyPlaceholder);

        self.refresh_sessions().await;
        self.view.emit(ViewEvent::ActiveSession { session_id });
        self.evaluate_badges();
        session_id
    }

    /// Make `session_id` current and render its history. Returns `false`
    /// when it already was current.
    pub async fn switch_session(&mut self, session_id: Uuid) -> bool {
        if self.state.is_current(session_id) {
            return false;
        }
        self.set_current_session(session_id);
        self.state.usage.history_viewed = true;
        self.persist_usage();
        tracing::debug!(%session_id, "switched session");

        // Clear before the fetch so a slow history never lands under the
        // wrong session.
        self.view.emit(ViewEvent::ClearLog);
        self.state.log_user_messages = 0;
        self.load_history(session_id).await;
        self.view.emit(ViewEvent::ActiveSession { session_id });
        self.evaluate_badges();
        true
    }

    /// Delete a session after the user confirmed. Deleting the current session
    /// starts a new one.
    pub async fn delete_session(
        &mut self,
        session_id: Uuid,
        confirmed: bool,
    ) -> Result<DeleteOutcome, ClientError> {
        if !confirmed {
            return Ok(DeleteOutcome::NotConfirmed);
        }
        if let Err(err) = self.service.delete_session(session_id).await {
            tracing::warn!(%session_id, error = %err, "delete session failed");
            self.view.emit(ViewEvent::SystemInfo {
                text: format!("Could not delete session: {err}"),
            });
            return Err(err);
        }

        self.view.emit(ViewEvent::SessionRemoved { session_id });
        let replaced_by = if self.state.is_current(session_id) {
            Some(self.start_new_session().await)
        } else {
            None
        };
        Ok(DeleteOutcome::Deleted { replaced_by })
    }

    /// Fetch the session list and render it with the current one marked.
    pub async fn refresh_sessions(&mut self) -> Option<Vec<SessionSummary>> {
        match self.service.sessions().await {
            Ok(sessions) => {
                let rows = sessions
                    .iter()
                    .map(|summary| SessionRow {
                        session_id: summary.session_id,
                        preview: summary.preview().to_string(),
                        started_at: summary.started_at(),
                        active: self.state.is_current(summary.session_id),
                    })
                    .collect();
                self.view.emit(ViewEvent::SessionList { sessions: rows });
                Some(sessions)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not fetch chat sessions");
                self.view.emit(ViewEvent::SessionListError {
                    message: err.to_string(),
                });
                None
            }
        }
    }

    /// Render the stored exchanges of `session_id` into the (cleared) log.
    pub(crate) async fn load_history(&mut self, session_id: Uuid) {
        let history = match self.service.history(session_id).await {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "could not fetch chat history");
                self.view.emit(ViewEvent::SystemInfo {
                    text: format!("System: Could not load chat history - {err}"),
                });
                return;
            }
        };

        // The user may have switched again while this was in flight.
        if !self.state.is_current(session_id) {
            return;
        }
        if history.is_empty() {
            self.view.emit(ViewEvent::EmptyPlaceholder);
            return;
        }
        for entry in history {
            if let Some(text) = entry.user_message {
                self.state.log_user_messages += 1;
                self.view.emit(ViewEvent::UserMessage {
                    text,
                    message_id: Some(entry.message_id),
                    from_history: true,
                });
            }
            if let Some(text) = entry.ei_response {
                self.view.emit(ViewEvent::Reply {
                    text,
                    persona: self.state.persona,
                    from_history: true,
                });
            }
        }
    }

    fn set_current_session(&mut self, session_id: Uuid) {
        self.state.current_session = Some(session_id);
        self.store.set_current_session(session_id);
        self.state.usage.sessions_interacted.insert(session_id);
        self.persist_usage();
    }
}
