//! Chat request pipeline: optimistic render, asynchronous send, and the
//! last-write-wins discard of superseded replies.

use ei_core::error::messages;
use ei_core::gamification::XP_PER_MESSAGE;
use ei_core::stale::RequestTicket;
use ei_core::wire::ChatRequest;

use crate::api::ChatService;
use crate::app::{App, ReplyEnvelope};
use crate::view::{ChatView, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied,
    /// Rendered as an error bubble.
    Failed,
    /// A newer request was sent after this one; dropped.
    Superseded,
    /// The user left the session the reply belongs to; dropped.
    OtherSession,
}

impl<S: ChatService, V: ChatView> App<S, V> {
    /// Render `text` immediately and send it. The reply arrives later through
    /// `next_reply`. Returns `None` when nothing was sent.
    pub fn submit(&mut self, text: &str) -> Option<RequestTicket> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        let Some(session_id) = self.state.current_session else {
            self.view.emit(ViewEvent::ErrorBubble {
                text: messages::NO_ACTIVE_SESSION.to_string(),
            });
            return None;
        };

        self.view.emit(ViewEvent::UserMessage {
            text: message.to_string(),
            message_id: None,
            from_history: false,
        });
        self.state.log_user_messages += 1;

        let persona = self.state.persona;
        self.state.usage.messages_sent += 1;
        self.state.usage.personas_tried.insert(persona);
        self.persist_usage();

        let ticket = self.guard.issue();
        tracing::debug!(ticket = ticket.millis(), %session_id, %persona, "sending chat message");

        let request = ChatRequest {
            message: message.to_string(),
            persona,
            session_id,
        };
        let service = self.service.clone();
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = service.chat(request).await;
            let envelope = ReplyEnvelope {
                ticket,
                session_id,
                persona,
                result,
            };
            if replies.send(envelope).is_err() {
                tracing::debug!("reply arrived after the client shut down");
            }
        });
        Some(ticket)
    }

    /// Persist an edited message, then send it again as if new. Any reply
    /// still pending for earlier messages is superseded.
    pub async fn edit_and_resubmit(
        &mut self,
        message_id: &str,
        new_text: &str,
    ) -> Option<RequestTicket> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return None;
        }
        if let Err(err) = self.service.edit_message(message_id, new_text).await {
            tracing::warn!(message_id, error = %err, "edit message failed");
            self.view.emit(ViewEvent::ErrorBubble {
                text: err.bubble_text(),
            });
            return None;
        }
        self.submit(new_text)
    }

    /// Apply a reply if it is still the latest request for the current
    /// session; otherwise drop it without rendering or awarding anything.
    pub async fn apply_reply(&mut self, envelope: ReplyEnvelope) -> ReplyOutcome {
        if !self.guard.is_current(envelope.ticket) {
            tracing::debug!(
                ticket = envelope.ticket.millis(),
                latest = self.guard.latest().map(RequestTicket::millis),
                "discarding superseded reply"
            );
            return ReplyOutcome::Superseded;
        }
        if !self.state.is_current(envelope.session_id) {
            tracing::debug!(session_id = %envelope.session_id, "discarding reply for a session no longer shown");
            return ReplyOutcome::OtherSession;
        }

        let outcome = match envelope.result {
            Ok(reply) => {
                self.view.emit(ViewEvent::Reply {
                    text: reply.reply,
                    persona: envelope.persona,
                    from_history: false,
                });
                self.award_xp(XP_PER_MESSAGE);
                ReplyOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat request failed");
                self.view.emit(ViewEvent::ErrorBubble {
                    text: err.bubble_text(),
                });
                ReplyOutcome::Failed
            }
        };
        self.evaluate_badges();

        // First exchange of a new conversation: the backend now lists it.
        if self.state.log_user_messages == 1 {
            self.refresh_sessions().await;
        }
        outcome
    }

    /// Send one message and wait until its reply (or a newer one) is applied.
    pub async fn send_and_wait(&mut self, text: &str) -> Option<ReplyOutcome> {
        let ticket = self.submit(text)?;
        self.wait_for(ticket).await
    }

    /// Apply replies as they arrive until the one for `ticket` is in.
    pub async fn wait_for(&mut self, ticket: RequestTicket) -> Option<ReplyOutcome> {
        loop {
            let envelope = self.next_reply().await?;
            let own = envelope.ticket == ticket;
            let outcome = self.apply_reply(envelope).await;
            if own {
                return Some(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ei_core::badges::BadgeId;

    use crate::store::LocalStore;
    use crate::test_support::{ClientErrorKind, FakeService, app};

    use super::*;

    #[tokio::test]
    async fn user_message_is_rendered_before_the_reply_arrives() {
        let service = FakeService::with_profile(0, &[]);
        service.reply_after("hello", 50, "hi");
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        app.submit("  hello  ").unwrap();
        assert!(matches!(
            app.view().events.last(),
            Some(ViewEvent::UserMessage { text, .. }) if text == "hello"
        ));
        assert!(app.view().replies().is_empty());

        let envelope = app.next_reply().await.unwrap();
        assert_eq!(app.apply_reply(envelope).await, ReplyOutcome::Applied);
        assert_eq!(app.view().replies(), vec!["hi"]);
        assert_eq!(app.state.gamification.xp, XP_PER_MESSAGE);
    }

    #[tokio::test]
    async fn blank_message_is_not_sent() {
        let service = FakeService::with_profile(0, &[]);
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;
        assert!(app.submit("   ").is_none());
        assert_eq!(app.state.usage.messages_sent, 0);
    }

    #[tokio::test]
    async fn no_current_session_renders_error_bubble() {
        let service = FakeService::with_profile(0, &[]);
        let mut app = app(&service, LocalStore::ephemeral());
        assert!(app.submit("hello").is_none());
        assert_eq!(
            app.view().events,
            vec![ViewEvent::ErrorBubble {
                text: messages::NO_ACTIVE_SESSION.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn late_reply_to_older_request_is_discarded() {
        let service = FakeService::with_profile(0, &[]);
        service.reply_after("first", 120, "reply to first");
        service.reply_after("second", 10, "reply to second");
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        let first = app.submit("first").unwrap();
        let second = app.submit("second").unwrap();
        assert!(first < second);

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let envelope = app.next_reply().await.unwrap();
            let ticket = envelope.ticket;
            outcomes.push((ticket, app.apply_reply(envelope).await));
        }

        assert_eq!(
            outcomes,
            vec![
                (second, ReplyOutcome::Applied),
                (first, ReplyOutcome::Superseded)
            ]
        );
        assert_eq!(app.view().replies(), vec!["reply to second"]);
        assert_eq!(app.state.gamification.xp, XP_PER_MESSAGE);
    }

    #[tokio::test]
    async fn edit_and_resubmit_renders_only_the_edited_reply() {
        let service = FakeService::with_profile(0, &[]);
        service.reply_after("message A", 100, "reply A");
        service.reply_after("message B", 20, "reply B");
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        app.submit("message A").unwrap();
        let b = app.edit_and_resubmit("m-a", "message B").await.unwrap();

        let mut applied = Vec::new();
        for _ in 0..2 {
            let envelope = app.next_reply().await.unwrap();
            if app.apply_reply(envelope).await == ReplyOutcome::Applied {
                applied.push(b);
            }
        }

        assert_eq!(applied.len(), 1);
        assert_eq!(app.view().replies(), vec!["reply B"]);
        assert_eq!(
            service.state().edits,
            vec![("m-a".to_string(), "message B".to_string())]
        );
    }

    #[tokio::test]
    async fn older_reply_arriving_first_is_still_discarded() {
        let service = FakeService::with_profile(0, &[]);
        service.reply_after("A", 0, "reply A");
        service.reply_after("B", 60, "reply B");
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        app.submit("A").unwrap();
        app.submit("B").unwrap();

        let first = app.next_reply().await.unwrap();
        assert_eq!(app.apply_reply(first).await, ReplyOutcome::Superseded);
        let second = app.next_reply().await.unwrap();
        assert_eq!(app.apply_reply(second).await, ReplyOutcome::Applied);
        assert_eq!(app.view().replies(), vec!["reply B"]);
    }

    #[tokio::test]
    async fn failed_reply_renders_bubble_without_xp() {
        let service = FakeService::with_profile(0, &[]);
        service.fail_after("hello", 0, ClientErrorKind::Backend);
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        assert_eq!(app.send_and_wait("hello").await, Some(ReplyOutcome::Failed));
        assert_eq!(app.state.gamification.xp, 0);
        assert!(app.view().events.contains(&ViewEvent::ErrorBubble {
            text: "An internal error occurred processing your request.".to_string()
        }));
        // The message still counts as sent.
        assert!(app.state.gamification.badges.contains(BadgeId::FirstEcho.as_str()));
    }

    #[tokio::test]
    async fn undecodable_reply_uses_generic_bubble() {
        let service = FakeService::with_profile(0, &[]);
        service.fail_after("hello", 0, ClientErrorKind::Garbled);
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        app.send_and_wait("hello").await;
        assert!(app.view().events.contains(&ViewEvent::ErrorBubble {
            text: messages::NO_REPLY.to_string()
        }));
    }

    #[tokio::test]
    async fn reply_for_a_session_left_behind_is_dropped() {
        let service = FakeService::with_profile(0, &[]);
        service.reply_after("hello", 40, "late");
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;

        app.submit("hello").unwrap();
        app.start_new_session().await;

        let envelope = app.next_reply().await.unwrap();
        assert_eq!(app.apply_reply(envelope).await, ReplyOutcome::OtherSession);
        assert!(app.view().replies().is_empty());
    }

    #[tokio::test]
    async fn first_exchange_refreshes_session_list() {
        let service = FakeService::with_profile(0, &[]);
        let mut app = app(&service, LocalStore::ephemeral());
        app.start_new_session().await;
        let lists_before = app
            .view()
            .count(|e| matches!(e, ViewEvent::SessionList { .. }));

        app.send_and_wait("hello").await;
        app.send_and_wait("again").await;

        let lists_after = app
            .view()
            .count(|e| matches!(e, ViewEvent::SessionList { .. }));
        assert_eq!(lists_after, lists_before + 1);
    }

    #[tokio::test]
    async fn reply_is_sent_with_current_persona_and_session() {
        let service = FakeService::with_profile(0, &[]);
        let mut app = app(&service, LocalStore::ephemeral());
        let session_id = app.start_new_session().await;
        app.set_persona(ei_core::persona::Persona::Coding);

        app.send_and_wait("fn main").await;

        let chats = service.state().chats.clone();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].session_id, session_id);
        assert_eq!(chats[0].persona, ei_core::persona::Persona::Coding);
        assert!(app.view().replies().contains(&"echo: fn main"));
    }
}
