//! Request and response bodies of the chat backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gamification::GamificationState;
use crate::persona::Persona;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Active,
}

/// Authoritative user profile held by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
}

impl UserProfile {
    pub fn gamification(&self) -> GamificationState {
        GamificationState {
            xp: self.xp,
            badges: self.badges.iter().cloned().collect(),
        }
    }
}

/// Body of `POST /update_gamification`. Fields carry absolute totals; an
/// omitted field is left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
}

impl GamificationUpdate {
    pub fn xp(xp: u64) -> Self {
        Self {
            xp: Some(xp),
            badges: None,
        }
    }

    pub fn badges(state: &GamificationState) -> Self {
        Self {
            xp: None,
            badges: Some(state.badges.iter().cloned().collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.xp.is_none() && self.badges.is_none()
    }
}

/// Body of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Minimum password length enforced before `POST /register` is attempted.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub persona: Persona,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// One row of `GET /get_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    #[serde(default)]
    pub first_user_message_preview: Option<String>,
    /// Either RFC 3339 or the RFC 2822 style the backend's JSON encoder emits
    #[serde(default)]
    pub first_timestamp: Option<String>,
}

impl SessionSummary {
    pub fn preview(&self) -> &str {
        self.first_user_message_preview
            .as_deref()
            .filter(|preview| !preview.trim().is_empty())
            .unwrap_or("Chat session")
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.first_timestamp.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
    }
}

/// One exchange of `GET /get_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: String,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub ei_response: Option<String>,
}

/// Body of `PUT /edit_message/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub new_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_defaults_missing_gamification_fields() {
        let profile: UserProfile = serde_json::from_value(json!({"username": "mira"})).unwrap();
        assert_eq!(profile.xp, 0);
        assert!(profile.badges.is_empty());
        assert_eq!(profile.subscription_status, SubscriptionStatus::None);
    }

    #[test]
    fn gamification_update_omits_unset_fields() {
        let body = serde_json::to_value(GamificationUpdate::xp(130)).unwrap();
        assert_eq!(body, json!({"xp": 130}));
    }

    #[test]
    fn session_timestamp_accepts_both_encodings() {
        let mut summary = SessionSummary {
            session_id: Uuid::nil(),
            first_user_message_preview: None,
            first_timestamp: Some("Tue, 01 Jul 2025 12:00:00 GMT".to_string()),
        };
        assert!(summary.started_at().is_some());
        summary.first_timestamp = Some("2025-07-01T12:00:00Z".to_string());
        assert!(summary.started_at().is_some());
        assert_eq!(summary.preview(), "Chat session");
    }

    #[test]
    fn chat_request_uses_persona_wire_id() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi".to_string(),
            persona: Persona::Sage,
            session_id: Uuid::nil(),
        })
        .unwrap();
        assert_eq!(body["persona"], "sage");
    }
}
