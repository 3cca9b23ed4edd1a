use std::collections::BTreeSet;

use ei_core::badges::BadgeCounters;
use ei_core::gamification::{GamificationState, LevelProgress, LevelTable};
use ei_core::persona::Persona;
use ei_core::wire::SubscriptionStatus;
use uuid::Uuid;

/// Usage counters the badges are evaluated over. Kept locally; the remote
/// profile has no fields for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub messages_sent: u64,
    pub personas_tried: BTreeSet<Persona>,
    pub sessions_interacted: BTreeSet<Uuid>,
    pub history_viewed: bool,
}

/// Everything the client tracks for the lifetime of one run.
#[derive(Debug, Clone)]
pub struct ClientState {
    pub persona: Persona,
    pub current_session: Option<Uuid>,
    pub username: Option<String>,
    pub subscription: SubscriptionStatus,
    pub gamification: GamificationState,
    pub usage: UsageCounters,
    pub levels: LevelTable,
    /// User messages rendered in the visible log since it was last cleared
    pub log_user_messages: usize,
}

impl ClientState {
    pub fn new(persona: Persona, current_session: Option<Uuid>, usage: UsageCounters) -> Self {
        Self {
            persona,
            current_session,
            username: None,
            subscription: SubscriptionStatus::None,
            gamification: GamificationState::default(),
            usage,
            levels: LevelTable::default(),
            log_user_messages: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.gamification.level(&self.levels)
    }

    pub fn progress(&self) -> LevelProgress {
        self.levels.progress(self.gamification.xp)
    }

    pub fn badge_counters(&self) -> BadgeCounters {
        BadgeCounters {
            messages_sent: self.usage.messages_sent,
            personas_tried: self.usage.personas_tried.clone(),
            sessions_interacted: self.usage.sessions_interacted.len() as u64,
            history_viewed: self.usage.history_viewed,
            level: self.level(),
        }
    }

    pub fn is_current(&self, session_id: Uuid) -> bool {
        self.current_session == Some(session_id)
    }
}
