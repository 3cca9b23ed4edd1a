use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Achievement identifiers. Serialized with the camelCase ids the profile
/// service stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeId {
    FirstEcho,
    CuriousMind,
    Level2Reached,
    SessionWeaver,
    TimeTraveler,
    DedicatedListener,
    PersonaVirtuoso,
}

/// Static description of a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeDefinition {
    pub id: BadgeId,
    pub name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
}

/// Usage counters the unlock predicates are evaluated over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCounters {
    pub messages_sent: u64,
    pub personas_tried: BTreeSet<Persona>,
    pub sessions_interacted: u64,
    pub history_viewed: bool,
    pub level: u32,
}

impl BadgeId {
    pub const ALL: [BadgeId; 7] = [
        BadgeId::FirstEcho,
        BadgeId::CuriousMind,
        BadgeId::Level2Reached,
        BadgeId::SessionWeaver,
        BadgeId::TimeTraveler,
        BadgeId::DedicatedListener,
        BadgeId::PersonaVirtuoso,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BadgeId::FirstEcho => "firstEcho",
            BadgeId::CuriousMind => "curiousMind",
            BadgeId::Level2Reached => "level2Reached",
            BadgeId::SessionWeaver => "sessionWeaver",
            BadgeId::TimeTraveler => "timeTraveler",
            BadgeId::DedicatedListener => "dedicatedListener",
            BadgeId::PersonaVirtuoso => "personaVirtuoso",
        }
    }

    pub fn definition(self) -> BadgeDefinition {
        let (name, description, emoji) = match self {
            BadgeId::FirstEcho => (
                "First Echo",
                "You've initiated your first conversation with Ei.",
                "💬",
            ),
            BadgeId::CuriousMind => (
                "Curious Mind",
                "Explored at least 2 different facets of Ei's personality.",
                "🎭",
            ),
            BadgeId::Level2Reached => (
                "Level 2 Reached",
                "Your connection with Ei is growing stronger!",
                "✨",
            ),
            BadgeId::SessionWeaver => (
                "Session Weaver",
                "Weaving at least 3 threads of conversation.",
                "🧵",
            ),
            BadgeId::TimeTraveler => (
                "Time Traveler",
                "Revisited a past conversation stream.",
                "🕰️",
            ),
            BadgeId::DedicatedListener => (
                "Dedicated Listener",
                "Listened and responded thoughtfully (25 messages sent).",
                "🎧",
            ),
            BadgeId::PersonaVirtuoso => (
                "Persona Virtuoso",
                "Experienced all primary facets of Ei (all 5 personas tried).",
                "🌟",
            ),
        };
        BadgeDefinition {
            id: self,
            name,
            description,
            emoji,
        }
    }

    fn is_earned(self, counters: &BadgeCounters) -> bool {
        match self {
            BadgeId::FirstEcho => counters.messages_sent >= 1,
            BadgeId::CuriousMind => counters.personas_tried.len() >= 2,
            BadgeId::Level2Reached => counters.level >= 2,
            BadgeId::SessionWeaver => counters.sessions_interacted >= 3,
            BadgeId::TimeTraveler => counters.history_viewed,
            BadgeId::DedicatedListener => counters.messages_sent >= 25,
            BadgeId::PersonaVirtuoso => Persona::ALL
                .iter()
                .all(|persona| counters.personas_tried.contains(persona)),
        }
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown badge id '{s}'"))
    }
}

/// Badges whose predicate holds and which are not in `unlocked` yet.
///
/// Pure and idempotent: evaluating again with the returned ids added to
/// `unlocked` yields nothing. Nothing is ever reported as locked again.
pub fn newly_unlocked(counters: &BadgeCounters, unlocked: &BTreeSet<String>) -> Vec<BadgeId> {
    BadgeId::ALL
        .into_iter()
        .filter(|id| !unlocked.contains(id.as_str()))
        .filter(|id| id.is_earned(counters))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(badges: &[BadgeId]) -> BTreeSet<String> {
        badges.iter().map(|id| id.as_str().to_string()).collect()
    }

    #[test]
    fn fresh_counters_unlock_nothing() {
        let counters = BadgeCounters {
            level: 1,
            ..BadgeCounters::default()
        };
        assert!(newly_unlocked(&counters, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn first_message_unlocks_first_echo_once() {
        let counters = BadgeCounters {
            messages_sent: 1,
            level: 1,
            ..BadgeCounters::default()
        };
        let first = newly_unlocked(&counters, &BTreeSet::new());
        assert_eq!(first, vec![BadgeId::FirstEcho]);
        assert!(newly_unlocked(&counters, &ids(&first)).is_empty());
    }

    #[test]
    fn unlocks_are_monotonic_as_counters_grow() {
        let mut unlocked = BTreeSet::new();
        let mut counters = BadgeCounters {
            level: 1,
            ..BadgeCounters::default()
        };
        for step in 0..30u64 {
            counters.messages_sent = step;
            counters.sessions_interacted = step / 5;
            counters.level = 1 + (step / 10) as u32;
            if step == 12 {
                counters.history_viewed = true;
            }
            let before = unlocked.clone();
            for id in newly_unlocked(&counters, &unlocked) {
                unlocked.insert(id.as_str().to_string());
            }
            assert!(before.is_subset(&unlocked));
        }
        assert!(unlocked.contains("dedicatedListener"));
        assert!(unlocked.contains("timeTraveler"));
        assert!(unlocked.contains("sessionWeaver"));
    }

    #[test]
    fn persona_virtuoso_requires_every_persona() {
        let mut counters = BadgeCounters {
            level: 1,
            personas_tried: Persona::ALL[..4].iter().copied().collect(),
            ..BadgeCounters::default()
        };
        let unlocked = newly_unlocked(&counters, &BTreeSet::new());
        assert!(unlocked.contains(&BadgeId::CuriousMind));
        assert!(!unlocked.contains(&BadgeId::PersonaVirtuoso));

        counters.personas_tried.insert(Persona::ALL[4]);
        let unlocked = newly_unlocked(&counters, &ids(&unlocked));
        assert_eq!(unlocked, vec![BadgeId::PersonaVirtuoso]);
    }

    #[test]
    fn wire_ids_round_trip_through_from_str() {
        for id in BadgeId::ALL {
            assert_eq!(id.as_str().parse::<BadgeId>().unwrap(), id);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }
}
