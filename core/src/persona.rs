use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A conversational voice of Ei. The backend selects its system prompt from
/// the wire id, so the serialized form must stay stable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    Friendly,
    Sage,
    Coding,
    Sarcastic,
    Scifi,
}

/// Display metadata for a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersonaProfile {
    pub id: Persona,
    pub display_name: &'static str,
    /// Avatar model (GLB) rendered next to the conversation
    pub avatar_url: &'static str,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Friendly,
        Persona::Sage,
        Persona::Coding,
        Persona::Sarcastic,
        Persona::Scifi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Friendly => "friendly",
            Persona::Sage => "sage",
            Persona::Coding => "coding",
            Persona::Sarcastic => "sarcastic",
            Persona::Scifi => "scifi",
        }
    }

    pub fn profile(self) -> PersonaProfile {
        let (display_name, avatar_url) = match self {
            Persona::Friendly => (
                "Ei (Friendly)",
                "https://models.readyplayer.me/683424f141bfeee7cc66dac1.glb",
            ),
            Persona::Sage => (
                "Ei (Sage)",
                "https://models.readyplayer.me/683430d3ab2f2a1923a50157.glb",
            ),
            Persona::Coding => (
                "Ei (Coding Mentor)",
                "https://models.readyplayer.me/68357d10eff9e447b093ad69.glb",
            ),
            Persona::Sarcastic => (
                "Ei (Sarcastic)",
                "https://models.readyplayer.me/68357e47c24bd6b4127b13b5.glb",
            ),
            Persona::Scifi => (
                "Ei (Sci-Fi Bot)",
                "https://models.readyplayer.me/68357ed7a4fff27714a9d6f2.glb",
            ),
        };
        PersonaProfile {
            id: self,
            display_name,
            avatar_url,
        }
    }

    pub fn display_name(self) -> &'static str {
        self.profile().display_name
    }

    /// Parse a stored persona id, falling back to the default voice for
    /// anything unrecognised (older clients stored free-form values).
    pub fn from_stored(raw: Option<&str>) -> Persona {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persona '{0}' (expected one of: friendly, sage, coding, sarcastic, scifi)")]
pub struct UnknownPersona(pub String);

impl FromStr for Persona {
    type Err = UnknownPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Persona::ALL
            .into_iter()
            .find(|persona| persona.as_str() == normalized)
            .ok_or_else(|| UnknownPersona(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_ids_case_insensitively() {
        assert_eq!("Sage".parse::<Persona>().unwrap(), Persona::Sage);
        assert_eq!(" scifi ".parse::<Persona>().unwrap(), Persona::Scifi);
        assert!("pirate".parse::<Persona>().is_err());
    }

    #[test]
    fn unknown_stored_value_falls_back_to_friendly() {
        assert_eq!(Persona::from_stored(Some("pirate")), Persona::Friendly);
        assert_eq!(Persona::from_stored(None), Persona::Friendly);
        assert_eq!(Persona::from_stored(Some("coding")), Persona::Coding);
    }

    #[test]
    fn serializes_as_snake_case_id() {
        let json = serde_json::to_string(&Persona::Sarcastic).unwrap();
        assert_eq!(json, "\"sarcastic\"");
        assert_eq!(Persona::Coding.display_name(), "Ei (Coding Mentor)");
    }
}
