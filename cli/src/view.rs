//! What the user sees. The client emits `ViewEvent`s; a view decides how to
//! draw them.

use std::io::Write;

use chrono::{DateTime, Utc};
use ei_core::badges::BadgeId;
use ei_core::gamification::LevelProgress;
use ei_core::persona::Persona;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub preview: String,
    pub started_at: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    UserMessage {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        from_history: bool,
    },
    Reply {
        text: String,
        persona: Persona,
        from_history: bool,
    },
    /// Inline error bubble in the log
    ErrorBubble { text: String },
    SystemInfo { text: String },
    ClearLog,
    EmptyPlaceholder,
    SessionList { sessions: Vec<SessionRow> },
    SessionListError { message: String },
    SessionRemoved { session_id: Uuid },
    ActiveSession { session_id: Uuid },
    PersonaChanged { persona: Persona },
    LevelUp { level: u32 },
    BadgeUnlocked { badge: BadgeId },
    Progress { progress: LevelProgress },
}

pub trait ChatView {
    fn emit(&mut self, event: ViewEvent);
}

/// Human-readable transcript on a writer (stdout in practice).
pub struct TerminalView<W: Write> {
    out: W,
    persona: Persona,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout(persona: Persona) -> Self {
        Self {
            out: std::io::stdout(),
            persona,
        }
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, persona: Persona) -> Self {
        Self { out, persona }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, event: &ViewEvent) -> std::io::Result<()> {
        match event {
            ViewEvent::UserMessage {
                text, message_id, ..
            } => match message_id {
                Some(id) => writeln!(self.out, "you [{id}]> {text}"),
                None => writeln!(self.out, "you> {text}"),
            },
            ViewEvent::Reply { text, persona, .. } => {
                writeln!(self.out, "{}> {text}", persona.display_name())
            }
            ViewEvent::ErrorBubble { text } => writeln!(self.out, "! {text}"),
            ViewEvent::SystemInfo { text } => writeln!(self.out, "* {text}"),
            ViewEvent::ClearLog => writeln!(self.out, "{}", "-".repeat(48)),
            ViewEvent::EmptyPlaceholder => {
                writeln!(self.out, "(no messages yet, say something to {})", self.persona_name())
            }
            ViewEvent::SessionList { sessions } if sessions.is_empty() => {
                writeln!(self.out, "No past sessions found.")
            }
            ViewEvent::SessionList { sessions } => {
                for row in sessions {
                    let marker = if row.active { '*' } else { ' ' };
                    let started = row
                        .started_at
                        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "N/A".to_string());
                    writeln!(
                        self.out,
                        "{marker} {}  {started}  {}",
                        row.session_id, row.preview
                    )?;
                }
                Ok(())
            }
            ViewEvent::SessionListError { message } => {
                writeln!(self.out, "! Could not load sessions: {message}")
            }
            ViewEvent::SessionRemoved { session_id } => {
                writeln!(self.out, "* Session {session_id} deleted.")
            }
            ViewEvent::ActiveSession { session_id } => {
                writeln!(self.out, "* Current session: {session_id}")
            }
            ViewEvent::PersonaChanged { persona } => {
                self.persona = *persona;
                writeln!(self.out, "* Now talking to {}", persona.display_name())
            }
            ViewEvent::LevelUp { level } => writeln!(
                self.out,
                "* Congratulations! You've reached Level {level}! ✨"
            ),
            ViewEvent::BadgeUnlocked { badge } => {
                let def = badge.definition();
                writeln!(
                    self.out,
                    "* Badge Unlocked! {} {}: {}",
                    def.emoji, def.name, def.description
                )
            }
            ViewEvent::Progress { progress } => {
                writeln!(self.out, "* {}", progress_line(progress))
            }
        }
    }

    fn persona_name(&self) -> &'static str {
        self.persona.display_name()
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn emit(&mut self, event: ViewEvent) {
        if let Err(err) = self.render(&event).and_then(|()| self.out.flush()) {
            tracing::debug!(error = %err, "terminal write failed");
        }
    }
}

/// `Level 2 · 175/250 XP [#####-----]`, or `MAX` past the last threshold.
pub fn progress_line(progress: &LevelProgress) -> String {
    let filled = usize::from(progress.percent / 10);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled));
    format!(
        "Level {} · {}/{} XP [{bar}]",
        progress.level,
        progress.xp,
        progress.next_label()
    )
}

/// One JSON object per line, for scripts and agents.
pub struct JsonLinesView<W: Write> {
    out: W,
}

impl JsonLinesView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ChatView for JsonLinesView<W> {
    fn emit(&mut self, event: ViewEvent) {
        let written = serde_json::to_string(&event)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(self.out, "{line}"))
            .and_then(|()| self.out.flush());
        if let Err(err) = written {
            tracing::debug!(error = %err, "json view write failed");
        }
    }
}

/// Drops everything. Used by commands that print their own summary.
pub struct SilentView;

impl ChatView for SilentView {
    fn emit(&mut self, event: ViewEvent) {
        tracing::trace!(?event, "view event suppressed");
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

#[cfg(test)]
impl RecordingView {
    pub fn replies(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Reply { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

#[cfg(test)]
impl ChatView for RecordingView {
    fn emit(&mut self, event: ViewEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use ei_core::gamification::LevelTable;

    use super::*;

    fn render(events: Vec<ViewEvent>) -> String {
        let mut view = TerminalView::new(Vec::new(), Persona::Sage);
        for event in events {
            view.emit(event);
        }
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn empty_session_list_has_placeholder_row() {
        let out = render(vec![ViewEvent::SessionList { sessions: vec![] }]);
        assert_eq!(out, "No past sessions found.\n");
    }

    #[test]
    fn active_session_is_marked() {
        let id = Uuid::nil();
        let out = render(vec![ViewEvent::SessionList {
            sessions: vec![SessionRow {
                session_id: id,
                preview: "hello".to_string(),
                started_at: None,
                active: true,
            }],
        }]);
        assert!(out.starts_with(&format!("* {id}  N/A  hello")));
    }

    #[test]
    fn reply_uses_persona_display_name() {
        let out = render(vec![ViewEvent::Reply {
            text: "Patience.".to_string(),
            persona: Persona::Sage,
            from_history: false,
        }]);
        assert_eq!(out, "Ei (Sage)> Patience.\n");
    }

    #[test]
    fn progress_line_shows_max_at_cap() {
        let table = LevelTable::default();
        assert_eq!(
            progress_line(&table.progress(175)),
            "Level 2 · 175/250 XP [#####-----]"
        );
        assert_eq!(
            progress_line(&table.progress(6000)),
            "Level 11 · 6000/MAX XP [##########]"
        );
    }

    #[test]
    fn json_lines_are_tagged() {
        let mut view = JsonLinesView { out: Vec::new() };
        view.emit(ViewEvent::LevelUp { level: 2 });
        let line = String::from_utf8(view.out).unwrap();
        assert_eq!(line, "{\"event\":\"level_up\",\"level\":2}\n");
    }
}
