//! Interactive chat and the one-shot `send` / `edit` commands.

use ei_core::persona::Persona;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use super::{CommandResult, started_app};
use crate::api::ChatService;
use crate::app::App;
use crate::pipeline::ReplyOutcome;
use crate::sessions::DeleteOutcome;
use crate::util::CliContext;
use crate::view::{ChatView, JsonLinesView, TerminalView};

const HELP: &str = "Commands: /new, /sessions, /switch <id>, /delete <id>, \
/edit <message_id> <text>, /persona <id>, /profile, /help, /quit. \
Anything else is sent as a message.";

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    NewSession,
    ListSessions,
    Switch(Uuid),
    Delete(Uuid),
    Edit { message_id: String, text: String },
    Persona(Persona),
    Profile,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Message(line.to_string());
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));

    match name {
        "new" => ReplInput::NewSession,
        "sessions" => ReplInput::ListSessions,
        "switch" | "delete" => match rest.parse::<Uuid>() {
            Ok(id) if name == "switch" => ReplInput::Switch(id),
            Ok(id) => ReplInput::Delete(id),
            Err(_) => ReplInput::Invalid(format!("/{name} needs a session id")),
        },
        "edit" => match rest.split_once(char::is_whitespace) {
            Some((message_id, text)) if !text.trim().is_empty() => ReplInput::Edit {
                message_id: message_id.to_string(),
                text: text.trim().to_string(),
            },
            _ => ReplInput::Invalid("/edit needs a message id and the new text".to_string()),
        },
        "persona" => match rest.parse::<Persona>() {
            Ok(persona) => ReplInput::Persona(persona),
            Err(err) => ReplInput::Invalid(err.to_string()),
        },
        "profile" => ReplInput::Profile,
        "help" => ReplInput::Help,
        "quit" | "exit" => ReplInput::Quit,
        other => ReplInput::Invalid(format!("unknown command /{other}, try /help")),
    }
}

pub async fn chat(ctx: &CliContext, persona: Option<Persona>, json: bool) -> CommandResult {
    if json {
        let app = started_app(ctx, JsonLinesView::stdout()).await?;
        repl(app, persona).await
    } else {
        let view = TerminalView::stdout(persona.unwrap_or_default());
        let app = started_app(ctx, view).await?;
        repl(app, persona).await
    }
}

async fn repl<S: ChatService, V: ChatView>(
    mut app: App<S, V>,
    persona: Option<Persona>,
) -> CommandResult {
    if let Some(persona) = persona {
        app.set_persona(persona);
    }
    app.open_chat().await;
    app.notify(HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_delete: Option<Uuid> = None;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(session_id) = pending_delete.take() {
                    confirm_delete(&mut app, session_id, &line).await;
                    continue;
                }
                match parse_input(&line) {
                    ReplInput::Quit => break,
                    ReplInput::Delete(session_id) => {
                        app.notify(format!("Delete session {session_id}? This cannot be undone. [y/N]"));
                        pending_delete = Some(session_id);
                    }
                    input => handle(&mut app, input).await,
                }
            }
            Some(envelope) = app.next_reply() => {
                app.apply_reply(envelope).await;
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

async fn handle<S: ChatService, V: ChatView>(app: &mut App<S, V>, input: ReplInput) {
    match input {
        ReplInput::Message(text) => {
            app.submit(&text);
        }
        ReplInput::NewSession => {
            app.start_new_session().await;
        }
        ReplInput::ListSessions => {
            app.refresh_sessions().await;
        }
        ReplInput::Switch(session_id) => {
            if !app.switch_session(session_id).await {
                app.notify("Already in that session.");
            }
        }
        ReplInput::Edit { message_id, text } => {
            app.edit_and_resubmit(&message_id, &text).await;
        }
        ReplInput::Persona(persona) => {
            app.set_persona(persona);
        }
        ReplInput::Profile => app.show_profile(),
        ReplInput::Help => app.notify(HELP),
        ReplInput::Invalid(message) => app.notify(message),
        ReplInput::Empty | ReplInput::Quit | ReplInput::Delete(_) => {}
    }
}

async fn confirm_delete<S: ChatService, V: ChatView>(
    app: &mut App<S, V>,
    session_id: Uuid,
    answer: &str,
) {
    let confirmed = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    // Failures are already rendered inline by the session manager.
    if let Ok(DeleteOutcome::NotConfirmed) = app.delete_session(session_id, confirmed).await {
        app.notify("Delete cancelled.");
    }
}

/// Send one message in the current session and print the exchange.
pub async fn send(
    ctx: &CliContext,
    message: &str,
    persona: Option<Persona>,
    json: bool,
) -> CommandResult {
    if json {
        let app = started_app(ctx, JsonLinesView::stdout()).await?;
        send_one(app, persona, message).await
    } else {
        let view = TerminalView::stdout(persona.unwrap_or_default());
        let app = started_app(ctx, view).await?;
        send_one(app, persona, message).await
    }
}

async fn send_one<S: ChatService, V: ChatView>(
    mut app: App<S, V>,
    persona: Option<Persona>,
    message: &str,
) -> CommandResult {
    if let Some(persona) = persona {
        app.set_persona(persona);
    }
    let outcome = app.send_and_wait(message).await;
    app.shutdown().await;
    finish(outcome)
}

/// Edit a stored message and resubmit it in the current session.
pub async fn edit(ctx: &CliContext, message_id: &str, text: &str, json: bool) -> CommandResult {
    if json {
        let app = started_app(ctx, JsonLinesView::stdout()).await?;
        edit_one(app, message_id, text).await
    } else {
        let app = started_app(ctx, TerminalView::stdout(Persona::default())).await?;
        edit_one(app, message_id, text).await
    }
}

async fn edit_one<S: ChatService, V: ChatView>(
    mut app: App<S, V>,
    message_id: &str,
    text: &str,
) -> CommandResult {
    let outcome = match app.edit_and_resubmit(message_id, text).await {
        Some(ticket) => app.wait_for(ticket).await,
        None => None,
    };
    app.shutdown().await;
    finish(outcome)
}

fn finish(outcome: Option<ReplyOutcome>) -> CommandResult {
    match outcome {
        Some(ReplyOutcome::Applied) => Ok(()),
        Some(ReplyOutcome::Failed) => Err("the chat backend did not return a reply".into()),
        Some(other) => Err(format!("reply was dropped ({other:?})").into()),
        None => Err("nothing was sent".into()),
    }
}
