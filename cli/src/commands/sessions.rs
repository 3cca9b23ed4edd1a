use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use super::{CommandResult, started_app};
use crate::api::ChatService;
use crate::sessions::DeleteOutcome;
use crate::util::{CliContext, exit_error, print_json};
use crate::view::{SessionRow, SilentView};

#[derive(Subcommand)]
pub enum SessionsCommands {
    /// List past chat sessions, newest first as the backend orders them
    List,
    /// Print the stored exchanges of a session
    Show {
        /// Session UUID
        session_id: Uuid,
    },
    /// Make a past session the current one
    Switch {
        /// Session UUID
        session_id: Uuid,
    },
    /// Start a new, empty session
    New,
    /// Delete a session and its messages
    Delete {
        /// Session UUID
        session_id: Uuid,
        /// Confirm deletion (required, no interactive prompt)
        #[arg(long)]
        confirm: bool,
    },
}

pub async fn run(ctx: &CliContext, command: SessionsCommands) -> CommandResult {
    match command {
        SessionsCommands::List => list(ctx).await,
        SessionsCommands::Show { session_id } => show(ctx, session_id).await,
        SessionsCommands::Switch { session_id } => switch(ctx, session_id).await,
        SessionsCommands::New => new(ctx).await,
        SessionsCommands::Delete {
            session_id,
            confirm,
        } => delete(ctx, session_id, confirm).await,
    }
}

async fn list(ctx: &CliContext) -> CommandResult {
    let app = started_app(ctx, SilentView).await?;
    let sessions = app.service.sessions().await?;
    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|summary| SessionRow {
            session_id: summary.session_id,
            preview: summary.preview().to_string(),
            started_at: summary.started_at(),
            active: app.state().is_current(summary.session_id),
        })
        .collect();
    app.shutdown().await;
    print_json(&rows)
}

async fn show(ctx: &CliContext, session_id: Uuid) -> CommandResult {
    let mut app = started_app(ctx, SilentView).await?;
    let history = app.service.history(session_id).await?;
    app.state.usage.history_viewed = true;
    app.persist_usage();
    app.evaluate_badges();
    app.shutdown().await;
    print_json(&json!({
        "session_id": session_id,
        "messages": history,
    }))
}

async fn switch(ctx: &CliContext, session_id: Uuid) -> CommandResult {
    let mut app = started_app(ctx, SilentView).await?;
    let changed = app.switch_session(session_id).await;
    app.shutdown().await;
    print_json(&json!({
        "status": if changed { "switched" } else { "already_current" },
        "session_id": session_id,
    }))
}

async fn new(ctx: &CliContext) -> CommandResult {
    let mut app = started_app(ctx, SilentView).await?;
    let session_id = app.start_new_session().await;
    app.shutdown().await;
    print_json(&json!({
        "status": "created",
        "session_id": session_id,
    }))
}

async fn delete(ctx: &CliContext, session_id: Uuid, confirm: bool) -> CommandResult {
    if !confirm {
        exit_error(
            "Deleting a session removes all of its messages and cannot be undone.",
            Some("Add --confirm to proceed: ei sessions delete <id> --confirm"),
        );
    }
    let mut app = started_app(ctx, SilentView).await?;
    let outcome = app.delete_session(session_id, true).await;
    app.shutdown().await;
    let replaced_by = match outcome? {
        DeleteOutcome::Deleted { replaced_by } => replaced_by,
        DeleteOutcome::NotConfirmed => None,
    };
    print_json(&json!({
        "status": "deleted",
        "session_id": session_id,
        "new_current_session": replaced_by,
    }))
}
