use ei_core::badges::{BadgeDefinition, BadgeId};
use ei_core::gamification::GamificationState;
use serde_json::{Value, json};

use super::{CommandResult, service};
use crate::app::App;
use crate::reconciler::ReconcileOutcome;
use crate::state::ClientState;
use crate::store::LocalStore;
use crate::util::{CliContext, print_json};
use crate::view::SilentView;

pub async fn profile(ctx: &CliContext) -> CommandResult {
    let store = LocalStore::open(&ctx.store_path())?;
    let mut app = App::new(service(ctx)?, store, SilentView);
    let outcome = app.reconcile().await?;
    let summary = profile_summary(app.state(), outcome);
    app.shutdown().await;
    print_json(&summary)
}

fn profile_summary(state: &ClientState, outcome: ReconcileOutcome) -> Value {
    let (known, unknown) = split_badges(&state.gamification);
    json!({
        "username": state.username,
        "subscription_status": state.subscription,
        "persona": state.persona,
        "progress": state.progress(),
        "badges": known,
        "unrecognized_badges": unknown,
        "usage": {
            "messages_sent": state.usage.messages_sent,
            "personas_tried": state.usage.personas_tried,
            "sessions_interacted": state.usage.sessions_interacted.len(),
            "history_viewed": state.usage.history_viewed,
        },
        "migration": format!("{outcome:?}"),
    })
}

/// Badge definitions for ids this client knows; the rest stay raw.
fn split_badges(state: &GamificationState) -> (Vec<BadgeDefinition>, Vec<&str>) {
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    for id in &state.badges {
        match id.parse::<BadgeId>() {
            Ok(badge) => known.push(badge.definition()),
            Err(_) => unknown.push(id.as_str()),
        }
    }
    (known, unknown)
}
