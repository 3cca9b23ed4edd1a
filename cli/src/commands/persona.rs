use ei_core::persona::Persona;
use serde_json::json;

use super::CommandResult;
use crate::store::LocalStore;
use crate::util::{CliContext, print_json};

/// List the personas, marking the stored selection.
pub fn personas(ctx: &CliContext) -> CommandResult {
    let selected = LocalStore::open(&ctx.store_path())?.persona();
    let rows: Vec<_> = Persona::ALL
        .into_iter()
        .map(|persona| {
            json!({
                "persona": persona.profile(),
                "selected": persona == selected,
            })
        })
        .collect();
    print_json(&rows)
}

/// Store `persona` as the one new messages are sent with.
pub fn select(ctx: &CliContext, persona: Persona) -> CommandResult {
    let mut store = LocalStore::open(&ctx.store_path())?;
    store.set_persona(persona);
    store.save()?;
    print_json(&json!({
        "status": "selected",
        "persona": persona.profile(),
    }))
}
