pub mod auth;
pub mod chat;
pub mod persona;
pub mod profile;
pub mod sessions;

use std::sync::Arc;

use crate::api::{ClientError, HttpChatService};
use crate::app::App;
use crate::store::LocalStore;
use crate::util::{CliContext, load_credentials};
use crate::view::ChatView;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Authenticated service from the stored login. The stored api_url wins
/// unless it differs from the one requested, in which case the login is
/// for another backend and does not apply.
pub fn service(ctx: &CliContext) -> Result<Arc<HttpChatService>, ClientError> {
    let creds = load_credentials(&ctx.credentials_path()).ok_or(ClientError::AuthRequired)?;
    if creds.api_url != ctx.api_url {
        tracing::debug!(stored = %creds.api_url, requested = %ctx.api_url, "stored login is for another backend");
        return Err(ClientError::AuthRequired);
    }
    Ok(Arc::new(HttpChatService::new(
        &ctx.api_url,
        Some(creds.session_cookie),
    )))
}

/// Open the local store and the client, reconcile gamification and make
/// sure a current session exists.
pub async fn started_app<V: ChatView>(
    ctx: &CliContext,
    view: V,
) -> Result<App<HttpChatService, V>, Box<dyn std::error::Error>> {
    let service = service(ctx)?;
    let store = LocalStore::open(&ctx.store_path())?;
    let mut app = App::new(service, store, view);
    app.start().await?;
    Ok(app)
}
