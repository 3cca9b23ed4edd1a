use chrono::Utc;
use ei_core::wire::MIN_PASSWORD_LEN;
use serde_json::json;

use super::CommandResult;
use crate::api;
use crate::util::{CliContext, StoredCredentials, print_json, save_credentials};

pub async fn login(ctx: &CliContext, username: &str, password: &str) -> CommandResult {
    let cookie = api::login(&ctx.api_url, username, password).await?;
    let creds = StoredCredentials {
        api_url: ctx.api_url.clone(),
        username: username.to_string(),
        session_cookie: cookie,
        saved_at: Utc::now(),
    };
    let path = ctx.credentials_path();
    save_credentials(&path, &creds)?;
    tracing::info!(username, "logged in");

    print_json(&json!({
        "status": "authenticated",
        "username": username,
        "credentials_path": path.to_string_lossy()
    }))
}

pub async fn register(ctx: &CliContext, username: &str, password: &str) -> CommandResult {
    validate_registration(username, password)?;
    api::register(&ctx.api_url, username, password).await?;
    print_json(&json!({
        "status": "registered",
        "username": username,
        "next": "ei login"
    }))
}

pub fn logout(ctx: &CliContext) -> CommandResult {
    let path = ctx.credentials_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    print_json(&json!({
        "status": "logged_out",
        "credentials_path": path.to_string_lossy()
    }))
}

fn validate_registration(username: &str, password: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username must not be empty.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        ));
    }
    Ok(())
}
