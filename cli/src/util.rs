use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Stored login for the CLI
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub api_url: String,
    pub username: String,
    /// `name=value` pairs from the backend's `Set-Cookie`, sent back as `Cookie`
    pub session_cookie: String,
    pub saved_at: DateTime<Utc>,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub api_url: String,
    pub state_dir: PathBuf,
}

impl CliContext {
    pub fn new(api_url: &str, state_dir: Option<PathBuf>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            state_dir: state_dir.unwrap_or_else(default_state_dir),
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join("credentials.json")
    }

    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    let rendered = serde_json::to_string_pretty(&err).unwrap_or_else(|_| message.to_string());
    eprintln!("{rendered}");
    std::process::exit(1);
}

pub fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ei")
}

pub fn load_credentials(path: &Path) -> Option<StoredCredentials> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_credentials(
    path: &Path,
    creds: &StoredCredentials,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serde_json::to_string_pretty(creds)?;
    write_private(path, data.as_bytes())?;
    Ok(())
}

/// Write a file readable only by the current user (0o600 on unix).
pub fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)
}

// Unix-specific imports for file permissions
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// No-op on non-unix (won't compile for Windows without this)
#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
