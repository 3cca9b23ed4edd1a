use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ei_cli::api::ClientError;
use ei_cli::commands::{self, sessions::SessionsCommands};
use ei_cli::util::{CliContext, exit_error};
use ei_core::persona::Persona;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ei", version, about = "Ei CLI: chat with Ei's personas from the terminal")]
struct Cli {
    /// Chat backend base URL
    #[arg(long, env = "EI_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    /// Directory for credentials and local state (defaults to the user config dir)
    #[arg(long, env = "EI_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session cookie
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "EI_PASSWORD")]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        /// At least 6 characters
        #[arg(long, env = "EI_PASSWORD")]
        password: String,
    },
    /// Remove stored credentials
    Logout,
    /// Show level, XP and badges (migrates any older local progress first)
    Profile,
    /// Interactive chat
    Chat {
        /// Persona to talk to (friendly, sage, coding, sarcastic, scifi)
        #[arg(long)]
        persona: Option<Persona>,
        /// Print view events as JSON lines instead of a transcript
        #[arg(long)]
        json: bool,
    },
    /// Send a single message in the current session and wait for the reply
    Send {
        message: String,
        #[arg(long)]
        persona: Option<Persona>,
        #[arg(long)]
        json: bool,
    },
    /// Edit a stored message and send it again
    Edit {
        /// Message id as shown in the session history
        message_id: String,
        text: String,
        #[arg(long)]
        json: bool,
    },
    /// Chat session operations
    Sessions {
        #[command(subcommand)]
        command: SessionsCommands,
    },
    /// List personas
    Personas,
    /// Select the persona new messages go to
    Persona {
        persona: Persona,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ei_cli=warn,ei_core=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let ctx = CliContext::new(&cli.api_url, cli.state_dir);
    let result = match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, &password).await
        }
        Commands::Register { username, password } => {
            commands::auth::register(&ctx, &username, &password).await
        }
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Profile => commands::profile::profile(&ctx).await,
        Commands::Chat { persona, json } => commands::chat::chat(&ctx, persona, json).await,
        Commands::Send {
            message,
            persona,
            json,
        } => commands::chat::send(&ctx, &message, persona, json).await,
        Commands::Edit {
            message_id,
            text,
            json,
        } => commands::chat::edit(&ctx, &message_id, &text, json).await,
        Commands::Sessions { command } => commands::sessions::run(&ctx, command).await,
        Commands::Personas => commands::persona::personas(&ctx),
        Commands::Persona { persona } => commands::persona::select(&ctx, persona),
    };

    if let Err(e) = result {
        match e.downcast_ref::<ClientError>() {
            Some(ClientError::AuthRequired) => exit_error(
                "Authentication required.",
                Some("Run `ei login --username <name>`"),
            ),
            _ => exit_error(&e.to_string(), None),
        }
    }
}
