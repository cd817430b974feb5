mod repl;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use windlass::chat::ChatEngine;
use windlass::{config, secrets};

#[derive(Parser)]
#[command(name = "windlass")]
#[command(about = "A chatbot with session-scoped, windowed conversational memory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Repl {
        /// Session identifier (a fresh one is generated if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Keep only the last N turns in the prompt
        #[arg(short, long)]
        window: Option<u32>,

        /// Send the full history every turn
        #[arg(long)]
        unlimited: bool,

        /// Request deterministic generation (temperature 0)
        #[arg(long)]
        deterministic: bool,
    },

    /// Send a single message and print the response
    Ask {
        /// The message to send
        message: String,

        /// Session identifier (a fresh one is generated if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Keep only the last N turns in the prompt
        #[arg(short, long)]
        window: Option<u32>,

        /// Send the full history every turn
        #[arg(long)]
        unlimited: bool,

        /// Request deterministic generation (temperature 0)
        #[arg(long)]
        deterministic: bool,
    },

    /// Manage provider credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the resolved configuration
    Status,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Prompt for an API key and store it in the credentials dir
    Set {
        /// Provider name ("anthropic" or "openai")
        provider: String,
    },
}

fn apply_overrides(
    config: &mut config::WindlassConfig,
    window: Option<u32>,
    unlimited: bool,
    deterministic: bool,
) {
    if let Some(turns) = window {
        config.memory.window_turns = turns;
    }
    if unlimited {
        config.memory.unlimited = true;
    }
    if deterministic {
        config.model.deterministic = true;
    }
}

fn session_or_fresh(session: Option<String>) -> String {
    session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Repl {
            session,
            window,
            unlimited,
            deterministic,
        } => {
            let mut config = config::load()?;
            apply_overrides(&mut config, window, unlimited, deterministic);
            repl::run(&config, &session_or_fresh(session)).await
        }

        Commands::Ask {
            message,
            session,
            window,
            unlimited,
            deterministic,
        } => {
            let mut config = config::load()?;
            apply_overrides(&mut config, window, unlimited, deterministic);
            let mut engine = ChatEngine::from_config(&config)?;
            let response = engine.send(&session_or_fresh(session), &message).await?;
            println!("{response}");
            Ok(())
        }

        Commands::Auth { action } => match action {
            AuthAction::Set { provider } => {
                let key = rpassword::prompt_password(format!("API key for {provider}: "))?;
                let path = secrets::store_api_key(&provider, &key)?;
                println!("stored key at {}", path.display());
                Ok(())
            }
        },

        Commands::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "config already exists at {}; use --force to overwrite",
                    path.display()
                );
            }
            config::save_to_path(&path)?;
            println!("wrote {}", path.display());
            Ok(())
        }

        Commands::Status => {
            let config = config::load()?;
            println!("windlass v{}", env!("CARGO_PKG_VERSION"));
            println!("provider: {}", config.model.provider);
            println!("model: {}", config.model.model);
            println!(
                "api key: {}",
                if config.model.api_key.is_some() {
                    "resolved"
                } else {
                    "missing"
                }
            );
            if config.memory.unlimited {
                println!("memory: unlimited");
            } else {
                println!("memory: last {} turns", config.memory.window_turns);
            }
            println!("deterministic: {}", config.model.deterministic);
            Ok(())
        }
    }
}
