//! CLI entry point for metis-chat

mod app;
mod chat;
mod render;

use anyhow::{bail, Result};
use app::{with_spinner, App};
use clap::{Parser, Subcommand};
use console::style;
use metis_chat_core::config::ConfigLoader;
use metis_chat_core::logging::init_logging;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "metis-chat")]
#[command(about = "Chat with a MetisAI bot from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the API key, bot id and server address
    Configure {
        /// API key used as the bearer token
        #[arg(short = 'k', long)]
        api_key: Option<String>,
        /// Bot to chat with
        #[arg(short, long)]
        bot_id: Option<String>,
        /// Base URL of the chat API
        #[arg(long)]
        base_url: Option<String>,
    },
    /// List chat sessions
    Sessions,
    /// Show the messages of a session
    Show {
        /// Session ID
        id: String,
    },
    /// Send one message and print the reply
    Send {
        /// Message to send
        message: String,
        /// Session to send into; a new chat is started when omitted
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Interactive chat
    Chat {
        /// Session to open
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let log_dir = loader.log_dir(&config);
    std::fs::create_dir_all(&log_dir)?;
    let _guard = init_logging(&config.logging, &log_dir);
    info!("metis-chat starting with config dir {}", loader.config_dir().display());

    let mut app = App::new(loader, config)?;

    match cli.command {
        Commands::Configure {
            api_key,
            bot_id,
            base_url,
        } => configure(&mut app, api_key, bot_id, base_url),
        Commands::Sessions => {
            app.ensure_configured()?;
            sessions(&app).await
        }
        Commands::Show { id } => {
            app.ensure_configured()?;
            show(&app, &id).await
        }
        Commands::Send { message, session } => {
            app.ensure_configured()?;
            send(&app, &message, session).await
        }
        Commands::Chat { session } => {
            app.ensure_configured()?;
            chat::run(&app, session).await
        }
    }
}

fn configure(
    app: &mut App,
    api_key: Option<String>,
    bot_id: Option<String>,
    base_url: Option<String>,
) -> Result<()> {
    if let Some(base_url) = base_url {
        app.set_base_url(base_url)?;
    }
    let credentials = app.configure(api_key, bot_id)?;

    println!("{} Configuration saved", style("✓").green().bold());
    println!("  API:   {}", app.config.api.base_url);
    println!("  Bot:   {}", credentials.bot_id);
    println!("  Store: {}", app.credentials.path().display());
    Ok(())
}

async fn sessions(app: &App) -> Result<()> {
    with_spinner("Loading chats...", app.store.fetch_sessions()).await;
    fail_on_error(app)?;

    let state = app.store.snapshot();
    if state.sessions.is_empty() {
        println!("{}", style("No chats yet").dim());
        return Ok(());
    }
    for session in &state.sessions {
        let messages = state
            .messages
            .get(&session.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        println!("{}", render::session_line(session, messages, false));
    }
    Ok(())
}

async fn show(app: &App, id: &str) -> Result<()> {
    with_spinner("Loading chat...", app.store.fetch_session_by_id(id)).await;
    fail_on_error(app)?;

    match app.store.messages_for(id) {
        Some(messages) => render::print_messages(&messages),
        None => bail!("Chat {} not found", id),
    }
    Ok(())
}

async fn send(app: &App, message: &str, session: Option<String>) -> Result<()> {
    match session {
        Some(id) => {
            app.store.set_current_session(id);
            with_spinner("Waiting for reply...", app.store.send_message(message)).await;
            fail_on_error(app)?;
        }
        None => {
            let id = with_spinner("Waiting for reply...", app.store.start_conversation(message))
                .await?;
            println!("{} {}", style("session").dim(), id);
        }
    }

    if let Some(reply) = app.store.current_messages().last() {
        println!("{}", render::message_block(reply));
    }
    Ok(())
}

/// Turn a recorded store error into a command failure
fn fail_on_error(app: &App) -> Result<()> {
    match app.store.error() {
        Some(error) => {
            app.store.reset_error();
            bail!(error)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send_with_global_config_dir() {
        let cli = Cli::try_parse_from([
            "metis-chat",
            "send",
            "Hello",
            "--session",
            "s1",
            "--config-dir",
            "/tmp/metis",
        ])
        .unwrap();

        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/metis")));
        match cli.command {
            Commands::Send { message, session } => {
                assert_eq!(message, "Hello");
                assert_eq!(session.as_deref(), Some("s1"));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_configure_flags() {
        let cli = Cli::try_parse_from(["metis-chat", "configure", "-k", "sk-1", "-b", "bot-9"])
            .unwrap();
        match cli.command {
            Commands::Configure {
                api_key,
                bot_id,
                base_url,
            } => {
                assert_eq!(api_key.as_deref(), Some("sk-1"));
                assert_eq!(bot_id.as_deref(), Some("bot-9"));
                assert!(base_url.is_none());
            }
            _ => panic!("expected configure"),
        }
    }
}
