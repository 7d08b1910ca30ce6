//! Interactive chat loop

use anyhow::Result;
use console::style;
use dialoguer::Input;
use metis_chat_core::utils::is_temporary_id;

use crate::app::{with_spinner, App};
use crate::render;

/// A line typed at the chat prompt
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    New,
    Sessions,
    Switch(String),
    Refresh,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());
    match (name, arg) {
        ("new", _) => ChatInput::New,
        ("sessions" | "list", _) => ChatInput::Sessions,
        ("switch", Some(id)) => ChatInput::Switch(id.to_string()),
        ("refresh", _) => ChatInput::Refresh,
        ("help", _) => ChatInput::Help,
        ("quit" | "exit" | "q", _) => ChatInput::Quit,
        _ => ChatInput::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("{}", style("Commands:").bold());
    println!("  /new           start a new chat");
    println!("  /sessions      list chats");
    println!("  /switch <id>   open another chat");
    println!("  /refresh       reload the current chat from the server");
    println!("  /quit          leave");
}

fn print_sessions(app: &App) {
    let state = app.store.snapshot();
    if state.sessions.is_empty() {
        println!("{}", style("No chats yet").dim());
    }
    for session in &state.sessions {
        let messages = state
            .messages
            .get(&session.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let is_current = state.current_session_id.as_deref() == Some(session.id.as_str());
        println!("{}", render::session_line(session, messages, is_current));
    }
}

async fn open_session(app: &App, session_id: &str) {
    app.store.set_current_session(session_id);
    if !is_temporary_id(session_id) {
        with_spinner("Loading chat...", app.store.fetch_session_by_id(session_id)).await;
    }
    if !app.report_error() {
        render::print_messages(&app.store.current_messages());
    }
}

/// Run the interactive chat until the user quits
pub async fn run(app: &App, session: Option<String>) -> Result<()> {
    with_spinner("Loading chats...", app.store.fetch_sessions()).await;
    app.report_error();

    match session {
        Some(id) => open_session(app, &id).await,
        None => {
            if app.store.current_session_id().is_none() {
                app.store.create_new_chat();
            }
            render::print_messages(&app.store.current_messages());
        }
    }
    println!("{}", style("Type /help for commands").dim());

    loop {
        let line: String = Input::new()
            .with_prompt(style("you").green().bold().to_string())
            .allow_empty(true)
            .interact_text()?;

        match parse_input(&line) {
            ChatInput::Message(text) => {
                let before = app.store.current_messages().len();
                with_spinner("Waiting for reply...", app.store.send_message(&text)).await;
                if !app.report_error() {
                    // Skip our own message, already echoed by the prompt.
                    for message in app.store.current_messages().iter().skip(before + 1) {
                        println!("{}", render::message_block(message));
                    }
                }
            }
            ChatInput::New => {
                app.store.create_new_chat();
                println!("{}", style("Started a new chat").dim());
            }
            ChatInput::Sessions => print_sessions(app),
            ChatInput::Switch(id) => open_session(app, &id).await,
            ChatInput::Refresh => match app.store.current_session_id() {
                Some(id) => open_session(app, &id).await,
                None => println!("{}", style("No chat selected").dim()),
            },
            ChatInput::Help => print_help(),
            ChatInput::Quit => break,
            ChatInput::Empty => {}
            ChatInput::Unknown(input) => {
                println!("{} {}", style("Unknown command:").yellow(), input);
            }
        }
    }
    Ok(())
}
