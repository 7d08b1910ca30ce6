//! Terminal rendering of sessions and messages

use chrono::Local;
use console::style;
use metis_chat_core::session::{Message, Role, Session};
use metis_chat_core::utils::truncate;

const PREVIEW_LEN: usize = 48;

/// One line describing a session in a listing
pub fn session_line(session: &Session, messages: &[Message], is_current: bool) -> String {
    let marker = if is_current { "*" } else { " " };
    let started = session
        .started_at()
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let preview = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| truncate(&m.content.replace('\n', " "), PREVIEW_LEN))
        .unwrap_or_else(|| "(empty)".to_string());
    let id = if session.is_temporary() {
        "(new chat)".to_string()
    } else {
        session.id.clone()
    };

    format!(
        "{} {:<38} {:<16} {:>3} msgs  {}",
        marker,
        id,
        started,
        messages.len(),
        preview
    )
}

/// Speaker label and body of a message
pub fn message_block(message: &Message) -> String {
    let label = match message.role {
        Role::User => style("you").green().bold().to_string(),
        Role::Ai => style("bot").cyan().bold().to_string(),
    };
    let mut out = format!("{} {}", label, message.content);

    let mut details = Vec::new();
    if message.is_temporary() {
        details.push("unconfirmed".to_string());
    }
    if let Some(reason) = message.finish_reason.as_deref().filter(|r| !r.is_empty()) {
        details.push(format!("finish: {}", reason.to_lowercase()));
    }
    if let Some(citations) = message.citations.as_ref().filter(|c| !c.is_empty()) {
        details.push(format!("{} citations", citations.len()));
    }
    if let Some(billing) = &message.billing {
        details.push(format!("cost {:.4}", billing.cost));
    }
    if !details.is_empty() {
        out.push_str(&format!(" {}", style(format!("[{}]", details.join(", "))).dim()));
    }
    out
}

pub fn print_messages(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", style("(no messages yet)").dim());
    }
    for message in messages {
        println!("{}", message_block(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metis_chat_core::session::Billing;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            bot_id: "bot-1".to_string(),
            user: None,
            messages: Vec::new(),
            start_date: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_session_line_previews_first_user_message() {
        let messages = vec![
            Message::new(Role::Ai, "Welcome"),
            Message::new(Role::User, "Tell me about\nRust"),
        ];
        let line = session_line(&session("s1"), &messages, true);

        assert!(line.starts_with("* s1"));
        assert!(line.contains("2 msgs"));
        assert!(line.contains("Tell me about Rust"));
    }

    #[test]
    fn test_session_line_for_temporary_session() {
        let line = session_line(&Session::temporary("bot-1"), &[], false);
        assert!(line.contains("(new chat)"));
        assert!(line.contains("(empty)"));
    }

    #[test]
    fn test_message_block_lists_metadata() {
        let mut message = Message::new(Role::Ai, "Done");
        message.finish_reason = Some("STOP".to_string());
        message.billing = Some(Billing { cost: 0.5 });

        let block = console::strip_ansi_codes(&message_block(&message)).to_string();
        assert_eq!(block, "bot Done [finish: stop, cost 0.5000]");
    }

    #[test]
    fn test_message_block_marks_unconfirmed() {
        let block = message_block(&Message::optimistic_user("Hi"));
        assert!(console::strip_ansi_codes(&block).contains("[unconfirmed]"));
    }
}
