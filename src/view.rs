//! Rendering of the session
//!
//! `render` is a pure function of the session; the frontend only paints the
//! returned text.

use crate::state_machine::{Reply, Session};
use std::fmt::Write;

const ASSISTANT: &str = "Eliza";
const NAME_PROMPT: &str = "Let's introduce you! - what's your name?";

pub fn render(session: &Session) -> String {
    if let Some(error) = &session.last_error {
        return format!("An error occurred: {error}");
    }
    if session.has_introduced() {
        conversation_view(session)
    } else {
        introduction_view(session)
    }
}

fn introduction_view(session: &Session) -> String {
    let mut out = String::from(NAME_PROMPT);
    out.push_str("\n\n");
    if session.is_waiting() {
        out.push_str(session.spinner.view());
    } else {
        out.push_str(&session.input.view());
    }
    out
}

fn conversation_view(session: &Session) -> String {
    let mut out = String::new();
    for line in &session.introduction {
        let _ = writeln!(out, "{ASSISTANT}: {line}");
    }
    out.push('\n');

    let last = session.transcript.len().saturating_sub(1);
    for (i, exchange) in session.transcript.iter().enumerate() {
        let _ = writeln!(out, "{}: {}", session.user_name, exchange.said);
        let reply = match &exchange.reply {
            Reply::Pending if i == last && session.is_waiting() => session.spinner.view(),
            Reply::Received(sentence) => sentence.as_str(),
            Reply::Pending | Reply::Failed => "",
        };
        let _ = writeln!(out, "{ASSISTANT}: {reply}");
    }

    if !session.is_waiting() {
        out.push_str(&session.input.view());
    }
    out
}
