//! Session state types

use crate::eliza::RpcError;
use crate::widgets::{Spinner, TextInput};

pub const INPUT_PLACEHOLDER: &str = "Joseph Weizenbaum";
pub const INPUT_CHAR_LIMIT: usize = 156;
pub const INPUT_WIDTH: usize = 50;

/// Discrete state of the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Prompting for the user's name
    #[default]
    AwaitingName,

    /// Introduction call in flight for the candidate name
    Introducing { name: String },

    /// Transcript visible, ready for the next line
    AwaitingLine,

    /// Conversational round trip in flight
    Conversing,

    /// A remote call failed; only quitting is left
    Failed,
}

/// Reply slot of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Pending,
    Received(String),
    /// The round trip failed; the user's line is kept
    Failed,
}

/// One user line and ELIZA's reply to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub said: String,
    pub reply: Reply,
}

impl Exchange {
    pub fn pending(said: impl Into<String>) -> Self {
        Self {
            said: said.into(),
            reply: Reply::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.reply == Reply::Pending
    }
}

/// The whole client session, owned by the runtime and replaced on every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    /// Set once the introduction completes, never changed afterwards
    pub user_name: String,
    /// Lines streamed back by the introduction
    pub introduction: Vec<String>,
    /// At most the last exchange is pending
    pub transcript: Vec<Exchange>,
    pub last_error: Option<RpcError>,
    pub input: TextInput,
    pub spinner: Spinner,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut input = TextInput::new()
            .with_placeholder(INPUT_PLACEHOLDER)
            .with_char_limit(INPUT_CHAR_LIMIT)
            .with_width(INPUT_WIDTH);
        input.focus();

        Self {
            phase: Phase::AwaitingName,
            user_name: String::new(),
            introduction: Vec::new(),
            transcript: Vec::new(),
            last_error: None,
            input,
            spinner: Spinner::new(),
        }
    }

    /// True exactly while a remote call is outstanding
    pub fn is_waiting(&self) -> bool {
        matches!(self.phase, Phase::Introducing { .. } | Phase::Conversing)
    }

    pub fn is_failed(&self) -> bool {
        self.phase == Phase::Failed
    }

    pub fn has_introduced(&self) -> bool {
        !self.user_name.is_empty()
    }
}
