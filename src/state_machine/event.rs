//! Events that can occur in a session

use crate::eliza::RpcError;
use crossterm::event::KeyEvent;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Terminal events
    /// Submit the input widget's current text
    Submit,
    Quit,
    /// Any other key press, forwarded to the input widget
    Key(KeyEvent),
    /// Activity indicator clock
    Tick,
    Resize {
        width: u16,
        height: u16,
    },

    // Remote call outcomes
    IntroduceResolved {
        lines: Vec<String>,
    },
    ConverseResolved {
        sentence: String,
    },
    CallFailed {
        call: Call,
        error: RpcError,
    },
}

/// Which remote operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Introduce,
    Converse,
}
