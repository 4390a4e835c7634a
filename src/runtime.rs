//! Event loop driver
//!
//! The runtime is the single owner of the `Session`. Terminal input, spinner
//! ticks and remote call results all funnel into one FIFO path through the
//! pure transition function. Remote calls run on worker tasks that report
//! back as events; they never touch the session.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::widgets::Spinner;
use ratatui::backend::Backend;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Artificial pause before a conversational reply is surfaced
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_secs(1);

/// Somewhere to paint the rendered view
pub trait Frontend {
    fn draw(&mut self, view: &str) -> io::Result<()>;
}

impl<B: Backend> Frontend for Terminal<B> {
    fn draw(&mut self, view: &str) -> io::Result<()> {
        Terminal::draw(self, |frame| {
            let paragraph = Paragraph::new(view).wrap(Wrap { trim: false });
            frame.render_widget(paragraph, frame.area());
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Applied after a successful converse only
    pub reply_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            tick_interval: Spinner::interval(),
        }
    }
}

/// Errors that end the event loop
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to draw the terminal: {0}")]
    Terminal(#[source] io::Error),
    #[error("failed to read terminal input: {0}")]
    Input(#[source] io::Error),
    #[error("terminal input closed")]
    InputClosed,
}
