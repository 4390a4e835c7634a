//! Terminal setup and input mapping

use crate::runtime::Frontend;
use crate::state_machine::Event;
use crossterm::event::{
    Event as TerminalEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures::{future, Stream, StreamExt};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};

/// Raw-mode alternate screen, restored on drop
pub struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = stdout.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                restore();
                Err(e)
            }
        }
    }
}

impl Frontend for TerminalSession {
    fn draw(&mut self, view: &str) -> io::Result<()> {
        Frontend::draw(&mut self.terminal, view)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        restore();
    }
}

fn restore() {
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

/// Terminal input as session events. Events with no meaning here are dropped.
pub fn input_events() -> impl Stream<Item = io::Result<Event>> + Unpin {
    EventStream::new().filter_map(|item| {
        future::ready(match item {
            Ok(event) => map_event(event).map(Ok),
            Err(e) => Some(Err(e)),
        })
    })
}

pub fn map_event(event: TerminalEvent) -> Option<Event> {
    match event {
        TerminalEvent::Key(key) if key.kind != KeyEventKind::Release => Some(map_key(key)),
        TerminalEvent::Resize(width, height) => Some(Event::Resize { width, height }),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Event {
    match key.code {
        KeyCode::Enter => Event::Submit,
        KeyCode::Esc => Event::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Event::Quit,
        _ => Event::Key(key),
    }
}
