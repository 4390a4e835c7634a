//! Single-line editable text buffer

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

const PROMPT: &str = "> ";
const CURSOR: char = '█';

/// Single-line text input with placeholder, character limit and visible width.
///
/// Keys are ignored while the input is blurred, which is how the session
/// disables editing during an outstanding call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    value: Vec<char>,
    cursor: usize,
    placeholder: String,
    char_limit: usize,
    width: usize,
    focused: bool,
}

impl Default for TextInput {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            cursor: 0,
            placeholder: String::new(),
            char_limit: 0,
            width: 0,
            focused: false,
        }
    }
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Maximum number of characters accepted; 0 means unlimited
    pub fn with_char_limit(mut self, limit: usize) -> Self {
        self.char_limit = limit;
        self
    }

    /// Number of characters shown at once; 0 means unlimited
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn value(&self) -> String {
        self.value.iter().collect()
    }

    #[allow(dead_code)] // Used by tests
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    #[allow(dead_code)] // Used by tests
    pub fn char_limit(&self) -> usize {
        self.char_limit
    }

    #[allow(dead_code)] // Used by tests
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Clear the buffer and move the cursor home
    pub fn reset(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Apply a key press to the buffer
    pub fn handle_key(&mut self, key: &KeyEvent) {
        if !self.focused || key.kind == KeyEventKind::Release {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.value.len(),
            KeyCode::Char('u') if ctrl => {
                self.value.drain(..self.cursor);
                self.cursor = 0;
            }
            KeyCode::Char('k') if ctrl => self.value.truncate(self.cursor),
            KeyCode::Char('w') if ctrl => self.delete_word_backward(),
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.value.remove(self.cursor);
            }
            KeyCode::Delete if self.cursor < self.value.len() => {
                self.value.remove(self.cursor);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            _ => {}
        }
    }

    fn insert(&mut self, c: char) {
        if self.char_limit > 0 && self.value.len() >= self.char_limit {
            return;
        }
        self.value.insert(self.cursor, c);
        self.cursor += 1;
    }

    fn delete_word_backward(&mut self) {
        let mut start = self.cursor;
        while start > 0 && self.value[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.value[start - 1].is_whitespace() {
            start -= 1;
        }
        self.value.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn view(&self) -> String {
        let mut out = String::from(PROMPT);

        if self.value.is_empty() && !self.placeholder.is_empty() {
            if self.focused {
                out.push(CURSOR);
            }
            out.push_str(&self.placeholder);
            return out;
        }

        // Scroll horizontally so the cursor stays inside the visible window
        let (start, end) = if self.width == 0 || self.value.len() <= self.width {
            (0, self.value.len())
        } else {
            let start = self.cursor.saturating_sub(self.width);
            (start, (start + self.width).min(self.value.len()))
        };

        for (i, c) in self.value[start..end].iter().enumerate() {
            if self.focused && start + i == self.cursor {
                out.push(CURSOR);
            }
            out.push(*c);
        }
        if self.focused && self.cursor == end {
            out.push(CURSOR);
        }
        out
    }
}
