use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::error::LayoutError;

/// A single key as seen by the event router.
///
/// Named keys follow the curses naming used in key bindings (`KEY_UP`, `KEY_RESIZE`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Up,
    Down,
    Left,
    Right,
    Tab,
    BackTab,
    Backspace,
    Esc,
    Resize,
    Interrupt,
}

impl Key {
    pub fn from_event(key: KeyEvent) -> Option<Key> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Key::Interrupt);
        }
        match key.code {
            KeyCode::Char(ch) => Some(Key::Char(ch)),
            KeyCode::Enter => Some(Key::Enter),
            KeyCode::Up => Some(Key::Up),
            KeyCode::Down => Some(Key::Down),
            KeyCode::Left => Some(Key::Left),
            KeyCode::Right => Some(Key::Right),
            KeyCode::Tab => Some(Key::Tab),
            KeyCode::BackTab => Some(Key::BackTab),
            KeyCode::Backspace => Some(Key::Backspace),
            KeyCode::Esc => Some(Key::Esc),
            _ => None,
        }
    }

    /// Short label used in shortcut legends.
    pub fn label(&self) -> String {
        match self {
            Key::Char(ch) => ch.to_string(),
            Key::Enter => "enter".to_string(),
            Key::Up => "\u{2191}".to_string(),
            Key::Down => "\u{2193}".to_string(),
            Key::Left => "\u{2190}".to_string(),
            Key::Right => "\u{2192}".to_string(),
            Key::Tab => "tab".to_string(),
            Key::BackTab => "S-tab".to_string(),
            Key::Backspace => "bksp".to_string(),
            Key::Esc => "esc".to_string(),
            Key::Resize => "resize".to_string(),
            Key::Interrupt => "C-c".to_string(),
        }
    }
}

impl FromStr for Key {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "\n" | "KEY_ENTER" => Key::Enter,
            "KEY_UP" => Key::Up,
            "KEY_DOWN" => Key::Down,
            "KEY_LEFT" => Key::Left,
            "KEY_RIGHT" => Key::Right,
            "KEY_RESIZE" => Key::Resize,
            "KEY_BACKSPACE" => Key::Backspace,
            "KEY_BTAB" => Key::BackTab,
            "\t" => Key::Tab,
            "\u{1b}" => Key::Esc,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => {
                        return Err(LayoutError::InvalidConfiguration(format!(
                            "unknown key name {other:?}"
                        )));
                    }
                }
            }
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(ch) => write!(f, "{ch}"),
            Key::Enter => f.write_str("\n"),
            Key::Up => f.write_str("KEY_UP"),
            Key::Down => f.write_str("KEY_DOWN"),
            Key::Left => f.write_str("KEY_LEFT"),
            Key::Right => f.write_str("KEY_RIGHT"),
            Key::Tab => f.write_str("\t"),
            Key::BackTab => f.write_str("KEY_BTAB"),
            Key::Backspace => f.write_str("KEY_BACKSPACE"),
            Key::Esc => f.write_str("\u{1b}"),
            Key::Resize => f.write_str("KEY_RESIZE"),
            Key::Interrupt => f.write_str("KEY_INTERRUPT"),
        }
    }
}

/// Blocking source of keys for the shell's main loop.
pub trait KeySource {
    fn next_key(&mut self) -> Result<Key>;
}

/// Reads keys from the controlling terminal, one blocking read at a time.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<Key> {
        loop {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(key) = Key::from_event(key) {
                        return Ok(key);
                    }
                }
                Event::Resize(_, _) => return Ok(Key::Resize),
                _ => {}
            }
        }
    }
}

/// Replays a fixed sequence of keys; used to drive the shell headlessly.
pub struct ScriptedKeys {
    keys: std::collections::VecDeque<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> Result<Key> {
        // An exhausted script behaves like the user interrupting the session.
        Ok(self.keys.pop_front().unwrap_or(Key::Interrupt))
    }
}
