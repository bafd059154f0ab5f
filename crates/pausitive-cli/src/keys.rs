//! Keyboard control for real-time runs.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    TogglePause,
    Stop,
    Repeat,
}

pub fn command_for(key: KeyEvent) -> Option<KeyCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(KeyCommand::Stop),
        (_, KeyCode::Char(' ')) | (_, KeyCode::Char('p')) => Some(KeyCommand::TogglePause),
        (_, KeyCode::Esc) | (_, KeyCode::Char('q')) => Some(KeyCommand::Stop),
        (_, KeyCode::Char('r')) => Some(KeyCommand::Repeat),
        _ => None,
    }
}

/// Wait up to `timeout` for a key press.
pub fn poll(timeout: Duration) -> io::Result<Option<KeyCommand>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(command_for(key)),
        _ => Ok(None),
    }
}

/// Block until a key is pressed. Unbound keys come back as `None`.
pub fn next_key() -> io::Result<Option<KeyCommand>> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(command_for(key));
            }
        }
    }
}

/// Raw terminal mode for as long as the guard lives.
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn space_and_p_toggle_pause() {
        assert_eq!(command_for(press(KeyCode::Char(' '))), Some(KeyCommand::TogglePause));
        assert_eq!(command_for(press(KeyCode::Char('p'))), Some(KeyCommand::TogglePause));
    }

    #[test]
    fn escape_q_and_ctrl_c_stop() {
        assert_eq!(command_for(press(KeyCode::Esc)), Some(KeyCommand::Stop));
        assert_eq!(command_for(press(KeyCode::Char('q'))), Some(KeyCommand::Stop));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(command_for(ctrl_c), Some(KeyCommand::Stop));
    }

    #[test]
    fn releases_and_unbound_keys_are_ignored() {
        let mut release = press(KeyCode::Char(' '));
        release.kind = KeyEventKind::Release;
        assert_eq!(command_for(release), None);
        assert_eq!(command_for(press(KeyCode::Char('c'))), None);
        assert_eq!(command_for(press(KeyCode::Enter)), None);
    }
}
