//! Crossterm events to bridge events.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use easel::{HostEvent, PhysicalKey};

use crate::terminal::viewport_for;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Ctrl-C: the user tears the host down.
    Quit,
    Forward(Vec<HostEvent>),
}

/// Physical key name for a crossterm key code.
///
/// Terminals report characters rather than key positions, so a character is
/// mapped back to the key that usually produces it on a US layout.
#[must_use]
pub fn physical_key(code: KeyCode) -> PhysicalKey {
    let name = match code {
        KeyCode::Char(c) => {
            if let Some(key) = PhysicalKey::letter(c) {
                return key;
            }
            if c.is_ascii_digit() {
                return PhysicalKey::new(format!("Digit{c}"));
            }
            match c {
                ' ' => "Space",
                '-' | '_' => "Minus",
                '=' | '+' => "Equal",
                ',' | '<' => "Comma",
                '.' | '>' => "Period",
                '/' | '?' => "Slash",
                ';' | ':' => "Semicolon",
                '\'' | '"' => "Quote",
                '[' | '{' => "BracketLeft",
                ']' | '}' => "BracketRight",
                '\\' | '|' => "Backslash",
                '`' | '~' => "Backquote",
                _ => "Unidentified",
            }
        }
        KeyCode::F(n) => return PhysicalKey::new(format!("F{n}")),
        KeyCode::Esc => "Escape",
        KeyCode::Enter => "Enter",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab | KeyCode::BackTab => "Tab",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Insert => "Insert",
        KeyCode::Delete => "Delete",
        _ => "Unidentified",
    };
    PhysicalKey::from(name)
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'C'))
}

/// Translate one terminal event.
///
/// Without release reporting every press is followed by a synthetic release,
/// so the guest never sees a key stuck down.
#[must_use]
pub fn translate(event: &Event, reports_releases: bool) -> Input {
    let events = match event {
        Event::Key(key) if is_interrupt(key) => return Input::Quit,
        Event::Key(key) => {
            let physical = physical_key(key.code);
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat if reports_releases => {
                    vec![HostEvent::KeyDown(physical)]
                }
                KeyEventKind::Press | KeyEventKind::Repeat => vec![
                    HostEvent::KeyDown(physical.clone()),
                    HostEvent::KeyUp(physical),
                ],
                KeyEventKind::Release => vec![HostEvent::KeyUp(physical)],
            }
        }
        Event::Resize(cols, rows) => vec![HostEvent::Resize(viewport_for(*cols, *rows))],
        _ => Vec::new(),
    };
    Input::Forward(events)
}
