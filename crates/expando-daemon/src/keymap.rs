use expando_core::{ControlKey, KeyInput};
use rdev::{Event, EventType, Key as RdevKey};

/// Translate a raw hook event into engine input. Releases, mouse motion and
/// the keys that only shape the next character yield `None`.
pub fn event_to_input(event: &Event) -> Option<KeyInput> {
    match event.event_type {
        EventType::KeyPress(key) => key_to_input(key, event.name.as_deref()),
        // A click moves the caret or the focus; either way the typed run ends.
        EventType::ButtonPress(_) => Some(KeyInput::FocusChange),
        _ => None,
    }
}

pub fn key_to_input(key: RdevKey, name: Option<&str>) -> Option<KeyInput> {
    let control = match key {
        RdevKey::ShiftLeft | RdevKey::ShiftRight | RdevKey::CapsLock | RdevKey::AltGr => {
            return None
        }
        RdevKey::ControlLeft
        | RdevKey::ControlRight
        | RdevKey::Alt
        | RdevKey::MetaLeft
        | RdevKey::MetaRight => ControlKey::Modifier,
        RdevKey::Space => return Some(KeyInput::Char(' ')),
        RdevKey::Backspace => ControlKey::Backspace,
        RdevKey::Return | RdevKey::KpReturn => ControlKey::Enter,
        RdevKey::Tab => ControlKey::Tab,
        RdevKey::Escape => ControlKey::Escape,
        RdevKey::Delete => ControlKey::Delete,
        RdevKey::UpArrow | RdevKey::DownArrow | RdevKey::LeftArrow | RdevKey::RightArrow => {
            ControlKey::Arrow
        }
        RdevKey::Home => ControlKey::Home,
        RdevKey::End => ControlKey::End,
        RdevKey::PageUp => ControlKey::PageUp,
        RdevKey::PageDown => ControlKey::PageDown,
        RdevKey::F1
        | RdevKey::F2
        | RdevKey::F3
        | RdevKey::F4
        | RdevKey::F5
        | RdevKey::F6
        | RdevKey::F7
        | RdevKey::F8
        | RdevKey::F9
        | RdevKey::F10
        | RdevKey::F11
        | RdevKey::F12 => ControlKey::Function,
        _ => match printable_char(name) {
            Some(c) => return Some(KeyInput::Char(c)),
            None => ControlKey::Other,
        },
    };
    Some(KeyInput::Control(control))
}

/// The character a key press produced, as reported by the platform layout.
/// Chords such as Ctrl+V report control characters, which are not text.
fn printable_char(name: Option<&str>) -> Option<char> {
    let mut chars = name?.chars();
    let c = chars.next()?;
    if chars.next().is_some() || c.is_control() {
        return None;
    }
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_keys_use_the_layout_name() {
        assert_eq!(
            key_to_input(RdevKey::Slash, Some("/")),
            Some(KeyInput::Char('/'))
        );
        assert_eq!(
            key_to_input(RdevKey::Num4, Some("$")),
            Some(KeyInput::Char('$'))
        );
        assert_eq!(
            key_to_input(RdevKey::KeyE, Some("é")),
            Some(KeyInput::Char('é'))
        );
    }

    #[test]
    fn shift_does_not_break_the_run() {
        assert_eq!(key_to_input(RdevKey::ShiftLeft, None), None);
        assert_eq!(key_to_input(RdevKey::CapsLock, None), None);
    }

    #[test]
    fn shortcuts_and_navigation_are_control_keys() {
        assert_eq!(
            key_to_input(RdevKey::ControlLeft, None),
            Some(KeyInput::Control(ControlKey::Modifier))
        );
        assert_eq!(
            key_to_input(RdevKey::KeyV, Some("\u{16}")),
            Some(KeyInput::Control(ControlKey::Other))
        );
        assert_eq!(
            key_to_input(RdevKey::LeftArrow, None),
            Some(KeyInput::Control(ControlKey::Arrow))
        );
        assert_eq!(
            key_to_input(RdevKey::Backspace, Some("\u{8}")),
            Some(KeyInput::Control(ControlKey::Backspace))
        );
    }

    #[test]
    fn space_is_text() {
        assert_eq!(key_to_input(RdevKey::Space, Some(" ")), Some(KeyInput::Char(' ')));
    }

    #[test]
    fn clicks_end_the_run_and_releases_are_ignored() {
        let click = Event {
            time: std::time::SystemTime::now(),
            name: None,
            event_type: EventType::ButtonPress(rdev::Button::Left),
        };
        assert_eq!(event_to_input(&click), Some(KeyInput::FocusChange));

        let release = Event {
            time: std::time::SystemTime::now(),
            name: None,
            event_type: EventType::KeyRelease(RdevKey::KeyA),
        };
        assert_eq!(event_to_input(&release), None);
    }
}
