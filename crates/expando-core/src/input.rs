use crate::config::Terminator;

/// Non-text keys the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Backspace,
    Enter,
    Tab,
    Escape,
    Delete,
    Arrow,
    Home,
    End,
    PageUp,
    PageDown,
    Function,
    /// Ctrl, Alt or Meta pressed, usually the start of a shortcut.
    Modifier,
    Other,
}

/// One key event as seen by the trigger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Control(ControlKey),
    FocusChange,
}

impl KeyInput {
    /// The terminator this event represents, if any.
    pub fn terminator(&self) -> Option<Terminator> {
        match self {
            KeyInput::Char(' ') => Some(Terminator::Space),
            KeyInput::Control(ControlKey::Tab) => Some(Terminator::Tab),
            KeyInput::Control(ControlKey::Enter) => Some(Terminator::Enter),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators_map_from_inputs() {
        assert_eq!(KeyInput::Char(' ').terminator(), Some(Terminator::Space));
        assert_eq!(
            KeyInput::Control(ControlKey::Enter).terminator(),
            Some(Terminator::Enter)
        );
        assert_eq!(KeyInput::Char('x').terminator(), None);
        assert_eq!(KeyInput::FocusChange.terminator(), None);
    }
}
