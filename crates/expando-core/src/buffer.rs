use crate::input::ControlKey;
use std::collections::VecDeque;

/// Rolling record of the characters typed since the last reset.
#[derive(Debug, Clone)]
pub struct KeystrokeBuffer {
    chars: VecDeque<char>,
    capacity: usize,
}

impl KeystrokeBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            chars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn on_char(&mut self, c: char) {
        self.chars.push_back(c);
        while self.chars.len() > self.capacity {
            self.chars.pop_front();
        }
    }

    /// Backspace drops the last character; every other control key breaks
    /// the run of typed text.
    pub fn on_control_key(&mut self, kind: ControlKey) {
        match kind {
            ControlKey::Backspace => {
                self.chars.pop_back();
            }
            _ => self.clear(),
        }
    }

    pub fn on_focus_change(&mut self) {
        self.clear();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn snapshot(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, dropping the oldest characters if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.chars.len() > self.capacity {
            self.chars.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(buffer: &mut KeystrokeBuffer, text: &str) {
        text.chars().for_each(|c| buffer.on_char(c));
    }

    #[test]
    fn evicts_from_the_head() {
        let mut buffer = KeystrokeBuffer::new(4);
        typed(&mut buffer, "abcdef");
        assert_eq!(buffer.snapshot(), "cdef");
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn backspace_removes_last_character() {
        let mut buffer = KeystrokeBuffer::new(16);
        typed(&mut buffer, "/inx");
        buffer.on_control_key(ControlKey::Backspace);
        assert_eq!(buffer.snapshot(), "/in");

        buffer.clear();
        buffer.on_control_key(ControlKey::Backspace);
        assert!(buffer.is_empty());
    }

    #[test]
    fn navigation_and_focus_clear_everything() {
        let mut buffer = KeystrokeBuffer::new(16);
        typed(&mut buffer, "/in");
        buffer.on_control_key(ControlKey::Arrow);
        assert!(buffer.is_empty());

        typed(&mut buffer, "/in");
        buffer.on_focus_change();
        assert!(buffer.is_empty());
    }

    #[test]
    fn shrinking_capacity_keeps_the_tail() {
        let mut buffer = KeystrokeBuffer::new(8);
        typed(&mut buffer, "12345678");
        buffer.set_capacity(3);
        assert_eq!(buffer.snapshot(), "678");
    }
}
