use crate::error::{ExpandoError, Result};
use std::thread;
use std::time::Duration;

/// Low-level synthetic key emission.
pub trait KeySink {
    /// Emit one backward deletion.
    fn backspace(&mut self) -> Result<()>;

    /// Emit one character. Newlines and tabs are sent as their keys.
    fn insert(&mut self, c: char) -> Result<()>;

    /// Set when something outside the emission (a click, a focus change)
    /// means the remaining events would land in the wrong place.
    fn interrupted(&self) -> bool {
        false
    }
}

/// Turns a fired match into text in the target application.
pub trait TextReplacer {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()>;
}

impl<T: TextReplacer + ?Sized> TextReplacer for Box<T> {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        (**self).replace(matched_length, body)
    }
}

/// Replaces text with discrete key events: `matched_length` backspaces, then
/// the body one character at a time, so the target keeps its own undo
/// history.
pub struct KeystrokeReplacer<S> {
    sink: S,
    key_delay: Duration,
}

impl<S: KeySink> KeystrokeReplacer<S> {
    pub fn new(sink: S, key_delay: Duration) -> Self {
        Self { sink, key_delay }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn ensure_not_interrupted(&self, emitted: usize, total: usize) -> Result<()> {
        if self.sink.interrupted() {
            return Err(ExpandoError::ReplacementInterrupted { emitted, total });
        }
        Ok(())
    }

    fn pause(&self) {
        if !self.key_delay.is_zero() {
            thread::sleep(self.key_delay);
        }
    }
}

impl<S: KeySink> TextReplacer for KeystrokeReplacer<S> {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        let total = matched_length + body.chars().count();
        let mut emitted = 0;

        for _ in 0..matched_length {
            self.ensure_not_interrupted(emitted, total)?;
            self.sink.backspace()?;
            emitted += 1;
            self.pause();
        }

        for c in body.chars() {
            self.ensure_not_interrupted(emitted, total)?;
            self.sink.insert(c)?;
            emitted += 1;
            self.pause();
        }

        Ok(())
    }
}
