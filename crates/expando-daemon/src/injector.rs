use crate::clipboard::ClipboardReplacer;
use crate::guard::InjectionGuard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings as EnigoSettings};
use expando_core::config::ReplacementSettings;
use expando_core::{
    ExpandoError, KeySink, KeystrokeReplacer, ReplacementMethod, Result, TextReplacer,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Create a keyboard controller
pub fn create_keyboard_controller() -> Result<Enigo> {
    Enigo::new(&EnigoSettings::default()).map_err(|err| {
        ExpandoError::Injection(format!("Failed to create keyboard controller: {}", err))
    })
}

pub fn tap(keyboard: &mut Enigo, key: Key) -> Result<()> {
    keyboard
        .key(key, Direction::Click)
        .map_err(|err| ExpandoError::Injection(format!("Failed to send {:?}: {}", key, err)))
}

/// Synthetic key events through enigo.
pub struct EnigoSink {
    keyboard: Enigo,
    guard: Arc<InjectionGuard>,
    scratch: [u8; 4],
}

impl EnigoSink {
    pub fn new(guard: Arc<InjectionGuard>) -> Result<Self> {
        Ok(Self {
            keyboard: create_keyboard_controller()?,
            guard,
            scratch: [0; 4],
        })
    }
}

impl KeySink for EnigoSink {
    fn backspace(&mut self) -> Result<()> {
        tap(&mut self.keyboard, Key::Backspace)
    }

    fn insert(&mut self, c: char) -> Result<()> {
        match c {
            '\n' => tap(&mut self.keyboard, Key::Return),
            '\t' => tap(&mut self.keyboard, Key::Tab),
            _ => {
                let text = c.encode_utf8(&mut self.scratch);
                self.keyboard.text(text).map_err(|err| {
                    ExpandoError::Injection(format!("Failed to type {:?}: {}", c, err))
                })
            }
        }
    }

    fn interrupted(&self) -> bool {
        self.guard.was_interrupted()
    }
}

/// Keystroke replacement on a fresh controller per firing. Enigo holds
/// platform handles that are not `Send`, so it never outlives a call.
pub struct EnigoReplacer {
    guard: Arc<InjectionGuard>,
    key_delay: Duration,
}

impl EnigoReplacer {
    pub fn new(guard: Arc<InjectionGuard>, key_delay: Duration) -> Self {
        Self { guard, key_delay }
    }
}

impl TextReplacer for EnigoReplacer {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        let sink = EnigoSink::new(Arc::clone(&self.guard))?;
        KeystrokeReplacer::new(sink, self.key_delay).replace(matched_length, body)
    }
}

/// Marks the injection window on the shared guard so the hook drops our
/// own events. The guard stays up for `settle` after the last event, since
/// the hook sees synthetic input with some lag.
pub struct GuardedReplacer<T> {
    inner: T,
    guard: Arc<InjectionGuard>,
    settle: Duration,
}

impl<T: TextReplacer> GuardedReplacer<T> {
    pub fn new(inner: T, guard: Arc<InjectionGuard>, settle: Duration) -> Self {
        Self {
            inner,
            guard,
            settle,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: TextReplacer> TextReplacer for GuardedReplacer<T> {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        let scope = self.guard.begin();
        let result = self.inner.replace(matched_length, body);
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        drop(scope);

        if let Err(ExpandoError::ReplacementInterrupted { emitted, total }) = &result {
            warn!(emitted, total, "Replacement interrupted by user input");
        }
        result
    }
}

/// The replacer the daemon fires through, chosen by the configured method.
pub fn build_replacer(
    settings: &ReplacementSettings,
    guard: Arc<InjectionGuard>,
) -> Box<dyn TextReplacer + Send> {
    debug!(method = ?settings.method, "Building text replacer");
    match settings.method {
        ReplacementMethod::Keystrokes => Box::new(GuardedReplacer::new(
            EnigoReplacer::new(Arc::clone(&guard), settings.key_delay()),
            guard,
            settings.settle(),
        )),
        ReplacementMethod::Clipboard => Box::new(GuardedReplacer::new(
            ClipboardReplacer::new(Arc::clone(&guard), settings.key_delay(), settings.settle()),
            guard,
            settings.settle(),
        )),
    }
}
