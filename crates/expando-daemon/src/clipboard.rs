use crate::guard::InjectionGuard;
use crate::injector::{create_keyboard_controller, tap};
use arboard::{Clipboard, ImageData};
use enigo::{Direction, Enigo, Key, Keyboard};
use expando_core::{ExpandoError, Result, TextReplacer};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

/// Minimum time the pasted body stays on the clipboard. The target reads it
/// asynchronously after the chord.
const MIN_PASTE_SETTLE: Duration = Duration::from_millis(50);

fn clipboard_error(err: arboard::Error) -> ExpandoError {
    ExpandoError::Clipboard(err.to_string())
}

/// The clipboard operations a paste needs.
pub trait ClipboardAccess {
    fn get_text(&mut self) -> Result<String>;
    fn set_text(&mut self, text: &str) -> Result<()>;
    fn get_image(&mut self) -> Result<ImageData<'static>>;
    fn set_image(&mut self, image: ImageData<'static>) -> Result<()>;
}

/// The OS clipboard through arboard.
pub struct SystemClipboard(Clipboard);

impl SystemClipboard {
    pub fn open() -> Result<Self> {
        Clipboard::new().map(Self).map_err(clipboard_error)
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&mut self) -> Result<String> {
        self.0.get_text().map_err(clipboard_error)
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.0.set_text(text).map_err(clipboard_error)
    }

    fn get_image(&mut self) -> Result<ImageData<'static>> {
        self.0.get_image().map_err(clipboard_error)
    }

    fn set_image(&mut self, image: ImageData<'static>) -> Result<()> {
        self.0.set_image(image).map_err(clipboard_error)
    }
}

/// What the clipboard held before a paste.
pub enum SavedClipboard {
    Text(String),
    Image(ImageData<'static>),
    /// Empty, or holding a format that cannot be read back.
    Nothing,
}

impl SavedClipboard {
    pub fn capture<C: ClipboardAccess>(clipboard: &mut C) -> Self {
        if let Ok(text) = clipboard.get_text() {
            return Self::Text(text);
        }
        match clipboard.get_image() {
            Ok(image) => Self::Image(image),
            Err(err) => {
                debug!(%err, "Clipboard holds neither text nor an image");
                Self::Nothing
            }
        }
    }

    /// Put the saved contents back. `Nothing` leaves the clipboard as it is.
    pub fn restore<C: ClipboardAccess>(self, clipboard: &mut C) -> Result<()> {
        match self {
            Self::Text(text) => clipboard.set_text(&text),
            Self::Image(image) => clipboard.set_image(image),
            Self::Nothing => {
                debug!("No readable clipboard contents to restore");
                Ok(())
            }
        }
    }
}

/// Put `body` on the clipboard, run `paste`, wait `settle`, then restore
/// what was there before. A failed restore is logged, not returned.
pub fn paste_through<C, F>(clipboard: &mut C, body: &str, settle: Duration, paste: F) -> Result<()>
where
    C: ClipboardAccess,
    F: FnOnce() -> Result<()>,
{
    let saved = SavedClipboard::capture(clipboard);
    clipboard.set_text(body)?;
    let result = paste();

    thread::sleep(settle.max(MIN_PASTE_SETTLE));
    if let Err(err) = saved.restore(clipboard) {
        warn!(%err, "Could not restore clipboard");
    }
    result
}

/// Deletes the prefix with backspaces, then pastes the whole body in one
/// step. Faster than keystrokes for long bodies and immune to keyboard
/// layout quirks. Text or image contents of the clipboard are put back
/// afterwards.
pub struct ClipboardReplacer {
    guard: Arc<InjectionGuard>,
    key_delay: Duration,
    settle: Duration,
}

impl ClipboardReplacer {
    pub fn new(guard: Arc<InjectionGuard>, key_delay: Duration, settle: Duration) -> Self {
        Self {
            guard,
            key_delay,
            settle,
        }
    }

    fn delete(&self, keyboard: &mut Enigo, count: usize) -> Result<()> {
        for emitted in 0..count {
            if self.guard.was_interrupted() {
                return Err(ExpandoError::ReplacementInterrupted {
                    emitted,
                    total: count + 1,
                });
            }
            tap(keyboard, Key::Backspace)?;
            if !self.key_delay.is_zero() {
                thread::sleep(self.key_delay);
            }
        }
        Ok(())
    }
}

fn paste_chord(keyboard: &mut Enigo) -> Result<()> {
    let chord = |keyboard: &mut Enigo| -> enigo::InputResult<()> {
        keyboard.key(PASTE_MODIFIER, Direction::Press)?;
        let clicked = keyboard.key(Key::Unicode('v'), Direction::Click);
        keyboard.key(PASTE_MODIFIER, Direction::Release)?;
        clicked
    };
    chord(keyboard).map_err(|err| ExpandoError::Injection(format!("Failed to paste: {}", err)))
}

impl TextReplacer for ClipboardReplacer {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        let mut clipboard = SystemClipboard::open()?;
        let mut keyboard = create_keyboard_controller()?;
        self.delete(&mut keyboard, matched_length)?;
        if self.guard.was_interrupted() {
            return Err(ExpandoError::ReplacementInterrupted {
                emitted: matched_length,
                total: matched_length + 1,
            });
        }

        paste_through(&mut clipboard, body, self.settle, || {
            paste_chord(&mut keyboard)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Default)]
    struct FakeClipboard {
        text: Option<String>,
        image: Option<(usize, usize, Vec<u8>)>,
        writes: usize,
    }

    impl ClipboardAccess for FakeClipboard {
        fn get_text(&mut self) -> Result<String> {
            self.text
                .clone()
                .ok_or_else(|| ExpandoError::Clipboard("no text".to_string()))
        }

        fn set_text(&mut self, text: &str) -> Result<()> {
            self.writes += 1;
            self.image = None;
            self.text = Some(text.to_string());
            Ok(())
        }

        fn get_image(&mut self) -> Result<ImageData<'static>> {
            let (width, height, bytes) = self
                .image
                .clone()
                .ok_or_else(|| ExpandoError::Clipboard("no image".to_string()))?;
            Ok(ImageData {
                width,
                height,
                bytes: Cow::Owned(bytes),
            })
        }

        fn set_image(&mut self, image: ImageData<'static>) -> Result<()> {
            self.writes += 1;
            self.text = None;
            self.image = Some((image.width, image.height, image.bytes.into_owned()));
            Ok(())
        }
    }

    #[test]
    fn text_is_restored_after_paste() {
        let mut clipboard = FakeClipboard {
            text: Some("copied earlier".to_string()),
            ..Default::default()
        };
        let mut seen = None;

        paste_through(&mut clipboard, "Best regards", Duration::ZERO, || {
            seen = Some("pasted");
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, Some("pasted"));
        assert_eq!(clipboard.text.as_deref(), Some("copied earlier"));
    }

    #[test]
    fn image_is_restored_after_paste() {
        let pixels = vec![255u8; 2 * 2 * 4];
        let mut clipboard = FakeClipboard {
            image: Some((2, 2, pixels.clone())),
            ..Default::default()
        };

        paste_through(&mut clipboard, "Best regards", Duration::ZERO, || Ok(())).unwrap();

        assert_eq!(clipboard.text, None);
        assert_eq!(clipboard.image, Some((2, 2, pixels)));
    }

    #[test]
    fn unreadable_clipboard_is_not_cleared() {
        let mut clipboard = FakeClipboard::default();

        paste_through(&mut clipboard, "Best regards", Duration::ZERO, || Ok(())).unwrap();

        // Only the body was written; nothing was cleared or overwritten after.
        assert_eq!(clipboard.writes, 1);
        assert_eq!(clipboard.text.as_deref(), Some("Best regards"));
    }

    #[test]
    fn paste_failure_still_restores() {
        let mut clipboard = FakeClipboard {
            text: Some("keep me".to_string()),
            ..Default::default()
        };

        let err = paste_through(&mut clipboard, "body", Duration::ZERO, || {
            Err(ExpandoError::Injection("no display".to_string()))
        })
        .unwrap_err();

        assert!(matches!(err, ExpandoError::Injection(_)));
        assert_eq!(clipboard.text.as_deref(), Some("keep me"));
    }
}
