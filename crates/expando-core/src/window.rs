use crate::error::Result;
use tracing::warn;

/// Identity of the foreground application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindow {
    pub process_name: String,
    pub window_title: String,
}

impl ActiveWindow {
    pub fn new(process_name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into().to_lowercase(),
            window_title: window_title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowContext {
    Known(ActiveWindow),
    /// The platform could not tell which application has focus.
    Unknown,
}

/// Platform query for the window currently receiving keyboard input.
pub trait WindowResolver {
    fn active_window(&self) -> Result<ActiveWindow>;

    /// Fresh context for a firing decision; failures become `Unknown`.
    fn current_context(&self) -> WindowContext {
        match self.active_window() {
            Ok(window) => WindowContext::Known(window),
            Err(err) => {
                warn!("Could not resolve active window: {}", err);
                WindowContext::Unknown
            }
        }
    }
}

impl<R: WindowResolver + ?Sized> WindowResolver for Box<R> {
    fn active_window(&self) -> Result<ActiveWindow> {
        (**self).active_window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpandoError;

    struct Failing;

    impl WindowResolver for Failing {
        fn active_window(&self) -> Result<ActiveWindow> {
            Err(ExpandoError::ResolverUnavailable("no display".to_string()))
        }
    }

    #[test]
    fn failures_resolve_to_unknown() {
        assert_eq!(Failing.current_context(), WindowContext::Unknown);
    }

    #[test]
    fn process_names_are_lowercased() {
        let window = ActiveWindow::new("Notepad.EXE", "Untitled - Notepad");
        assert_eq!(window.process_name, "notepad.exe");
        assert_eq!(window.window_title, "Untitled - Notepad");
    }
}
