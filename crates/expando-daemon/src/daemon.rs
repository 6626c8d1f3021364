use crate::guard::InjectionGuard;
use crate::hook::RdevHook;
use crate::injector::build_replacer;
use crate::session::EngineSession;
use crate::window::PlatformResolver;
use expando_core::{load_library, ActiveWindow, Result, TriggerEngine, WindowResolver};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_millis(100);
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Notices edits to the data file made by other processes.
pub struct DataWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl DataWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    /// True once per modification.
    pub fn changed(&mut self) -> bool {
        let current = modified(&self.path);
        match (self.last_modified, current) {
            (Some(last), Some(now)) if now <= last => false,
            (_, None) => false,
            (_, now) => {
                self.last_modified = now;
                true
            }
        }
    }
}

/// Notices the foreground window changing when no key or click reached the
/// hook, e.g. an app switch by gesture or a dialog taking focus.
#[derive(Debug, Default)]
pub struct FocusTracker {
    last: Option<ActiveWindow>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `current` differs from the last window seen. A failed
    /// lookup (`None`) keeps the last window and reports no change.
    pub fn observe(&mut self, current: Option<ActiveWindow>) -> bool {
        let Some(current) = current else {
            return false;
        };
        match self.last.replace(current) {
            Some(previous) => self.last.as_ref() != Some(&previous),
            None => false,
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Run expansion in the foreground until `shutdown` is set, reloading
/// whenever the data file changes on disk. The replacement method is fixed
/// at startup.
pub fn run_daemon(path: &Path, shutdown: Arc<AtomicBool>) -> Result<()> {
    let library = load_library(path)?;
    let guard = Arc::new(InjectionGuard::new());
    let replacer = build_replacer(&library.settings.replacement, Arc::clone(&guard));
    let engine = TriggerEngine::from_library(PlatformResolver::new(), replacer, &library);

    let mut session = EngineSession::new(RdevHook::new(guard), engine);
    session.start()?;
    info!(path = %path.display(), "Watching for expansions");

    let resolver = PlatformResolver::new();
    let mut focus = FocusTracker::new();
    focus.observe(resolver.active_window().ok());

    let mut watcher = DataWatcher::new(path);
    let mut last_check = Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(TICK);
        if focus.observe(resolver.active_window().ok()) {
            debug!("Foreground window changed");
            session.notify_focus_change();
        }
        if last_check.elapsed() < CHECK_INTERVAL {
            continue;
        }
        last_check = Instant::now();

        if watcher.changed() {
            match load_library(path) {
                Ok(library) => {
                    info!("Data file changed, reloading");
                    session.reload(&library)?;
                }
                Err(err) => warn!(%err, "Could not reload data file, keeping current expansions"),
            }
        }
    }

    session.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn watcher_reports_each_modification_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expando.json");
        fs::write(&path, "{}").unwrap();

        let mut watcher = DataWatcher::new(&path);
        assert!(!watcher.changed());

        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
        assert!(watcher.changed());
        assert!(!watcher.changed());
    }

    #[test]
    fn focus_tracker_reports_window_switches() {
        let mut focus = FocusTracker::new();
        let editor = ActiveWindow::new("code", "main.rs");
        let browser = ActiveWindow::new("firefox", "Docs");

        assert!(!focus.observe(Some(editor.clone())));
        assert!(!focus.observe(Some(editor.clone())));
        assert!(focus.observe(Some(browser.clone())));
        // Same process, different window.
        assert!(focus.observe(Some(ActiveWindow::new("firefox", "Mail"))));
        assert!(!focus.observe(None));
        assert!(focus.observe(Some(editor)));
    }

    #[test]
    fn watcher_picks_up_a_file_created_later() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expando.json");

        let mut watcher = DataWatcher::new(&path);
        assert!(!watcher.changed());
        fs::write(&path, "{}").unwrap();
        assert!(watcher.changed());
    }
}
