use crossbeam_channel::{unbounded, Receiver, Sender};
use expando_core::{
    ActiveWindow, Expansion, ExpandoError, Group, KeyInput, Library, Result, TextReplacer,
    TriggerEngine, TriggerMode, WindowResolver,
};
use expando_daemon::{EngineSession, InputSender, KeyHook};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(300);

/// Stands in for the OS hook: the test types through the attached sender.
#[derive(Clone, Default)]
struct FakeHook {
    slot: Arc<Mutex<Option<InputSender>>>,
    installs: Arc<AtomicUsize>,
    refuse: bool,
}

impl FakeHook {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    fn type_text(&self, text: &str) {
        let slot = self.slot.lock();
        let sender = slot.as_ref().expect("hook not installed");
        for c in text.chars() {
            assert!(sender.send(KeyInput::Char(c)));
        }
    }

    fn installed(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl KeyHook for FakeHook {
    fn install(&mut self, sender: InputSender) -> Result<()> {
        if self.refuse {
            return Err(ExpandoError::HookInstallFailure(
                "accessibility permission denied".to_string(),
            ));
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock() = Some(sender);
        Ok(())
    }

    fn uninstall(&mut self) {
        self.slot.lock().take();
    }
}

struct FixedWindow;

impl WindowResolver for FixedWindow {
    fn active_window(&self) -> Result<ActiveWindow> {
        Ok(ActiveWindow::new("gedit", "notes.txt"))
    }
}

struct ChannelReplacer(Sender<(usize, String)>);

impl TextReplacer for ChannelReplacer {
    fn replace(&mut self, matched_length: usize, body: &str) -> Result<()> {
        let _ = self.0.send((matched_length, body.to_string()));
        Ok(())
    }
}

type Session = EngineSession<FakeHook, FixedWindow, ChannelReplacer>;

fn library(expansions: &[(&str, &str, TriggerMode)]) -> Library {
    let mut group = Group::new("test");
    for (prefix, body, trigger) in expansions {
        group
            .expansions
            .push(Expansion::new(group.id, *prefix, *body).with_trigger(*trigger));
    }
    Library {
        groups: vec![group],
        ..Library::default()
    }
}

fn session_with(hook: FakeHook, library: &Library) -> (Session, Receiver<(usize, String)>) {
    let (tx, rx) = unbounded();
    let engine = TriggerEngine::from_library(FixedWindow, ChannelReplacer(tx), library);
    (EngineSession::new(hook, engine), rx)
}

#[test]
fn start_twice_installs_one_hook() {
    let hook = FakeHook::default();
    let (mut session, _rx) = session_with(hook.clone(), &Library::default());

    session.start().unwrap();
    session.start().unwrap();

    assert!(session.is_running());
    assert_eq!(hook.installs.load(Ordering::SeqCst), 1);
}

#[test]
fn immediate_expansion_fires_while_running() {
    let hook = FakeHook::default();
    let lib = library(&[("/info", "information", TriggerMode::Immediate)]);
    let (mut session, rx) = session_with(hook.clone(), &lib);

    session.start().unwrap();
    hook.type_text("see /info");

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (5, "information".to_string()));
    session.stop();
}

#[test]
fn delayed_expansion_waits_for_its_delay() {
    let hook = FakeHook::default();
    let lib = library(&[("/d", "delayed", TriggerMode::delayed(80))]);
    let (mut session, rx) = session_with(hook.clone(), &lib);

    session.start().unwrap();
    let typed = Instant::now();
    hook.type_text("/d");

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (2, "delayed".to_string()));
    assert!(typed.elapsed() >= Duration::from_millis(80));
    session.stop();
}

#[test]
fn stopping_with_a_pending_match_never_fires() {
    let hook = FakeHook::default();
    let lib = library(&[("/d", "delayed", TriggerMode::delayed(150))]);
    let (mut session, rx) = session_with(hook.clone(), &lib);

    session.start().unwrap();
    hook.type_text("/d");
    session.stop();

    assert!(!session.is_running());
    assert!(!hook.installed());
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn install_failure_leaves_the_session_stopped() {
    let (mut session, _rx) = session_with(FakeHook::refusing(), &Library::default());

    let err = session.start().unwrap_err();
    assert!(matches!(err, ExpandoError::HookInstallFailure(_)));
    assert!(!session.is_running());
    assert!(session.engine().is_some());
}

#[test]
fn restart_begins_with_an_empty_buffer() {
    let hook = FakeHook::default();
    let lib = library(&[("/info", "information", TriggerMode::Immediate)]);
    let (mut session, rx) = session_with(hook.clone(), &lib);

    session.start().unwrap();
    hook.type_text("/in");
    session.stop();
    assert_eq!(session.engine().unwrap().buffer_snapshot(), "");

    session.start().unwrap();
    hook.type_text("fo");
    assert!(rx.recv_timeout(QUIET).is_err());
    session.stop();
}

#[test]
fn reload_while_running_applies_new_expansions() {
    let hook = FakeHook::default();
    let (mut session, rx) = session_with(hook.clone(), &Library::default());

    session.start().unwrap();
    let lib = library(&[("/x", "expanded", TriggerMode::Immediate)]);
    session.reload(&lib).unwrap();
    hook.type_text("/x");

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (2, "expanded".to_string()));
    session.stop();
}

#[test]
fn focus_change_splits_a_prefix() {
    let hook = FakeHook::default();
    let lib = library(&[("/info", "information", TriggerMode::Immediate)]);
    let (mut session, rx) = session_with(hook.clone(), &lib);

    session.start().unwrap();
    hook.type_text("/in");
    session.notify_focus_change();
    hook.type_text("fo");

    assert!(rx.recv_timeout(QUIET).is_err());
    session.stop();
}

#[test]
fn dropping_a_running_session_detaches_the_hook() {
    let hook = FakeHook::default();
    let (mut session, _rx) = session_with(hook.clone(), &Library::default());

    session.start().unwrap();
    assert!(hook.installed());
    drop(session);
    assert!(!hook.installed());
}
