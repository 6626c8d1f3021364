use crate::guard::InjectionGuard;
use crate::keymap::event_to_input;
use crate::session::InputSender;
use crossbeam_channel::{bounded, RecvTimeoutError};
use expando_core::{ExpandoError, Result};
use parking_lot::Mutex;
use rdev::{Event, EventType};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// How long `rdev::listen` gets to report a failure before the hook counts
/// as installed. On success it never returns.
const INSTALL_GRACE: Duration = Duration::from_millis(250);

/// A source of system-wide key events.
pub trait KeyHook: Send {
    /// Start delivering events to `sender`.
    fn install(&mut self, sender: InputSender) -> Result<()>;

    /// Stop delivering events. Nothing reaches the last sender afterwards.
    fn uninstall(&mut self);
}

impl<H: KeyHook + ?Sized> KeyHook for Box<H> {
    fn install(&mut self, sender: InputSender) -> Result<()> {
        (**self).install(sender)
    }

    fn uninstall(&mut self) {
        (**self).uninstall()
    }
}

/// Global hook backed by `rdev::listen`.
///
/// The OS hook cannot be removed once `listen` is running, so the listener
/// thread is started once and lives for the process. Uninstalling detaches
/// the sender; a later install attaches a new one to the same thread.
pub struct RdevHook {
    guard: Arc<InjectionGuard>,
    target: Arc<Mutex<Option<InputSender>>>,
    listener: Option<JoinHandle<()>>,
}

impl RdevHook {
    pub fn new(guard: Arc<InjectionGuard>) -> Self {
        Self {
            guard,
            target: Arc::new(Mutex::new(None)),
            listener: None,
        }
    }

    fn listener_alive(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn spawn_listener(&mut self) -> Result<()> {
        let (status_tx, status_rx) = bounded::<String>(1);
        let target = Arc::clone(&self.target);
        let guard = Arc::clone(&self.guard);

        let handle = thread::Builder::new()
            .name("expando-hook".to_string())
            .spawn(move || {
                let callback = move |event: Event| forward(&event, &target, &guard);
                match rdev::listen(callback) {
                    Ok(()) => {
                        let _ = status_tx.send("listener returned unexpectedly".to_string());
                    }
                    Err(err) => {
                        let _ = status_tx.send(format!("{:?}", err));
                    }
                }
            })?;

        match status_rx.recv_timeout(INSTALL_GRACE) {
            Err(RecvTimeoutError::Timeout) => {
                info!("Keyboard hook installed");
                self.listener = Some(handle);
                Ok(())
            }
            Ok(reason) => {
                let _ = handle.join();
                Err(ExpandoError::HookInstallFailure(reason))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(ExpandoError::HookInstallFailure(
                    "listener thread exited".to_string(),
                ))
            }
        }
    }
}

impl KeyHook for RdevHook {
    fn install(&mut self, sender: InputSender) -> Result<()> {
        *self.target.lock() = Some(sender);
        if self.listener_alive() {
            debug!("Reattaching to running keyboard hook");
            return Ok(());
        }

        self.spawn_listener().inspect_err(|err| {
            error!(%err, "Could not install keyboard hook");
            self.target.lock().take();
        })
    }

    fn uninstall(&mut self) {
        if self.target.lock().take().is_some() {
            debug!("Keyboard hook detached");
        }
    }
}

/// Runs on the hook thread for every raw event.
fn forward(event: &Event, target: &Mutex<Option<InputSender>>, guard: &InjectionGuard) {
    if guard.is_active() {
        // Our own synthetic keys echo back here. Real keys typed in this
        // window are dropped with them. A click means the user moved the
        // caret under the injection.
        if matches!(event.event_type, EventType::ButtonPress(_)) {
            guard.interrupt();
        }
        return;
    }

    let Some(input) = event_to_input(event) else {
        return;
    };
    if let Some(sender) = target.lock().as_ref() {
        sender.send(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;
    use crossbeam_channel::unbounded;
    use expando_core::KeyInput;
    use rdev::{Button, Key};
    use std::time::SystemTime;

    fn event(event_type: EventType, name: Option<&str>) -> Event {
        Event {
            time: SystemTime::now(),
            name: name.map(str::to_string),
            event_type,
        }
    }

    #[test]
    fn keys_during_injection_are_dropped_and_clicks_interrupt() {
        let guard = InjectionGuard::new();
        let (tx, rx) = unbounded();
        let target = Mutex::new(Some(InputSender::new(tx)));
        let key_a = event(EventType::KeyPress(Key::KeyA), Some("a"));

        let scope = guard.begin();
        forward(&key_a, &target, &guard);
        assert!(rx.try_recv().is_err());
        assert!(!guard.was_interrupted());

        forward(&event(EventType::ButtonPress(Button::Left), None), &target, &guard);
        assert!(guard.was_interrupted());
        assert!(rx.try_recv().is_err());
        drop(scope);

        forward(&key_a, &target, &guard);
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::Input(KeyInput::Char('a')))
        ));
    }
}
