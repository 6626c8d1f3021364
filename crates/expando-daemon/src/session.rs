use crate::hook::KeyHook;
use crossbeam_channel::{after, bounded, never, select, Receiver, Sender, TrySendError};
use expando_core::{
    ExpandoError, FireOutcome, KeyInput, Library, Result, Step, TextReplacer, TriggerEngine,
    WindowResolver,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const EVENT_QUEUE: usize = 1024;

pub enum SessionEvent {
    Input(KeyInput),
    Reload(Box<Library>),
    Shutdown,
}

/// Hands key input to a running session. Never blocks: the hook callback
/// runs inside the OS input path.
#[derive(Clone)]
pub struct InputSender(Sender<SessionEvent>);

impl InputSender {
    pub(crate) fn new(sender: Sender<SessionEvent>) -> Self {
        Self(sender)
    }

    /// Returns `false` once the session is gone or its queue is full.
    pub fn send(&self, input: KeyInput) -> bool {
        match self.0.try_send(SessionEvent::Input(input)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Engine queue full, dropping key input");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

struct Running<R, T> {
    sender: Sender<SessionEvent>,
    stopping: Arc<AtomicBool>,
    listener: JoinHandle<TriggerEngine<R, T>>,
}

/// Owns a trigger engine and runs it against a key hook.
///
/// While running, the engine lives on a dedicated listener thread that
/// receives key input and pending-match deadlines. Stopping hands it back.
pub struct EngineSession<H, R, T>
where
    H: KeyHook,
    R: WindowResolver + Send + 'static,
    T: TextReplacer + Send + 'static,
{
    hook: H,
    engine: Option<TriggerEngine<R, T>>,
    running: Option<Running<R, T>>,
}

impl<H, R, T> EngineSession<H, R, T>
where
    H: KeyHook,
    R: WindowResolver + Send + 'static,
    T: TextReplacer + Send + 'static,
{
    pub fn new(hook: H, engine: TriggerEngine<R, T>) -> Self {
        Self {
            hook,
            engine: Some(engine),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The engine, while the session is stopped.
    pub fn engine(&self) -> Option<&TriggerEngine<R, T>> {
        self.engine.as_ref()
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Install the hook and start the listener. Calling this on a running
    /// session does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            debug!("Session already running");
            return Ok(());
        }
        let mut engine = self.engine.take().ok_or_else(|| {
            ExpandoError::Other("engine was lost by an earlier failure".to_string())
        })?;
        engine.reset();

        let (sender, receiver) = bounded(EVENT_QUEUE);
        if let Err(err) = self.hook.install(InputSender::new(sender.clone())) {
            self.engine = Some(engine);
            return Err(err);
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopping);
        let spawned = thread::Builder::new()
            .name("expando-engine".to_string())
            .spawn(move || run_listener(engine, receiver, flag));

        match spawned {
            Ok(listener) => {
                self.running = Some(Running {
                    sender,
                    stopping,
                    listener,
                });
                info!("Expansion session started");
                Ok(())
            }
            Err(err) => {
                self.hook.uninstall();
                Err(err.into())
            }
        }
    }

    /// Remove the hook and wait for the listener to finish. No replacement
    /// starts after this returns. Calling this on a stopped session does
    /// nothing.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.hook.uninstall();
        running.stopping.store(true, Ordering::SeqCst);
        // Fails only if the listener already exited.
        let _ = running.sender.send(SessionEvent::Shutdown);

        match running.listener.join() {
            Ok(mut engine) => {
                engine.reset();
                self.engine = Some(engine);
                info!("Expansion session stopped");
            }
            Err(_) => error!("Engine thread panicked, session cannot restart"),
        }
    }

    /// Swap in new expansions and settings. A pending match is dropped.
    pub fn reload(&mut self, library: &Library) -> Result<()> {
        if let Some(running) = &self.running {
            return running
                .sender
                .send(SessionEvent::Reload(Box::new(library.clone())))
                .map_err(|_| ExpandoError::Other("engine thread has exited".to_string()));
        }
        if let Some(engine) = self.engine.as_mut() {
            for err in engine.load(library) {
                warn!(%err, "Skipped expansion");
            }
        }
        Ok(())
    }

    /// Report a focus change detected outside the hook.
    pub fn notify_focus_change(&self) {
        if let Some(sender) = self.input_sender() {
            sender.send(KeyInput::FocusChange);
        }
    }

    pub fn input_sender(&self) -> Option<InputSender> {
        self.running
            .as_ref()
            .map(|running| InputSender::new(running.sender.clone()))
    }
}

impl<H, R, T> Drop for EngineSession<H, R, T>
where
    H: KeyHook,
    R: WindowResolver + Send + 'static,
    T: TextReplacer + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deadline for the match the engine is waiting on, if any.
fn deadline_for(step: &Step) -> Option<(u64, Instant)> {
    match step {
        Step::Pending { generation, delay } => Some((*generation, Instant::now() + *delay)),
        Step::Idle | Step::Fired(_) => None,
    }
}

fn log_step(step: &Step) {
    if let Step::Fired(outcome) = step {
        match outcome {
            FireOutcome::Replaced(id) => debug!(%id, "Expansion replaced"),
            FireOutcome::Denied(id) => debug!(%id, "Expansion denied in this window"),
            FireOutcome::Interrupted(id) => info!(%id, "Expansion interrupted"),
            FireOutcome::Failed(id) => warn!(%id, "Expansion failed"),
        }
    }
}

/// Run one engine call. A panic resets the engine instead of killing the
/// listener, and yields `None`.
fn contained<R, T, F, O>(engine: &mut TriggerEngine<R, T>, call: F) -> Option<O>
where
    R: WindowResolver,
    T: TextReplacer,
    F: FnOnce(&mut TriggerEngine<R, T>) -> O,
{
    match panic::catch_unwind(AssertUnwindSafe(|| call(engine))) {
        Ok(output) => Some(output),
        Err(_) => {
            error!("Engine panicked, resetting");
            engine.reset();
            None
        }
    }
}

fn guarded<R, T, F>(engine: &mut TriggerEngine<R, T>, call: F) -> Step
where
    R: WindowResolver,
    T: TextReplacer,
    F: FnOnce(&mut TriggerEngine<R, T>) -> Step,
{
    let step = contained(engine, call).unwrap_or(Step::Idle);
    log_step(&step);
    step
}

fn run_listener<R, T>(
    mut engine: TriggerEngine<R, T>,
    events: Receiver<SessionEvent>,
    stopping: Arc<AtomicBool>,
) -> TriggerEngine<R, T>
where
    R: WindowResolver,
    T: TextReplacer,
{
    let mut pending: Option<(u64, Instant)> = None;

    loop {
        let timer = match pending {
            Some((_, deadline)) => after(deadline.saturating_duration_since(Instant::now())),
            None => never(),
        };

        select! {
            recv(events) -> event => match event {
                Ok(SessionEvent::Input(input)) => {
                    if stopping.load(Ordering::SeqCst) {
                        break;
                    }
                    let step = guarded(&mut engine, |engine| engine.handle(input));
                    pending = deadline_for(&step);
                }
                Ok(SessionEvent::Reload(library)) => {
                    pending = None;
                    let skipped = contained(&mut engine, |engine| engine.load(&library));
                    for err in skipped.unwrap_or_default() {
                        warn!(%err, "Skipped expansion");
                    }
                }
                Ok(SessionEvent::Shutdown) | Err(_) => break,
            },
            recv(timer) -> _ => {
                let Some((generation, _)) = pending.take() else {
                    continue;
                };
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                let step = guarded(&mut engine, |engine| engine.on_timer(generation));
                pending = deadline_for(&step);
            }
        }
    }

    debug!("Engine listener exiting");
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use expando_core::{ActiveWindow, Settings};

    struct AnyWindow;

    impl WindowResolver for AnyWindow {
        fn active_window(&self) -> Result<ActiveWindow> {
            Ok(ActiveWindow::new("gedit", "notes.txt"))
        }
    }

    struct NoOutput;

    impl TextReplacer for NoOutput {
        fn replace(&mut self, _matched_length: usize, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    fn engine() -> TriggerEngine<AnyWindow, NoOutput> {
        TriggerEngine::new(AnyWindow, NoOutput, &Settings::default())
    }

    #[test]
    fn panic_during_reload_resets_the_engine() {
        let mut engine = engine();
        for c in "/si".chars() {
            engine.handle(KeyInput::Char(c));
        }
        assert_eq!(engine.buffer_snapshot(), "/si");

        let skipped: Option<Vec<ExpandoError>> =
            contained(&mut engine, |_| panic!("index rebuild failed"));

        assert!(skipped.is_none());
        assert_eq!(engine.buffer_snapshot(), "");
        assert_eq!(*engine.state(), expando_core::EngineState::Idle);
    }

    #[test]
    fn panicking_handler_yields_idle_step() {
        let mut engine = engine();
        let step = guarded(&mut engine, |_| panic!("matcher failed"));
        assert!(matches!(step, Step::Idle));

        // The engine keeps working afterwards.
        assert!(matches!(guarded(&mut engine, |e| e.handle(KeyInput::Char('a'))), Step::Idle));
        assert_eq!(engine.buffer_snapshot(), "a");
    }
}
