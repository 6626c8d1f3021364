//! Platform side of expando: the global keyboard hook, synthetic text
//! injection, active-window lookup and the session that ties them to a
//! [`expando_core::TriggerEngine`].

pub mod clipboard;
pub mod daemon;
pub mod guard;
pub mod hook;
pub mod injector;
pub mod keymap;
pub mod session;
pub mod window;

pub use daemon::{run_daemon, DataWatcher, FocusTracker};
pub use guard::{InjectionGuard, InjectionScope};
pub use hook::{KeyHook, RdevHook};
pub use injector::{build_replacer, EnigoReplacer, GuardedReplacer};
pub use session::{EngineSession, InputSender, SessionEvent};
pub use window::PlatformResolver;
