//! Expando core: prefix matching, keystroke tracking and the trigger engine.
//!
//! Nothing in this crate touches the operating system. Key events come in as
//! [`KeyInput`], the active window is asked for through [`WindowResolver`] and
//! text goes out through [`TextReplacer`]; the daemon crate supplies the
//! platform implementations.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod input;
pub mod models;
pub mod replacer;
pub mod storage;
pub mod whitelist;
pub mod window;

// Re-export common items for convenience
pub use buffer::KeystrokeBuffer;
pub use config::{get_config_dir, ReplacementMethod, Settings, Terminator, TerminatorPolicy};
pub use engine::{ActiveMatch, EngineState, FireOutcome, Step, TriggerEngine};
pub use error::{ExpandoError, Result};
pub use index::TriggerIndex;
pub use input::{ControlKey, KeyInput};
pub use models::{Expansion, ExpansionId, Group, GroupId, Library, TriggerMode};
pub use replacer::{KeySink, KeystrokeReplacer, TextReplacer};
pub use storage::{load_library, save_library, Store};
pub use whitelist::{AppMatcher, MatchBy, WhitelistMode, WhitelistPolicy};
pub use window::{ActiveWindow, WindowContext, WindowResolver};
