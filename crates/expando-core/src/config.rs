use crate::error::Result;
use crate::whitelist::WhitelistPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_FILENAME: &str = "expando.json";
pub const HOME_OVERRIDE_VAR: &str = "EXPANDO_HOME";
pub const MIN_BUFFER_CAPACITY: usize = 32;

/// Get the expando configuration directory
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var(HOME_OVERRIDE_VAR) {
        return PathBuf::from(dir);
    }
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".expando"))
        .unwrap_or_else(|_| PathBuf::from(".expando"))
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

/// Get the path to the data file
pub fn data_file_path() -> PathBuf {
    get_config_dir().join(DATA_FILENAME)
}

/// Keys that can confirm a match when a terminator is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    Space,
    Tab,
    Enter,
}

impl Terminator {
    /// The character the terminator leaves behind in the target application.
    pub fn as_char(self) -> char {
        match self {
            Terminator::Space => ' ',
            Terminator::Tab => '\t',
            Terminator::Enter => '\n',
        }
    }
}

/// When a completed prefix is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "keys", rename_all = "snake_case")]
pub enum TerminatorPolicy {
    /// Evaluate on the character that completes the prefix.
    #[default]
    None,
    /// Evaluate only when one of these keys follows the prefix.
    Keys(Vec<Terminator>),
}

impl TerminatorPolicy {
    pub fn accepts(&self, terminator: Terminator) -> bool {
        match self {
            TerminatorPolicy::None => false,
            TerminatorPolicy::Keys(keys) => keys.contains(&terminator),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, TerminatorPolicy::Keys(keys) if !keys.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    pub terminator: TerminatorPolicy,
    /// Wait applied to an immediate match that a longer prefix could still extend.
    pub ambiguity_delay_ms: u64,
    pub buffer_slack: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            terminator: TerminatorPolicy::None,
            ambiguity_delay_ms: 300,
            buffer_slack: 16,
        }
    }
}

impl TriggerSettings {
    pub fn ambiguity_delay(&self) -> Duration {
        Duration::from_millis(self.ambiguity_delay_ms)
    }

    /// Buffer capacity for a given longest registered prefix.
    pub fn buffer_capacity(&self, longest_prefix: usize) -> usize {
        (longest_prefix + self.buffer_slack).max(MIN_BUFFER_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementMethod {
    #[default]
    Keystrokes,
    Clipboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementSettings {
    pub method: ReplacementMethod,
    pub key_delay_ms: u64,
    pub settle_ms: u64,
}

impl Default for ReplacementSettings {
    fn default() -> Self {
        Self {
            method: ReplacementMethod::Keystrokes,
            key_delay_ms: 2,
            settle_ms: 30,
        }
    }
}

impl ReplacementSettings {
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Everything in the data file that is not expansion data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub whitelist: WhitelistPolicy,
    pub trigger: TriggerSettings,
    pub replacement: ReplacementSettings,
}
