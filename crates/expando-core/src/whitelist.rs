use crate::window::{ActiveWindow, WindowContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistMode {
    /// Fire everywhere.
    #[default]
    Disabled,
    /// Fire only in matching applications.
    AllowList,
    /// Fire everywhere except matching applications.
    DenyList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBy {
    ProcessName,
    WindowTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppMatcher {
    pub by: MatchBy,
    pub pattern: String,
}

impl AppMatcher {
    pub fn process(pattern: impl Into<String>) -> Self {
        Self {
            by: MatchBy::ProcessName,
            pattern: pattern.into(),
        }
    }

    pub fn title(pattern: impl Into<String>) -> Self {
        Self {
            by: MatchBy::WindowTitle,
            pattern: pattern.into(),
        }
    }

    /// Case-insensitive. Process names match when either contains the other,
    /// so `notepad` matches `notepad.exe`; titles match on substring.
    pub fn matches(&self, window: &ActiveWindow) -> bool {
        let pattern = self.pattern.to_lowercase();
        if pattern.is_empty() {
            return false;
        }
        match self.by {
            MatchBy::ProcessName => {
                let process = window.process_name.to_lowercase();
                !process.is_empty() && (process.contains(&pattern) || pattern.contains(&process))
            }
            MatchBy::WindowTitle => window.window_title.to_lowercase().contains(&pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WhitelistPolicy {
    pub mode: WhitelistMode,
    pub entries: Vec<AppMatcher>,
}

impl WhitelistPolicy {
    pub fn allow_list(entries: Vec<AppMatcher>) -> Self {
        Self {
            mode: WhitelistMode::AllowList,
            entries,
        }
    }

    pub fn deny_list(entries: Vec<AppMatcher>) -> Self {
        Self {
            mode: WhitelistMode::DenyList,
            entries,
        }
    }

    /// Whether the active window has to be looked up at all. An allow list
    /// with no entries restricts nothing.
    pub fn needs_context(&self) -> bool {
        match self.mode {
            WhitelistMode::Disabled => false,
            WhitelistMode::AllowList => !self.entries.is_empty(),
            WhitelistMode::DenyList => true,
        }
    }

    pub fn allows(&self, context: &WindowContext) -> bool {
        if !self.needs_context() {
            return true;
        }
        let window = match context {
            WindowContext::Known(window) => window,
            WindowContext::Unknown => return false,
        };
        let matched = self.entries.iter().any(|entry| entry.matches(window));
        match self.mode {
            WhitelistMode::AllowList => matched,
            WhitelistMode::DenyList => !matched,
            WhitelistMode::Disabled => true,
        }
    }

    pub fn add(&mut self, matcher: AppMatcher) -> bool {
        if self.entries.contains(&matcher) {
            return false;
        }
        self.entries.push(matcher);
        true
    }

    pub fn remove(&mut self, matcher: &AppMatcher) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != matcher);
        before != self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(process: &str, title: &str) -> WindowContext {
        WindowContext::Known(ActiveWindow::new(process, title))
    }

    #[test]
    fn disabled_allows_everything_including_unknown() {
        let policy = WhitelistPolicy::default();
        assert!(policy.allows(&known("chrome.exe", "Inbox")));
        assert!(policy.allows(&WindowContext::Unknown));
    }

    #[test]
    fn allow_list_by_process_name() {
        let policy = WhitelistPolicy::allow_list(vec![AppMatcher::process("notepad.exe")]);
        assert!(policy.allows(&known("notepad.exe", "Untitled")));
        assert!(policy.allows(&known("Notepad.exe", "Untitled")));
        assert!(!policy.allows(&known("chrome.exe", "notepad.exe - Search")));
        assert!(!policy.allows(&WindowContext::Unknown));
    }

    #[test]
    fn process_name_matches_in_either_direction() {
        let short = AppMatcher::process("notepad");
        assert!(short.matches(&ActiveWindow::new("notepad.exe", "")));
        let long = AppMatcher::process("code.exe");
        assert!(long.matches(&ActiveWindow::new("code", "")));
        assert!(!long.matches(&ActiveWindow::new("", "")));
    }

    #[test]
    fn title_matching_is_substring() {
        let policy = WhitelistPolicy::allow_list(vec![AppMatcher::title("gmail")]);
        assert!(policy.allows(&known("firefox", "Inbox - Gmail")));
        assert!(!policy.allows(&known("firefox", "Calendar")));
    }

    #[test]
    fn deny_list_blocks_matches_and_unknown() {
        let policy = WhitelistPolicy::deny_list(vec![AppMatcher::process("keepass")]);
        assert!(!policy.allows(&known("keepassxc", "Vault")));
        assert!(policy.allows(&known("gedit", "notes")));
        assert!(!policy.allows(&WindowContext::Unknown));
    }

    #[test]
    fn empty_allow_list_restricts_nothing() {
        let policy = WhitelistPolicy::allow_list(Vec::new());
        assert!(!policy.needs_context());
        assert!(policy.allows(&WindowContext::Unknown));
    }

    #[test]
    fn add_and_remove_entries() {
        let mut policy = WhitelistPolicy::default();
        assert!(policy.add(AppMatcher::process("vim")));
        assert!(!policy.add(AppMatcher::process("vim")));
        assert!(policy.remove(&AppMatcher::process("vim")));
        assert!(!policy.remove(&AppMatcher::process("vim")));
    }
}
