use crate::config::Settings;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub type ExpansionId = Uuid;
pub type GroupId = Uuid;

pub const LIBRARY_VERSION: &str = "1.0.0";

/// When a matched prefix is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerMode {
    #[default]
    Immediate,
    Delayed { delay_ms: u64 },
}

impl TriggerMode {
    pub fn delayed(delay_ms: u64) -> Self {
        TriggerMode::Delayed { delay_ms }
    }

    /// Inactivity required before firing; zero for immediate triggers.
    pub fn delay(&self) -> Duration {
        match self {
            TriggerMode::Immediate => Duration::ZERO,
            TriggerMode::Delayed { delay_ms } => Duration::from_millis(*delay_ms),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Expansion {
    pub id: ExpansionId,
    #[serde(default = "Uuid::nil")]
    pub group_id: GroupId,
    pub prefix: String,
    pub body: String,
    #[serde(default)]
    pub trigger: TriggerMode,
    #[serde(default)]
    pub description: String,
    #[serde(default = "now_rfc3339")]
    pub updated: String,
}

impl Expansion {
    pub fn new(group_id: GroupId, prefix: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            prefix: prefix.into(),
            body: body.into(),
            trigger: TriggerMode::Immediate,
            description: String::new(),
            updated: now_rfc3339(),
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Prefix length in characters, the unit deletions are counted in.
    pub fn prefix_len(&self) -> usize {
        self.prefix.chars().count()
    }

    pub fn touch(&mut self) {
        self.updated = now_rfc3339();
    }

    pub fn formatted_time(&self) -> String {
        let entry_time = DateTime::parse_from_rfc3339(&self.updated)
            .map(|dt| dt.with_timezone(&Local))
            .unwrap_or_else(|_| Local::now());

        let duration = Local::now().signed_duration_since(entry_time);

        if duration.num_seconds() < 60 {
            format!("{}s ago", duration.num_seconds())
        } else if duration.num_minutes() < 60 {
            format!("{}m ago", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h ago", duration.num_hours())
        } else {
            format!("{}d ago", duration.num_days())
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub expansions: Vec<Expansion>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            expansions: Vec::new(),
        }
    }
}

/// Groups, expansions and settings as held by the data file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Library {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: Settings::default(),
            groups: Vec::new(),
        }
    }
}

impl Library {
    /// Expansions of enabled groups, in storage order.
    pub fn active_expansions(&self) -> impl Iterator<Item = &Expansion> {
        self.groups
            .iter()
            .filter(|group| group.enabled)
            .flat_map(|group| group.expansions.iter())
    }

    pub fn expansions(&self) -> impl Iterator<Item = &Expansion> {
        self.groups.iter().flat_map(|group| group.expansions.iter())
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.id == id)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Expansion> {
        self.expansions().find(|expansion| expansion.prefix == prefix)
    }

    /// Re-link each expansion to the group that holds it.
    pub fn normalize(&mut self) {
        for group in &mut self.groups {
            for expansion in &mut group.expansions {
                expansion.group_id = group.id;
            }
        }
    }
}

fn now_rfc3339() -> String {
    Local::now().to_rfc3339()
}

fn enabled_by_default() -> bool {
    true
}

fn default_version() -> String {
    LIBRARY_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_expansions_skip_disabled_groups() {
        let mut on = Group::new("on");
        on.expansions.push(Expansion::new(on.id, "/a", "alpha"));
        let mut off = Group::new("off");
        off.enabled = false;
        off.expansions.push(Expansion::new(off.id, "/b", "beta"));

        let library = Library {
            groups: vec![on, off],
            ..Library::default()
        };

        let prefixes: Vec<_> = library
            .active_expansions()
            .map(|e| e.prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["/a"]);
        assert!(library.find_by_prefix("/b").is_some());
    }

    #[test]
    fn minimal_expansion_json_gets_defaults() {
        let json = format!(
            r#"{{"id": "{}", "prefix": "/sig", "body": "Regards"}}"#,
            Uuid::new_v4()
        );
        let expansion: Expansion = serde_json::from_str(&json).unwrap();
        assert_eq!(expansion.trigger, TriggerMode::Immediate);
        assert!(expansion.group_id.is_nil());
        assert!(expansion.description.is_empty());
    }

    #[test]
    fn delayed_trigger_round_trips_through_json() {
        let mode = TriggerMode::delayed(500);
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, r#"{"mode":"delayed","delay_ms":500}"#);
        assert_eq!(mode.delay(), Duration::from_millis(500));
    }

    #[test]
    fn prefix_len_counts_characters() {
        let expansion = Expansion::new(Uuid::nil(), "/café", "coffee");
        assert_eq!(expansion.prefix_len(), 5);
    }
}
