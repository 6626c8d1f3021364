use expando_core::{Library, MatchBy, TriggerMode, WhitelistMode, WhitelistPolicy};
use std::fmt::Write;

const BODY_PREVIEW: usize = 40;

/// Single-line preview of an expansion body.
pub fn preview(body: &str) -> String {
    let flat: String = body
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= BODY_PREVIEW {
        return flat;
    }
    let cut: String = flat.chars().take(BODY_PREVIEW - 3).collect();
    format!("{}...", cut)
}

fn trigger_label(trigger: &TriggerMode) -> String {
    match trigger {
        TriggerMode::Immediate => "immediate".to_string(),
        TriggerMode::Delayed { delay_ms } => format!("after {}ms", delay_ms),
    }
}

pub fn format_library(library: &Library) -> String {
    if library.groups.is_empty() {
        return "No expansions yet. Add one with `expando add`.\n".to_string();
    }

    let mut out = String::new();
    for group in &library.groups {
        let state = if group.enabled { "" } else { " (disabled)" };
        let _ = writeln!(out, "{}{}", group.name, state);
        for expansion in &group.expansions {
            let _ = writeln!(
                out,
                "  {:<12} {:<12} {}  [{}]",
                expansion.prefix,
                trigger_label(&expansion.trigger),
                preview(&expansion.body),
                expansion.formatted_time()
            );
        }
    }
    out
}

pub fn format_whitelist(policy: &WhitelistPolicy) -> String {
    let mode = match policy.mode {
        WhitelistMode::Disabled => "disabled (expand everywhere)",
        WhitelistMode::AllowList => "allow list (expand only in listed applications)",
        WhitelistMode::DenyList => "deny list (expand everywhere except listed applications)",
    };
    let mut out = format!("Mode: {}\n", mode);
    for entry in &policy.entries {
        let by = match entry.by {
            MatchBy::ProcessName => "process",
            MatchBy::WindowTitle => "title",
        };
        let _ = writeln!(out, "  {:<8} {}", by, entry.pattern);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use expando_core::{AppMatcher, Expansion, Group};

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb"), "a b");
        let long = "x".repeat(60);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), BODY_PREVIEW);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn library_listing_marks_disabled_groups() {
        let mut group = Group::new("Work");
        group.enabled = false;
        group.expansions.push(
            Expansion::new(group.id, "/sig", "Best regards").with_trigger(TriggerMode::delayed(250)),
        );
        let library = Library {
            groups: vec![group],
            ..Library::default()
        };

        let listing = format_library(&library);
        assert!(listing.starts_with("Work (disabled)\n"));
        assert!(listing.contains("/sig"));
        assert!(listing.contains("after 250ms"));
    }

    #[test]
    fn whitelist_listing_names_match_kind() {
        let policy = WhitelistPolicy::deny_list(vec![
            AppMatcher::process("chrome.exe"),
            AppMatcher::title("Password"),
        ]);
        let listing = format_whitelist(&policy);
        assert!(listing.starts_with("Mode: deny list"));
        assert!(listing.contains("process  chrome.exe"));
        assert!(listing.contains("title    Password"));
    }
}
