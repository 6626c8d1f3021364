//! Prefix lookup over the active expansions.
//!
//! Two tries are kept: one keyed by the reversed prefix, walked backwards from
//! the end of the keystroke buffer to find every registered prefix that is a
//! suffix of it, and one keyed forwards, used to tell whether the text typed
//! so far could still grow into a longer registered prefix. Both walks are
//! bounded by the longest registered prefix, never by the number of
//! expansions.

use crate::error::{ExpandoError, Result};
use crate::models::{Expansion, ExpansionId};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal: Option<ExpansionId>,
}

impl TrieNode {
    fn insert(&mut self, path: impl Iterator<Item = char>, id: ExpansionId) {
        let node = path.fold(self, |node, c| node.children.entry(c).or_default());
        node.terminal = Some(id);
    }

    /// Clear the terminal at the end of `path`, pruning emptied branches.
    /// Returns true when this node is left with nothing in it.
    fn remove(&mut self, path: &[char]) -> bool {
        match path.split_first() {
            None => self.terminal = None,
            Some((c, rest)) => {
                if let Some(child) = self.children.get_mut(c) {
                    if child.remove(rest) {
                        self.children.remove(c);
                    }
                }
            }
        }
        self.terminal.is_none() && self.children.is_empty()
    }

    fn walk<'a>(&'a self, path: impl Iterator<Item = char>) -> Option<&'a TrieNode> {
        let mut node = self;
        for c in path {
            node = node.children.get(&c)?;
        }
        Some(node)
    }
}

#[derive(Debug, Default)]
pub struct TriggerIndex {
    expansions: HashMap<ExpansionId, Expansion>,
    by_prefix: HashMap<String, ExpansionId>,
    reversed: TrieNode,
    forward: TrieNode,
    longest: usize,
}

impl TriggerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an expansion. Re-inserting a known id replaces the old entry.
    pub fn insert(&mut self, expansion: Expansion) -> Result<()> {
        if expansion.prefix.is_empty() {
            return Err(ExpandoError::EmptyPrefix);
        }
        if let Some(owner) = self.by_prefix.get(&expansion.prefix) {
            if *owner != expansion.id {
                return Err(ExpandoError::DuplicatePrefix {
                    prefix: expansion.prefix,
                });
            }
        }
        if self.expansions.contains_key(&expansion.id) {
            self.remove(expansion.id);
        }

        self.reversed
            .insert(expansion.prefix.chars().rev(), expansion.id);
        self.forward.insert(expansion.prefix.chars(), expansion.id);
        self.longest = self.longest.max(expansion.prefix_len());
        self.by_prefix
            .insert(expansion.prefix.clone(), expansion.id);
        self.expansions.insert(expansion.id, expansion);
        Ok(())
    }

    pub fn remove(&mut self, id: ExpansionId) -> Option<Expansion> {
        let expansion = self.expansions.remove(&id)?;
        self.by_prefix.remove(&expansion.prefix);

        let forward: Vec<char> = expansion.prefix.chars().collect();
        let reversed: Vec<char> = forward.iter().rev().copied().collect();
        self.forward.remove(&forward);
        self.reversed.remove(&reversed);

        if forward.len() == self.longest {
            self.longest = self
                .expansions
                .values()
                .map(Expansion::prefix_len)
                .max()
                .unwrap_or(0);
        }
        Some(expansion)
    }

    /// Replace the whole index. Entries whose prefix collides with an earlier
    /// one are skipped and returned as errors.
    pub fn rebuild<I>(&mut self, expansions: I) -> Vec<ExpandoError>
    where
        I: IntoIterator<Item = Expansion>,
    {
        *self = Self::default();
        let mut rejected = Vec::new();
        for expansion in expansions {
            if let Err(err) = self.insert(expansion) {
                warn!("Skipping expansion during rebuild: {}", err);
                rejected.push(err);
            }
        }
        debug!(
            entries = self.expansions.len(),
            longest = self.longest,
            "Trigger index rebuilt"
        );
        rejected
    }

    /// Expansions whose prefix is a suffix of `buffer_tail`, longest first.
    pub fn find_matches(&self, buffer_tail: &str) -> Vec<&Expansion> {
        let mut found = Vec::new();
        let mut node = &self.reversed;
        for c in buffer_tail.chars().rev() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => break,
            }
            if let Some(expansion) = node.terminal.and_then(|id| self.expansions.get(&id)) {
                found.push(expansion);
            }
        }
        found.reverse();
        found
    }

    /// Whether some suffix of `buffer_tail` at least `matched_len` characters
    /// long is a proper prefix of a longer registered prefix, i.e. whether
    /// more typing could still turn the current match into a longer one.
    pub fn can_extend(&self, buffer_tail: &str, matched_len: usize) -> bool {
        if matched_len == 0 || self.longest <= matched_len {
            return false;
        }
        let chars: Vec<char> = buffer_tail.chars().collect();
        let n = chars.len();
        if n < matched_len {
            return false;
        }

        let lowest_start = n.saturating_sub(self.longest - 1);
        let highest_start = n - matched_len;
        (lowest_start..=highest_start).any(|start| {
            self.forward
                .walk(chars[start..].iter().copied())
                .is_some_and(|node| !node.children.is_empty())
        })
    }

    pub fn get(&self, id: ExpansionId) -> Option<&Expansion> {
        self.expansions.get(&id)
    }

    pub fn longest_prefix_len(&self) -> usize {
        self.longest
    }

    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }
}
