use crate::config::{data_file_path, Settings};
use crate::error::{ExpandoError, Result};
use crate::models::{Expansion, ExpansionId, Group, GroupId, Library, TriggerMode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Load a library from disk. A missing or empty file yields an empty library.
pub fn load_library(path: &Path) -> Result<Library> {
    if !path.exists() {
        return Ok(Library::default());
    }

    let content = fs::read_to_string(path)?;

    // Handle empty data file
    if content.trim().is_empty() {
        return Ok(Library::default());
    }

    let mut library: Library = serde_json::from_str(&content)?;
    library.normalize();
    Ok(library)
}

/// Save a library to disk, creating the parent directory if needed
pub fn save_library(path: &Path, library: &Library) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let serialized = serde_json::to_string_pretty(library)?;
    fs::write(path, serialized)?;
    Ok(())
}

/// The data file together with its in-memory contents. Every mutation is
/// written back before it returns.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    library: Library,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let library = load_library(&path)?;
        debug!(path = %path.display(), groups = library.groups.len(), "Opened store");
        Ok(Self { path, library })
    }

    /// Open the data file in the configuration directory
    pub fn open_default() -> Result<Self> {
        Self::open(data_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn save(&self) -> Result<()> {
        save_library(&self.path, &self.library)
    }

    /// Apply a change to the settings and persist it
    pub fn update_settings(&mut self, change: impl FnOnce(&mut Settings)) -> Result<()> {
        change(&mut self.library.settings);
        self.save()
    }

    pub fn add_group(&mut self, name: &str) -> Result<GroupId> {
        let group = Group::new(name);
        let id = group.id;
        self.library.groups.push(group);
        self.save()?;
        Ok(id)
    }

    pub fn rename_group(&mut self, id: GroupId, name: &str) -> Result<()> {
        self.group_mut(id)?.name = name.to_string();
        self.save()
    }

    /// Disabled groups keep their data but drop out of the active index.
    pub fn set_group_enabled(&mut self, id: GroupId, enabled: bool) -> Result<()> {
        self.group_mut(id)?.enabled = enabled;
        self.save()
    }

    pub fn remove_group(&mut self, id: GroupId) -> Result<Group> {
        let position = self
            .library
            .groups
            .iter()
            .position(|group| group.id == id)
            .ok_or_else(|| ExpandoError::GroupNotFound(id.to_string()))?;
        let group = self.library.groups.remove(position);
        self.save()?;
        Ok(group)
    }

    pub fn add_expansion(
        &mut self,
        group_id: GroupId,
        prefix: &str,
        body: &str,
        trigger: TriggerMode,
        description: &str,
    ) -> Result<ExpansionId> {
        self.check_prefix(prefix, None)?;
        let expansion = Expansion::new(group_id, prefix, body)
            .with_trigger(trigger)
            .with_description(description);
        let id = expansion.id;
        self.group_mut(group_id)?.expansions.push(expansion);
        self.save()?;
        Ok(id)
    }

    pub fn update_expansion(
        &mut self,
        id: ExpansionId,
        prefix: &str,
        body: &str,
        trigger: TriggerMode,
        description: &str,
    ) -> Result<()> {
        self.check_prefix(prefix, Some(id))?;
        let expansion = self
            .library
            .groups
            .iter_mut()
            .flat_map(|group| group.expansions.iter_mut())
            .find(|expansion| expansion.id == id)
            .ok_or_else(|| ExpandoError::ExpansionNotFound(id.to_string()))?;

        expansion.prefix = prefix.to_string();
        expansion.body = body.to_string();
        expansion.trigger = trigger;
        expansion.description = description.to_string();
        expansion.touch();
        self.save()
    }

    pub fn remove_expansion(&mut self, id: ExpansionId) -> Result<Expansion> {
        for group in &mut self.library.groups {
            if let Some(position) = group.expansions.iter().position(|e| e.id == id) {
                let removed = group.expansions.remove(position);
                self.save()?;
                return Ok(removed);
            }
        }
        Err(ExpandoError::ExpansionNotFound(id.to_string()))
    }

    /// Delete an expansion by prefix
    pub fn remove_by_prefix(&mut self, prefix: &str) -> Result<Expansion> {
        let id = self
            .library
            .find_by_prefix(prefix)
            .map(|expansion| expansion.id)
            .ok_or_else(|| ExpandoError::ExpansionNotFound(prefix.to_string()))?;
        self.remove_expansion(id)
    }

    /// Whether no expansion other than `exclude` uses this prefix
    pub fn is_prefix_unique(&self, prefix: &str, exclude: Option<ExpansionId>) -> bool {
        !self
            .library
            .expansions()
            .any(|expansion| expansion.prefix == prefix && Some(expansion.id) != exclude)
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        save_library(path, &self.library)
    }

    /// Import another data file. Replacing swaps the whole library; merging
    /// adds groups whose name is new, under fresh ids, and skips expansions
    /// whose prefix is already taken. Returns the number of expansions
    /// brought in.
    pub fn import(&mut self, path: &Path, merge: bool) -> Result<usize> {
        if !path.exists() {
            return Err(ExpandoError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let imported = load_library(path)?;

        if !merge {
            let count = imported.expansions().count();
            self.library = imported;
            self.save()?;
            return Ok(count);
        }

        let mut added = 0;
        for mut group in imported.groups {
            if self.library.group_by_name(&group.name).is_some() {
                debug!(group = %group.name, "Skipping imported group with existing name");
                continue;
            }
            group.id = Uuid::new_v4();
            let incoming = std::mem::take(&mut group.expansions);
            for mut expansion in incoming {
                if !self.is_prefix_unique(&expansion.prefix, None)
                    || group.expansions.iter().any(|e| e.prefix == expansion.prefix)
                {
                    warn!(prefix = %expansion.prefix, "Skipping imported expansion with duplicate prefix");
                    continue;
                }
                expansion.id = Uuid::new_v4();
                expansion.group_id = group.id;
                group.expansions.push(expansion);
            }
            added += group.expansions.len();
            self.library.groups.push(group);
        }
        self.save()?;
        Ok(added)
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group> {
        self.library
            .group_mut(id)
            .ok_or_else(|| ExpandoError::GroupNotFound(id.to_string()))
    }

    fn check_prefix(&self, prefix: &str, exclude: Option<ExpansionId>) -> Result<()> {
        if prefix.is_empty() {
            return Err(ExpandoError::EmptyPrefix);
        }
        if !self.is_prefix_unique(prefix, exclude) {
            return Err(ExpandoError::DuplicatePrefix {
                prefix: prefix.to_string(),
            });
        }
        Ok(())
    }
}
