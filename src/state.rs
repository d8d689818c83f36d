use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::resource::Kind;

// ============================================================================
// State Structures
// ============================================================================

/// Tracked state for every managed resource instance
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Tracked instances keyed by address, e.g. `devhub_dashboard.ops`
    #[serde(default)]
    pub resources: BTreeMap<String, Entry>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    #[serde(skip)]
    path: PathBuf,
}

/// One tracked instance
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Entry {
    pub kind: Kind,

    /// Remote identifier
    pub id: String,

    /// Full tracked state, as the resource kind serializes it
    pub state: Value,
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load the default state file
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::state_file()?)
    }

    /// Load state from disk, or return empty state if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self::empty(path));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let mut state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        state.path = path.to_path_buf();

        log::debug!(
            "Loaded {} tracked resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    fn empty(path: &Path) -> Self {
        Self {
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save state to disk through a temporary file
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let temp = paths::temp_sibling(&self.path);
        fs::write(&temp, &content)
            .with_context(|| format!("Failed to write state file: {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self) -> Result<()> {
        self.last_updated = Utc::now();
        self.save()
    }

    // ========================================================================
    // Entry Helpers
    // ========================================================================

    pub fn get(&self, address: &str) -> Option<&Entry> {
        self.resources.get(address)
    }

    /// Track or replace an instance
    pub fn put(&mut self, address: &str, kind: Kind, id: String, state: Value) {
        self.resources
            .insert(address.to_string(), Entry { kind, id, state });
    }

    /// Stop tracking an instance
    pub fn remove(&mut self, address: &str) -> Option<Entry> {
        self.resources.remove(address)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        assert!(state.resources.is_empty());
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = StateFile::load_from(&path).unwrap();
        state.put(
            "devhub_dashboard.ops",
            Kind::Dashboard,
            "dash-1".to_string(),
            json!({ "id": "dash-1", "name": "Ops" }),
        );
        state.touch().unwrap();
        assert!(path.exists());
        assert!(!paths::temp_sibling(&path).exists());

        let loaded = StateFile::load_from(&path).unwrap();
        assert_eq!(loaded.path(), path);
        let entry = loaded.get("devhub_dashboard.ops").unwrap();
        assert_eq!(entry.kind, Kind::Dashboard);
        assert_eq!(entry.id, "dash-1");
        assert_eq!(entry.state["name"], "Ops");
    }

    #[test]
    fn test_put_replaces_and_remove_drops() {
        let dir = TempDir::new().unwrap();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        state.put("devhub_workflow.a", Kind::Workflow, "w-1".to_string(), json!({}));
        state.put("devhub_workflow.a", Kind::Workflow, "w-2".to_string(), json!({}));
        assert_eq!(state.resources.len(), 1);
        assert_eq!(state.get("devhub_workflow.a").unwrap().id, "w-2");

        assert!(state.remove("devhub_workflow.a").is_some());
        assert!(state.remove("devhub_workflow.a").is_none());
        assert!(state.get("devhub_workflow.a").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = StateFile::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let entry = Entry {
            kind: Kind::Workspace,
            id: "ws-1".to_string(),
            state: json!(null),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "workspace");
    }
}
