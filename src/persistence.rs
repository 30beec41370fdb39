//! On-disk layout database
//!
//! One JSON document holding every saved app assignment, keys sorted,
//! human-readable. Read once at startup; rewritten whole on every mutation
//! via a temp file and rename so a crash never leaves a half-written
//! database behind. An absent or corrupt file degrades to an empty
//! database, never to a startup failure.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::constants::files;
use crate::types::{AppAssignment, AssignmentDatabase};

pub struct AssignmentStore {
    path: PathBuf,
    database: AssignmentDatabase,
}

impl AssignmentStore {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(files::APP_DIR);
        path.push(files::ASSIGNMENTS_FILENAME);
        path
    }

    pub fn load(path: PathBuf) -> Self {
        let database = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(database) => database,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "assignment file corrupt, starting empty");
                    AssignmentDatabase::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no assignment file, starting empty");
                AssignmentDatabase::new()
            }
        };
        Self { path, database }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database(&self) -> &AssignmentDatabase {
        &self.database
    }

    pub fn upsert(&mut self, assignment: AppAssignment) -> Result<()> {
        self.database.upsert(assignment);
        self.save()
    }

    /// Returns whether an assignment existed for the bundle
    pub fn remove(&mut self, bundle_id: &str) -> Result<bool> {
        let existed = self.database.remove(bundle_id).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.database.clear();
        self.save()
    }

    /// Whole-file replace: serialize next to the target, then rename over
    /// it. Rename is atomic on the same filesystem.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&self.database)
            .context("Failed to serialize assignment database")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .context(format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .context(format!("Failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), apps = self.database.len(), "assignment database written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WindowAssignment;

    fn assignment(bundle: &str) -> AppAssignment {
        AppAssignment {
            bundle_identifier: bundle.to_string(),
            app_name: "App".to_string(),
            primary_monitor_index: 1,
            windows: vec![WindowAssignment {
                window_title: "Doc".to_string(),
                window_index: 0,
                monitor_index: 1,
                space_index: 2,
            }],
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssignmentStore::load(dir.path().join("assignments.json"));
        assert!(store.database().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.json");
        fs::write(&path, "{ not json").unwrap();
        let store = AssignmentStore::load(path);
        assert!(store.database().is_empty());
    }

    #[test]
    fn test_upsert_persists_across_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.json");

        let mut store = AssignmentStore::load(path.clone());
        store.upsert(assignment("com.example.app")).unwrap();

        let reloaded = AssignmentStore::load(path);
        let saved = reloaded.database().get("com.example.app").unwrap();
        assert_eq!(saved.primary_monitor_index, 1);
        assert_eq!(saved.windows[0].space_index, 2);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("assignments.json");
        let mut store = AssignmentStore::load(path.clone());
        store.upsert(assignment("com.example.app")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_leftover_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.json");
        let mut store = AssignmentStore::load(path.clone());
        store.upsert(assignment("com.example.app")).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.json");
        let mut store = AssignmentStore::load(path.clone());
        store.upsert(assignment("com.a")).unwrap();
        store.upsert(assignment("com.b")).unwrap();

        assert!(store.remove("com.a").unwrap());
        assert!(!store.remove("com.a").unwrap());
        assert_eq!(AssignmentStore::load(path.clone()).database().len(), 1);

        store.clear().unwrap();
        assert!(AssignmentStore::load(path).database().is_empty());
    }

    #[test]
    fn test_document_shape_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.json");
        let mut store = AssignmentStore::load(path.clone());
        store.upsert(assignment("com.example.app")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["assignments"]["com.example.app"]["windows"].is_array());
        // Pretty-printed for hand inspection
        assert!(raw.contains('\n'));
    }
}
