// malt-common/src/keg.rs
//! Installed-version registry: the only state that persists across
//! invocations. The resolver and graph queries read it; mutation goes
//! through the version selector exclusively.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::Config;
use super::error::{MaltError, Result};

/// One installed version of a formula. Created on install, mutated by
/// link/unlink/switch/pin/unpin, removed on uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersionRecord {
    pub version: String,
    pub linked: bool,
    pub pinned: bool,
}

#[derive(Debug)]
pub struct KegRegistry {
    config: Config,
    records: BTreeMap<String, Vec<InstalledVersionRecord>>,
}

impl KegRegistry {
    pub fn load(config: Config) -> Result<Self> {
        let path = config.registry_path();
        let records = if path.is_file() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|e| MaltError::Registry(format!("corrupt registry {}: {e}", path.display())))?
        } else {
            debug!("No registry at {}, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(Self { config, records })
    }

    pub fn empty(config: Config) -> Self {
        Self {
            config,
            records: BTreeMap::new(),
        }
    }

    /// Persist via a staging file and atomic rename: a crash leaves the
    /// old registry or the new one, never a torn write.
    pub fn save(&self) -> Result<()> {
        let path = self.config.registry_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.staging");
        fs::write(&staging, serde_json::to_string_pretty(&self.records)?)?;
        fs::rename(&staging, &path)?;
        debug!("Registry saved to {}", path.display());
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ----- queries ----------------------------------------------------------

    pub fn installed_names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn installed_name_set(&self) -> HashSet<String> {
        self.records.keys().cloned().collect()
    }

    pub fn versions(&self, name: &str) -> &[InstalledVersionRecord] {
        self.records.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_installed(&self, name: &str) -> bool {
        !self.versions(name).is_empty()
    }

    pub fn linked_version(&self, name: &str) -> Option<&str> {
        self.versions(name)
            .iter()
            .find(|r| r.linked)
            .map(|r| r.version.as_str())
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.versions(name).iter().any(|r| r.pinned)
    }

    /// The version the resolver sees: the linked one, falling back to
    /// the newest installed (lexicographic, like version directories).
    pub fn installed_version_of(&self, name: &str) -> Option<&str> {
        self.linked_version(name).or_else(|| {
            self.versions(name)
                .iter()
                .map(|r| r.version.as_str())
                .max()
        })
    }

    /// Snapshot for a platform descriptor's installed-version lookup.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.records
            .keys()
            .filter_map(|name| {
                self.installed_version_of(name)
                    .map(|v| (name.clone(), v.to_string()))
            })
            .collect()
    }

    // ----- mutation (version selector only) ---------------------------------

    pub fn insert_version(&mut self, name: &str, record: InstalledVersionRecord) {
        self.records.entry(name.to_string()).or_default().push(record);
    }

    pub fn remove_version(&mut self, name: &str, version: &str) {
        if let Some(records) = self.records.get_mut(name) {
            records.retain(|r| r.version != version);
            if records.is_empty() {
                self.records.remove(name);
            }
        }
    }

    pub fn record_mut(&mut self, name: &str, version: &str) -> Option<&mut InstalledVersionRecord> {
        self.records
            .get_mut(name)?
            .iter_mut()
            .find(|r| r.version == version)
    }

    pub fn records_mut(&mut self, name: &str) -> Option<&mut Vec<InstalledVersionRecord>> {
        self.records.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(version: &str, linked: bool) -> InstalledVersionRecord {
        InstalledVersionRecord {
            version: version.to_string(),
            linked,
            pinned: false,
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());

        let mut registry = KegRegistry::empty(config.clone());
        registry.insert_version("wget", record("1.24.5", true));
        registry.insert_version("wget", record("1.21.0", false));
        registry.insert_version("zlib", record("1.3", true));
        registry.save().unwrap();

        let reloaded = KegRegistry::load(config).unwrap();
        assert_eq!(reloaded.installed_names(), vec!["wget", "zlib"]);
        assert_eq!(reloaded.linked_version("wget"), Some("1.24.5"));
        assert_eq!(reloaded.versions("wget").len(), 2);
    }

    #[test]
    fn installed_version_prefers_linked_over_newest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = KegRegistry::empty(Config::with_root(tmp.path()));
        registry.insert_version("node", record("22.1.0", false));
        registry.insert_version("node", record("20.9.0", true));
        assert_eq!(registry.installed_version_of("node"), Some("20.9.0"));

        registry.record_mut("node", "20.9.0").unwrap().linked = false;
        assert_eq!(registry.installed_version_of("node"), Some("22.1.0"));
    }

    #[test]
    fn missing_registry_file_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = KegRegistry::load(Config::with_root(tmp.path())).unwrap();
        assert!(registry.installed_names().is_empty());
        assert!(!registry.is_installed("anything"));
    }
}
