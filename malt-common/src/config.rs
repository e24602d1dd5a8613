// malt-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::Result;

// Fallback if MALT_ROOT is not set or is empty.
const DEFAULT_FALLBACK_MALT_ROOT: &str = "/opt/malt";

#[derive(Debug, Clone)]
pub struct Config {
    pub malt_root: PathBuf, // Public for direct construction in tests
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading malt configuration");

        let malt_root_str = env::var("MALT_ROOT")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "MALT_ROOT environment variable not set or empty, falling back to default: {}",
                    DEFAULT_FALLBACK_MALT_ROOT
                );
                DEFAULT_FALLBACK_MALT_ROOT.to_string()
            });

        let malt_root = PathBuf::from(&malt_root_str);
        debug!("Effective MALT_ROOT set to: {}", malt_root.display());

        Ok(Self { malt_root })
    }

    /// Construct a config rooted at an explicit prefix (tests, tooling).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            malt_root: root.into(),
        }
    }

    pub fn malt_root(&self) -> &Path {
        &self.malt_root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.malt_root.join("bin")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.malt_root.join("Cellar")
    }

    pub fn opt_dir(&self) -> PathBuf {
        self.malt_root.join("opt")
    }

    pub fn formula_dir(&self) -> PathBuf {
        self.malt_root.join("Library/Formula")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.malt_root.join("state")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.state_dir().join("installed.json")
    }

    pub fn formula_cellar_dir(&self, formula_name: &str) -> PathBuf {
        self.cellar_dir().join(formula_name)
    }

    pub fn formula_keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name).join(version_str)
    }

    pub fn formula_opt_path(&self, formula_name: &str) -> PathBuf {
        self.opt_dir().join(formula_name)
    }

    pub fn formula_document_path(&self, formula_name: &str) -> PathBuf {
        self.formula_dir().join(format!("{formula_name}.rb"))
    }

    pub fn home_dir(&self) -> PathBuf {
        UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::load().expect("Failed to load default configuration")
    }
}

pub fn load_config() -> Result<Config> {
    Config::load()
}
