// malt-common/src/formulary.rs
//! Formula document store: loads and parses formula documents from the
//! library directory, caching parsed definitions behind a mutex so
//! concurrent resolution workers share one parse per formula.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::config::Config;
use super::error::{MaltError, Result};
use super::model::formula::FormulaDefinition;
use super::parser;

pub struct Formulary {
    config: Config,
    parsed_cache: Mutex<HashMap<String, Arc<FormulaDefinition>>>,
}

impl Formulary {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parsed_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Names of every known formula, sorted for deterministic iteration.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let dir = self.config.formula_dir();
        if !dir.is_dir() {
            debug!("Formula directory {} not found", dir.display());
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("rb") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    pub fn load_formula(&self, name: &str) -> Result<Arc<FormulaDefinition>> {
        {
            let cache = self.parsed_cache.lock().unwrap();
            if let Some(formula) = cache.get(name) {
                debug!("Loaded formula '{}' from parsed cache.", name);
                return Ok(Arc::clone(formula));
            }
        }

        let path = self.config.formula_document_path(name);
        if !path.is_file() {
            return Err(MaltError::NotFound(format!(
                "Formula '{name}' not found in {}",
                self.config.formula_dir().display()
            )));
        }
        let source = fs::read_to_string(&path)?;
        let formula = Arc::new(parser::parse_formula(name, &source)?);
        debug!(
            "Parsed formula '{}' ({} root directives)",
            name,
            formula.directives.len()
        );

        let mut cache = self.parsed_cache.lock().unwrap();
        Ok(Arc::clone(
            cache.entry(name.to_string()).or_insert(formula),
        ))
    }

    /// Load every known formula. Per-formula failures are collected, not
    /// fatal: independent formulas keep resolving.
    pub fn load_all(&self) -> Result<(Vec<Arc<FormulaDefinition>>, BTreeMap<String, MaltError>)> {
        let mut formulas = Vec::new();
        let mut errors = BTreeMap::new();
        for name in self.list_names()? {
            match self.load_formula(&name) {
                Ok(formula) => formulas.push(formula),
                Err(e) => {
                    debug!("Failed to load formula '{}': {}", name, e);
                    errors.insert(name, e);
                }
            }
        }
        Ok((formulas, errors))
    }
}
