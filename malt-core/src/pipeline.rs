// malt-core/src/pipeline.rs
//! Batch resolution across the formula universe. Per-formula parsing
//! and resolution are pure and share no mutable state, so they fan out
//! to a worker pool; the graph builder is the single synchronization
//! point and merges results in deterministic (name) order before the
//! graph is queried.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use malt_common::dependency::graph::{DependencyGraph, DependencyGraphBuilder};
use malt_common::dependency::resolver::{DependencyListResolver, ResolvedFormula};
use malt_common::error::{MaltError, Result};
use malt_common::formulary::Formulary;
use malt_common::model::platform::PlatformDescriptor;
use threadpool::ThreadPool;
use tracing::{debug, warn};

pub struct ResolutionReport {
    pub graph: DependencyGraph,
    /// Successfully resolved formulas, in universe (name) order.
    pub resolved: Vec<ResolvedFormula>,
    /// Per-formula failures; these never abort the rest of the batch.
    pub errors: BTreeMap<String, MaltError>,
}

/// Resolve every known formula against `platform` and merge the results
/// into one graph. Only a structural defect (a dependency cycle) is
/// fatal; per-formula errors are collected in the report.
pub fn resolve_universe(
    formulary: Arc<Formulary>,
    platform: &PlatformDescriptor,
) -> Result<ResolutionReport> {
    let names = formulary.list_names()?;
    if names.is_empty() {
        return ResolutionReport::from_results(Vec::new());
    }

    let workers = num_cpus::get().min(names.len()).max(1);
    debug!(
        "Resolving {} formulas on {} workers",
        names.len(),
        workers
    );
    let pool = ThreadPool::new(workers);
    let (tx, rx) = unbounded();

    for (idx, name) in names.iter().enumerate() {
        let tx = tx.clone();
        let name = name.clone();
        let formulary = Arc::clone(&formulary);
        let platform = platform.clone();
        pool.execute(move || {
            let result = formulary
                .load_formula(&name)
                .and_then(|formula| DependencyListResolver::new(&platform).resolve(&formula));
            // a disconnected receiver means the batch was abandoned
            let _ = tx.send((idx, name, result));
        });
    }
    drop(tx);

    let mut results: Vec<(usize, String, Result<ResolvedFormula>)> = rx.iter().collect();
    pool.join();
    results.sort_by_key(|(idx, _, _)| *idx);

    ResolutionReport::from_results(
        results
            .into_iter()
            .map(|(_, name, result)| (name, result))
            .collect(),
    )
}

impl ResolutionReport {
    fn from_results(results: Vec<(String, Result<ResolvedFormula>)>) -> Result<Self> {
        let mut builder = DependencyGraphBuilder::new();
        let mut resolved = Vec::new();
        let mut errors = BTreeMap::new();

        for (name, result) in results {
            match result {
                Ok(formula) => {
                    builder.add_formula(&formula);
                    resolved.push(formula);
                }
                Err(e) => {
                    warn!("Resolution failed for '{}': {}", name, e);
                    errors.insert(name, e);
                }
            }
        }

        let graph = builder.build()?;
        Ok(Self {
            graph,
            resolved,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use malt_common::config::Config;
    use malt_common::model::version::{CpuArch, MacOSVersion, OsFamily};

    use super::*;

    fn write_formula(config: &Config, name: &str, body: &str) {
        let dir = config.formula_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(config.formula_document_path(name), body).unwrap();
    }

    fn mac_platform() -> PlatformDescriptor {
        PlatformDescriptor::new(OsFamily::Macos, MacOSVersion::Sonoma, CpuArch::Arm64)
    }

    #[test]
    fn universe_resolves_and_merges_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        write_formula(&config, "wget", "depends_on \"openssl\"\n");
        write_formula(&config, "openssl", "depends_on \"ca-certificates\"\n");
        write_formula(&config, "ca-certificates", "");

        let report =
            resolve_universe(Arc::new(Formulary::new(config)), &mac_platform()).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(
            report.graph.formulas(),
            &["ca-certificates", "openssl", "wget"]
        );
        assert_eq!(report.graph.reverse_deps("openssl"), vec!["wget"]);
    }

    #[test]
    fn broken_formula_does_not_poison_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        write_formula(&config, "good", "depends_on \"zlib\"\n");
        write_formula(&config, "broken", "on_windows do\nend\n");

        let report =
            resolve_universe(Arc::new(Formulary::new(config)), &mac_platform()).unwrap();
        assert_eq!(report.resolved.len(), 1);
        assert!(matches!(
            report.errors.get("broken"),
            Some(MaltError::UnknownPredicate { .. })
        ));
    }

    #[test]
    fn cycle_in_the_universe_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        write_formula(&config, "a", "depends_on \"b\"\n");
        write_formula(&config, "b", "depends_on \"a\"\n");

        let result = resolve_universe(Arc::new(Formulary::new(config)), &mac_platform());
        assert!(matches!(result, Err(MaltError::CycleDetected(_))));
    }
}
