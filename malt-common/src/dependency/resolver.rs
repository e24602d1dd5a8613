// malt-common/src/dependency/resolver.rs
//! Per-formula dependency resolution: a depth-first walk of the
//! directive tree threading an explicit scope stack.
//!
//! The scope stack holds the evaluated truth of every enclosing
//! `on_...` block. Nesting is conjunctive regardless of order; sibling
//! blocks are independent of each other. Blocks are entered even when
//! their predicate is false so malformed guards deeper in the tree
//! still surface as errors instead of silently disappearing with the
//! dependency they protect.

use tracing::debug;

use super::definition::{DependencyKind, DependencyTag};
use super::requirement::{DependencyRequirement, Requirement};
use crate::error::Result;
use crate::model::formula::{Directive, FormulaDefinition};
use crate::model::platform::PlatformDescriptor;
use crate::model::version::{MacOSVersion, OsFamily, ToolVersion};

/// Outcome of resolving one formula against one platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFormula {
    pub name: String,
    /// Normalized requirements in declaration order, one per kind tag.
    pub requirements: Vec<DependencyRequirement>,
    /// Human-readable reasons the platform cannot host this formula.
    pub unsupported: Vec<String>,
}

impl ResolvedFormula {
    pub fn targets_of_kind(&self, kind: DependencyKind) -> Vec<&str> {
        self.requirements
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.target.as_str())
            .collect()
    }
}

pub struct DependencyListResolver<'a> {
    platform: &'a PlatformDescriptor,
}

impl<'a> DependencyListResolver<'a> {
    pub fn new(platform: &'a PlatformDescriptor) -> Self {
        Self { platform }
    }

    pub fn resolve(&self, formula: &FormulaDefinition) -> Result<ResolvedFormula> {
        let mut resolved = ResolvedFormula {
            name: formula.name.clone(),
            requirements: Vec::new(),
            unsupported: Vec::new(),
        };
        let mut scope: Vec<bool> = Vec::new();
        self.walk(formula, &formula.directives, &mut scope, &mut resolved)?;
        debug!(
            "Resolved '{}': {} requirements, {} platform issues",
            formula.name,
            resolved.requirements.len(),
            resolved.unsupported.len()
        );
        Ok(resolved)
    }

    fn walk(
        &self,
        formula: &FormulaDefinition,
        directives: &[Directive],
        scope: &mut Vec<bool>,
        out: &mut ResolvedFormula,
    ) -> Result<()> {
        for directive in directives {
            match directive {
                Directive::OnBlock { predicate, body } => {
                    let active = predicate.matches(self.platform)?;
                    debug!(
                        "'{}': entering {} (active: {active})",
                        formula.name, predicate
                    );
                    scope.push(active);
                    self.walk(formula, body, scope, out)?;
                    scope.pop();
                }
                Directive::DependsOn {
                    target,
                    tags,
                    options,
                    guard,
                } => {
                    if !scope.iter().all(|b| *b) {
                        continue;
                    }
                    if let Some(guard) = guard {
                        if !guard.eval(self.platform)? {
                            continue;
                        }
                    }
                    self.emit(formula, target, *tags, options, out);
                }
                Directive::UsesFromMacos {
                    target,
                    tags,
                    since,
                } => {
                    if !scope.iter().all(|b| *b) {
                        continue;
                    }
                    self.emit_uses_from_macos(formula, target, *tags, *since, out);
                }
                Directive::Requires(requirement) => {
                    if !scope.iter().all(|b| *b) {
                        continue;
                    }
                    if !self.requirement_met(requirement) {
                        out.unsupported.push(requirement.to_string());
                    }
                }
                Directive::Option { .. } => {}
            }
        }
        Ok(())
    }

    fn emit(
        &self,
        formula: &FormulaDefinition,
        target: &str,
        tags: DependencyTag,
        options: &[String],
        out: &mut ResolvedFormula,
    ) {
        for kind in tags.kinds() {
            out.requirements.push(
                DependencyRequirement::new(&formula.name, target, kind)
                    .with_options(options.to_vec()),
            );
        }
    }

    /// OS-provided-copy substitution: on macOS at or above `since` (or
    /// unconditionally without one) the OS supplies the runtime copy, so
    /// only explicitly tagged build/test kinds survive, since build and test
    /// tooling cannot rely on a system copy. Everywhere else the stanza
    /// behaves like a plain `depends_on`.
    fn emit_uses_from_macos(
        &self,
        formula: &FormulaDefinition,
        target: &str,
        tags: DependencyTag,
        since: Option<MacOSVersion>,
        out: &mut ResolvedFormula,
    ) {
        let os_provides = self.platform.os_is(OsFamily::Macos)
            && since.map_or(true, |v| self.platform.version_at_least(v));
        for kind in tags.kinds() {
            if os_provides && !matches!(kind, DependencyKind::Build | DependencyKind::Test) {
                debug!(
                    "'{}': '{target}' ({kind}) supplied by the OS, suppressed",
                    formula.name
                );
                continue;
            }
            out.requirements
                .push(DependencyRequirement::new(&formula.name, target, kind));
        }
    }

    fn requirement_met(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::Macos => self.platform.os_is(OsFamily::Macos),
            Requirement::Linux => self.platform.os_is(OsFamily::Linux),
            Requirement::Arch(arch) => self.platform.arch_is(*arch),
            Requirement::MacosAtLeast(v) => {
                self.platform.os_is(OsFamily::Macos) && self.platform.version_at_least(*v)
            }
            Requirement::MacosAtMost(v) => {
                self.platform.os_is(OsFamily::Macos) && self.platform.version_at_most(*v)
            }
            Requirement::Xcode { min } => {
                let current = self.platform.tool_version_or_zero("xcode");
                match min {
                    Some(v) => current >= *v,
                    None => current > ToolVersion::ZERO,
                }
            }
        }
    }
}
