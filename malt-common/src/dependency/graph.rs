// malt-common/src/dependency/graph.rs
//! The package universe as a directed graph. Nodes are formula names in
//! first-seen insertion order; edges are (from, target, kind) with
//! parallel duplicates collapsed and declaration order preserved. The
//! install-ordering subset (runtime + build + test edges) must be a DAG;
//! a cycle is an authoring defect and fails construction of the whole
//! universe rather than being broken by dropping an arbitrary edge.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::definition::{DependencyKind, DependencyTag};
use super::resolver::ResolvedFormula;
use crate::error::{MaltError, Result};

/// Which edge kinds a query follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFilter(DependencyTag);

impl KindFilter {
    pub fn new(tags: DependencyTag) -> Self {
        Self(tags)
    }

    /// Everything except build- and test-only edges.
    pub fn runtime() -> Self {
        Self(DependencyTag::RUNTIME | DependencyTag::RECOMMENDED | DependencyTag::OPTIONAL)
    }

    /// Edges that participate in install ordering and cycle checks.
    pub fn install_order() -> Self {
        Self(DependencyTag::RUNTIME | DependencyTag::BUILD | DependencyTag::TEST)
    }

    pub fn everything() -> Self {
        Self(DependencyTag::all())
    }

    pub fn include_build(mut self, include: bool) -> Self {
        if include {
            self.0 |= DependencyTag::BUILD;
        }
        self
    }

    pub fn include_test(mut self, include: bool) -> Self {
        if include {
            self.0 |= DependencyTag::TEST;
        }
        self
    }

    pub fn accepts(&self, kind: DependencyKind) -> bool {
        self.0.contains(kind.tag())
    }
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::runtime()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub target: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    order: Vec<String>,
    edges: HashMap<String, Vec<Edge>>,
    seen: HashSet<(String, String, DependencyKind)>,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node even if nothing resolves for it.
    pub fn add_node(&mut self, name: &str) {
        if !self.edges.contains_key(name) {
            self.order.push(name.to_string());
            self.edges.insert(name.to_string(), Vec::new());
        }
    }

    /// Merge one formula's requirement sequence. Parallel edges between
    /// the same pair with the same kind are collapsed; first declaration
    /// wins the position.
    pub fn add_formula(&mut self, resolved: &ResolvedFormula) {
        self.add_node(&resolved.name);
        for req in &resolved.requirements {
            let key = (resolved.name.clone(), req.target.clone(), req.kind);
            if !self.seen.insert(key) {
                continue;
            }
            self.edges
                .get_mut(&resolved.name)
                .expect("node registered above")
                .push(Edge {
                    target: req.target.clone(),
                    kind: req.kind,
                });
        }
    }

    /// Finish the graph. Fails with the offending path if the
    /// install-ordering edges contain a cycle.
    pub fn build(self) -> Result<DependencyGraph> {
        let graph = DependencyGraph {
            order: self.order,
            edges: self.edges,
        };
        if let Some(cycle) = graph.find_cycle() {
            return Err(MaltError::CycleDetected(cycle));
        }
        debug!("Dependency graph built: {} formulas", graph.order.len());
        Ok(graph)
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    order: Vec<String>,
    edges: HashMap<String, Vec<Edge>>,
}

impl DependencyGraph {
    /// All known formulas, in the order they were merged.
    pub fn formulas(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Direct requirement targets, filtered by kind, declaration order,
    /// one entry per target.
    pub fn forward_deps(&self, name: &str, filter: KindFilter) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.edges
            .get(name)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|e| filter.accepts(e.kind))
                    .filter(|e| seen.insert(e.target.as_str()))
                    .map(|e| e.target.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Transitive closure of `forward_deps`, first-seen order, cycle-safe.
    pub fn transitive_deps(&self, name: &str, filter: KindFilter) -> Vec<&str> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.forward_deps(name, filter);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            let mut children = self.forward_deps(next, filter);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Formulas whose requirements reference `name`, in the order their
    /// own definitions were merged into the graph.
    pub fn reverse_deps(&self, name: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|from| {
                self.edges
                    .get(*from)
                    .is_some_and(|edges| edges.iter().any(|e| e.target == name))
            })
            .map(String::as_str)
            .collect()
    }

    /// Transitive dependents of `name`, first-seen merge order.
    pub fn transitive_dependents(&self, name: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.reverse_deps(name);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            let mut parents = self.reverse_deps(next);
            parents.reverse();
            stack.extend(parents);
        }
        out
    }

    /// Formulas no other known formula depends on through a runtime or
    /// build edge.
    pub fn leaves(&self) -> Vec<&str> {
        let mut depended: HashSet<&str> = HashSet::new();
        for (from, edges) in &self.edges {
            for edge in edges {
                if matches!(edge.kind, DependencyKind::Test) {
                    continue;
                }
                if matches!(
                    edge.kind,
                    DependencyKind::Recommended | DependencyKind::Optional
                ) {
                    continue;
                }
                if edge.target != *from {
                    depended.insert(edge.target.as_str());
                }
            }
        }
        self.order
            .iter()
            .filter(|name| !depended.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Per installed formula, the requirement targets absent from
    /// `installed`. Only formulas in `installed` are inspected.
    pub fn missing(&self, installed: &HashSet<String>) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        for name in &self.order {
            if !installed.contains(name) {
                continue;
            }
            let gaps: Vec<String> = self
                .forward_deps(name, KindFilter::runtime().include_build(true))
                .into_iter()
                .filter(|dep| !installed.contains(*dep))
                .map(str::to_string)
                .collect();
            if !gaps.is_empty() {
                out.insert(name.clone(), gaps);
            }
        }
        out
    }

    /// Depth-first cycle scan over the install-ordering edges. Returns
    /// the cycle path (closed: first element repeated at the end).
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let filter = KindFilter::install_order();
        let mut color: HashMap<&str, Color> = self
            .order
            .iter()
            .map(|n| (n.as_str(), Color::White))
            .collect();

        fn visit<'a>(
            graph: &'a DependencyGraph,
            node: &'a str,
            filter: KindFilter,
            color: &mut HashMap<&'a str, Color>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            color.insert(node, Color::Gray);
            path.push(node);
            for next in graph.forward_deps(node, filter) {
                match color.get(next).copied() {
                    Some(Color::Gray) => {
                        let start = path.iter().position(|n| *n == next).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(next.to_string());
                        return Some(cycle);
                    }
                    Some(Color::White) => {
                        if let Some(cycle) = visit(graph, next, filter, color, path) {
                            return Some(cycle);
                        }
                    }
                    // Black: already proven acyclic. None: edge to an
                    // unknown formula, nothing to follow.
                    _ => {}
                }
            }
            path.pop();
            color.insert(node, Color::Black);
            None
        }

        let mut path = Vec::new();
        for node in &self.order {
            if color.get(node.as_str()) == Some(&Color::White) {
                if let Some(cycle) = visit(self, node, filter, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Box-drawing tree of `name`'s dependencies, cycle-safe via the
    /// visited set of the current branch.
    pub fn render_tree(&self, name: &str, filter: KindFilter) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{name}");
        self.render_subtree(name, filter, &mut Vec::new(), &mut out);
        out
    }

    fn render_subtree(
        &self,
        name: &str,
        filter: KindFilter,
        levels: &mut Vec<bool>,
        out: &mut String,
    ) {
        let children = self.forward_deps(name, filter);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            for more in levels.iter() {
                out.push_str(if *more { "│  " } else { "   " });
            }
            out.push_str(if last { "└─ " } else { "├─ " });
            out.push_str(child);
            out.push('\n');
            levels.push(!last);
            self.render_subtree(child, filter, levels, out);
            levels.pop();
        }
    }

    /// Graphviz rendering of the subgraph reachable from `roots`.
    pub fn render_dot(&self, roots: &[String], filter: KindFilter, reverse: bool) -> String {
        let mut out = String::from("digraph G {\n");
        let mut root_names: Vec<&str> = roots.iter().map(String::as_str).collect();
        root_names.sort_unstable();
        let _ = writeln!(
            out,
            "{{rank=same; {} [shape=box, style=dashed];}}",
            root_names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut nodes: HashSet<&str> = HashSet::new();
        for root in &root_names {
            nodes.insert(root);
            if reverse {
                nodes.extend(self.transitive_dependents(root));
            } else {
                nodes.extend(self.transitive_deps(root, filter));
            }
        }
        let mut sorted: Vec<&str> = nodes.into_iter().collect();
        sorted.sort_unstable();
        for node in sorted {
            let mut deps = self.forward_deps(node, filter);
            deps.sort_unstable();
            for dep in deps {
                let _ = if reverse {
                    writeln!(out, "\"{dep}\" -> \"{node}\";")
                } else {
                    writeln!(out, "\"{node}\" -> \"{dep}\";")
                };
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::requirement::DependencyRequirement;

    fn resolved(name: &str, deps: &[(&str, DependencyKind)]) -> ResolvedFormula {
        ResolvedFormula {
            name: name.to_string(),
            requirements: deps
                .iter()
                .map(|(target, kind)| DependencyRequirement::new(name, *target, *kind))
                .collect(),
            unsupported: Vec::new(),
        }
    }

    fn graph(formulas: &[ResolvedFormula]) -> DependencyGraph {
        let mut builder = DependencyGraphBuilder::new();
        for f in formulas {
            builder.add_formula(f);
        }
        builder.build().unwrap()
    }

    #[test]
    fn reverse_deps_in_merge_order_and_no_false_cycle() {
        let g = graph(&[
            resolved("a", &[("b", DependencyKind::Runtime)]),
            resolved("c", &[("b", DependencyKind::Runtime)]),
            resolved("b", &[]),
        ]);
        assert_eq!(g.reverse_deps("b"), vec!["a", "c"]);
    }

    #[test]
    fn cycle_fails_graph_construction() {
        let mut builder = DependencyGraphBuilder::new();
        builder.add_formula(&resolved("a", &[("b", DependencyKind::Runtime)]));
        builder.add_formula(&resolved("b", &[("a", DependencyKind::Build)]));
        match builder.build() {
            Err(MaltError::CycleDetected(cycle)) => {
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn test_only_edges_do_not_create_cycles() {
        // a -> b (runtime), b -> a (test): fine for install ordering?
        // No: test edges participate in the cycle check too.
        let mut builder = DependencyGraphBuilder::new();
        builder.add_formula(&resolved("a", &[("b", DependencyKind::Runtime)]));
        builder.add_formula(&resolved("b", &[("a", DependencyKind::Test)]));
        assert!(builder.build().is_err());

        // recommended edges do not.
        let mut builder = DependencyGraphBuilder::new();
        builder.add_formula(&resolved("a", &[("b", DependencyKind::Runtime)]));
        builder.add_formula(&resolved("b", &[("a", DependencyKind::Recommended)]));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn default_filter_excludes_build_and_test() {
        let g = graph(&[resolved(
            "a",
            &[
                ("r", DependencyKind::Runtime),
                ("b", DependencyKind::Build),
                ("t", DependencyKind::Test),
                ("o", DependencyKind::Optional),
            ],
        )]);
        assert_eq!(g.forward_deps("a", KindFilter::default()), vec!["r", "o"]);
        assert_eq!(
            g.forward_deps("a", KindFilter::default().include_build(true)),
            vec!["r", "b", "o"]
        );
        assert_eq!(
            g.forward_deps(
                "a",
                KindFilter::default().include_build(true).include_test(true)
            ),
            vec!["r", "b", "t", "o"]
        );
    }

    #[test]
    fn parallel_edges_deduplicate_keeping_first_position() {
        let mut r = resolved(
            "a",
            &[
                ("x", DependencyKind::Runtime),
                ("y", DependencyKind::Runtime),
            ],
        );
        r.requirements
            .push(DependencyRequirement::new("a", "x", DependencyKind::Runtime));
        let g = graph(&[r]);
        assert_eq!(g.forward_deps("a", KindFilter::default()), vec!["x", "y"]);
    }

    #[test]
    fn leaves_ignore_test_recommended_and_optional_edges() {
        let g = graph(&[
            resolved("app", &[("lib", DependencyKind::Runtime)]),
            resolved("lib", &[]),
            resolved("checker", &[("app", DependencyKind::Test)]),
            resolved("extra", &[("checker", DependencyKind::Optional)]),
        ]);
        let leaves = g.leaves();
        // lib has an incoming runtime edge; app's only incoming edge is
        // test-kind; checker's is optional-kind.
        assert!(leaves.contains(&"app"));
        assert!(leaves.contains(&"checker"));
        assert!(leaves.contains(&"extra"));
        assert!(!leaves.contains(&"lib"));
    }

    #[test]
    fn missing_reports_gaps_per_installed_formula() {
        let g = graph(&[
            resolved(
                "a",
                &[
                    ("b", DependencyKind::Runtime),
                    ("c", DependencyKind::Runtime),
                ],
            ),
            resolved("b", &[]),
        ]);
        let installed: HashSet<String> = ["a".to_string(), "b".to_string()].into();
        let missing = g.missing(&installed);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing["a"], vec!["c".to_string()]);

        let all: HashSet<String> = ["a", "b", "c"].map(String::from).into();
        assert!(g.missing(&all).is_empty());
    }

    #[test]
    fn transitive_deps_first_seen_order() {
        let g = graph(&[
            resolved(
                "a",
                &[
                    ("b", DependencyKind::Runtime),
                    ("c", DependencyKind::Runtime),
                ],
            ),
            resolved("b", &[("d", DependencyKind::Runtime)]),
            resolved("c", &[("d", DependencyKind::Runtime)]),
            resolved("d", &[]),
        ]);
        assert_eq!(
            g.transitive_deps("a", KindFilter::default()),
            vec!["b", "d", "c"]
        );
        // depth-first from the first dependent: b, then b's dependents, then c
        assert_eq!(g.transitive_dependents("d"), vec!["b", "a", "c"]);
    }

    #[test]
    fn tree_rendering_is_cycle_free_and_ordered() {
        let g = graph(&[
            resolved(
                "top",
                &[
                    ("mid", DependencyKind::Runtime),
                    ("leaf", DependencyKind::Runtime),
                ],
            ),
            resolved("mid", &[("leaf", DependencyKind::Runtime)]),
            resolved("leaf", &[]),
        ]);
        let tree = g.render_tree("top", KindFilter::default());
        let expected = "top\n├─ mid\n│  └─ leaf\n└─ leaf\n";
        assert_eq!(tree, expected);
    }
}
