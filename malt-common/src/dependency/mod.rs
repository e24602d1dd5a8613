// malt-common/src/dependency/mod.rs
pub mod definition;
pub mod expr;
pub mod graph;
pub mod requirement;
pub mod resolver;

pub use definition::{DependencyKind, DependencyTag};
pub use expr::{BlockPredicate, Guard, SystemClause, VersionModifier};
pub use graph::{DependencyGraph, DependencyGraphBuilder, KindFilter};
pub use requirement::{DependencyRequirement, Requirement};
pub use resolver::{DependencyListResolver, ResolvedFormula};
