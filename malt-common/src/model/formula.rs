// malt-common/src/model/formula.rs
//! The parsed form of one formula document: an ordered tree of
//! directives. Order and nesting are preserved exactly as declared;
//! nothing here is evaluated until a resolver walks it against a
//! platform descriptor.

use serde::{Deserialize, Serialize};

use crate::dependency::definition::DependencyTag;
use crate::dependency::expr::{BlockPredicate, Guard};
use crate::dependency::requirement::Requirement;
use crate::model::version::MacOSVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// `depends_on "target" [=> tags] [if guard]`
    DependsOn {
        target: String,
        tags: DependencyTag,
        options: Vec<String>,
        guard: Option<Guard>,
    },
    /// `uses_from_macos "target" [=> tags] [, since: :version]`
    UsesFromMacos {
        target: String,
        tags: DependencyTag,
        since: Option<MacOSVersion>,
    },
    /// `on_... do ... end`
    OnBlock {
        predicate: BlockPredicate,
        body: Vec<Directive>,
    },
    /// `option "name", "description"`
    Option { name: String, description: String },
    /// `depends_on :macos`, `depends_on arch: :arm64`, ...
    Requires(Requirement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDefinition {
    pub name: String,
    pub directives: Vec<Directive>,
}

impl FormulaDefinition {
    pub fn new(name: impl Into<String>, directives: Vec<Directive>) -> Self {
        Self {
            name: name.into(),
            directives,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared build options, in declaration order (nested ones included).
    pub fn options(&self) -> Vec<(&str, &str)> {
        fn walk<'a>(directives: &'a [Directive], out: &mut Vec<(&'a str, &'a str)>) {
            for d in directives {
                match d {
                    Directive::Option { name, description } => {
                        out.push((name.as_str(), description.as_str()))
                    }
                    Directive::OnBlock { body, .. } => walk(body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.directives, &mut out);
        out
    }
}
