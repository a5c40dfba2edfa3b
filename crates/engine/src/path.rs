//! Node addresses used in error messages.

use itertools::Itertools;
use std::fmt;

/// A single step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// The distinguished root token. It gives the top-level template (which
    /// is not itself inside a key) a stable address, and is elided from
    /// rendered paths.
    Root,
    Key(String),
    Index(usize),
}

/// The location of a template node.
///
/// Carried through recursion solely for error reporting; it never influences
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(vec![PathStep::Root])
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Key(key.to_string()));
        NodePath(steps)
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        NodePath(steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .filter_map(|step| match step {
                PathStep::Root => None,
                PathStep::Key(key) => Some(key.clone()),
                PathStep::Index(index) => Some(index.to_string()),
            })
            .join(".");
        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_elides_root_and_joins_with_dots() {
        let path = NodePath::root().child_key("result").child_index(2).child_key("key");
        assert_eq!(path.to_string(), "result.2.key");
        assert_eq!(NodePath::root().to_string(), "");
    }
}
