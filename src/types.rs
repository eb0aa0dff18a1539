use serde::Serialize;

use crate::error::ParseError;
use crate::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeType {
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Object | NodeType::Array)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub key: String,            // member name, `[i]` for array elements, `root` at the top
    pub value: Option<String>,  // display text for scalars, None for containers
    pub node_type: NodeType,
    pub path: Path,
    pub children: Vec<TreeNode>,
    pub expanded: bool,         // UI open state, only meaningful for containers
}

impl TreeNode {
    pub fn is_container(&self) -> bool {
        self.node_type.is_container()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Outcome of the last parse, as shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Validity {
    Valid,
    Empty,
    Invalid(ParseError),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Validity::Invalid(_))
    }

    pub fn status_text(&self) -> String {
        match self {
            Validity::Valid => "Valid JSON".into(),
            Validity::Empty => "Empty document".into(),
            Validity::Invalid(err) => match err.location {
                Some(loc) => format!("Invalid JSON at line {}, column {}", loc.line, loc.column),
                None => "Invalid JSON".into(),
            },
        }
    }

    /// Full parser message, for a tooltip.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Validity::Invalid(err) => Some(&err.message),
            Validity::Valid | Validity::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Location;

    #[test]
    fn status_text_mentions_location() {
        let invalid = Validity::Invalid(ParseError {
            message: "expected value at line 1 column 7".into(),
            location: Some(Location { line: 1, column: 7 }),
        });
        assert_eq!(invalid.status_text(), "Invalid JSON at line 1, column 7");
        assert!(!invalid.is_valid());
        assert_eq!(invalid.detail(), Some("expected value at line 1 column 7"));

        let unlocated = Validity::Invalid(ParseError {
            message: "eof".into(),
            location: None,
        });
        assert_eq!(unlocated.status_text(), "Invalid JSON");
        assert_eq!(Validity::Valid.status_text(), "Valid JSON");
    }
}
