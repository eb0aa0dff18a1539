use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::types::TreeNode;

/// What the filter box asks for. The default is a case-insensitive substring match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub term: String,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub regex: bool,
}

impl FilterQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.term.trim().is_empty()
    }
}

impl From<&str> for FilterQuery {
    fn from(term: &str) -> Self {
        Self::new(term)
    }
}

// Query compiled once per filter pass.
struct Matcher {
    needle: String,
    re: Option<Regex>,
    case_sensitive: bool,
    whole_word: bool,
    broken: bool,
}

impl Matcher {
    fn new(query: &FilterQuery) -> Self {
        let needle = if query.case_sensitive {
            query.term.clone()
        } else {
            query.term.to_lowercase()
        };
        let (re, broken) = if query.regex {
            match RegexBuilder::new(&query.term)
                .case_insensitive(!query.case_sensitive)
                .build()
            {
                Ok(re) => (Some(re), false),
                Err(err) => {
                    tracing::warn!(term = %query.term, %err, "invalid filter regex, matching nothing");
                    (None, true)
                }
            }
        } else {
            (None, false)
        };
        Self {
            needle,
            re,
            case_sensitive: query.case_sensitive,
            whole_word: query.whole_word,
            broken,
        }
    }

    fn matches(&self, text: &str) -> bool {
        if self.broken {
            return false;
        }
        if let Some(re) = &self.re {
            return re.is_match(text);
        }
        let owned;
        let text = if self.case_sensitive {
            text
        } else {
            owned = text.to_lowercase();
            &owned
        };
        text_matches(text, &self.needle, self.whole_word)
    }

    // The root's key is synthetic, so only its children can make it match.
    fn matches_node(&self, node: &TreeNode) -> bool {
        (!node.path.is_root() && self.matches(&node.key))
            || node.value.as_deref().is_some_and(|v| self.matches(v))
    }
}

// `text` and `query` are expected to be case-normalized already.
pub fn text_matches(text: &str, query: &str, whole_word: bool) -> bool {
    if whole_word {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|word| word == query)
    } else {
        text.contains(query)
    }
}

/// Prunes the tree down to matching nodes and their ancestors.
///
/// A blank term returns the same `Arc`. Otherwise a fresh tree is built and
/// the source is left untouched; `None` means not even the root survived.
pub fn filter(tree: &Arc<TreeNode>, query: &FilterQuery) -> Option<Arc<TreeNode>> {
    if query.is_blank() {
        return Some(Arc::clone(tree));
    }
    let matcher = Matcher::new(query);
    filter_node(tree, &matcher).map(Arc::new)
}

fn filter_node(node: &TreeNode, matcher: &Matcher) -> Option<TreeNode> {
    let children: Vec<TreeNode> = node
        .children
        .iter()
        .filter_map(|child| filter_node(child, matcher))
        .collect();

    if children.is_empty() && !matcher.matches_node(node) {
        return None;
    }

    Some(TreeNode {
        key: node.key.clone(),
        value: node.value.clone(),
        node_type: node.node_type,
        path: node.path.clone(),
        expanded: node.is_container(),
        children,
    })
}
