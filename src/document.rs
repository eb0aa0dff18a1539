//! Per-document synchronization state.
//!
//! [`DocumentState`] is a plain struct with no UI or runtime attached. The
//! session owns one and calls into it from a single task; tests drive it
//! directly.

use serde_json::Value;
use std::sync::Arc;

use crate::error::{ParseError, SyncError};
use crate::expansion;
use crate::node;
use crate::path::Path;
use crate::resolver;
use crate::search::{self, FilterQuery};
use crate::tree;
use crate::types::{TreeNode, Validity};

pub fn checksum(text: &str) -> u32 {
    crc32fast::hash(text.as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rebuilt,
    Emptied,
    /// Parse failed; the previous tree was kept.
    KeptPrevious,
}

#[derive(Debug)]
pub struct DocumentState {
    saved_checksum: u32,
    dirty: bool,
    tree: Option<Arc<TreeNode>>,
    view: Option<Arc<TreeNode>>,
    filter: FilterQuery,
    validity: Validity,
    refreshes: u64,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            saved_checksum: checksum(""),
            dirty: false,
            tree: None,
            view: None,
            filter: FilterQuery::default(),
            validity: Validity::Empty,
            refreshes: 0,
        }
    }
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for freshly loaded text: parsed, and clean.
    pub fn load(text: &str) -> Self {
        let mut state = Self::new();
        state.refresh(text);
        state.set_saved_checksum(text);
        state
    }

    /// One full refresh cycle against the current text.
    pub fn refresh(&mut self, text: &str) -> RefreshOutcome {
        self.refreshes += 1;
        self.dirty = checksum(text) != self.saved_checksum;

        if text.trim().is_empty() {
            self.tree = None;
            self.view = None;
            self.validity = Validity::Empty;
            tracing::debug!(refresh = self.refreshes, "document is empty");
            return RefreshOutcome::Emptied;
        }

        let parsed: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(err) => {
                let err = ParseError::from(err);
                tracing::debug!(refresh = self.refreshes, %err, "parse failed, keeping previous tree");
                self.validity = Validity::Invalid(err);
                return RefreshOutcome::KeptPrevious;
            }
        };

        let mut rebuilt = tree::build(&parsed);
        if let Some(previous) = &self.tree {
            expansion::restore(&mut rebuilt, &expansion::capture(previous));
        }
        let rebuilt = Arc::new(rebuilt);
        self.view = search::filter(&rebuilt, &self.filter);
        tracing::debug!(
            refresh = self.refreshes,
            nodes = rebuilt.node_count(),
            dirty = self.dirty,
            "tree rebuilt"
        );
        self.tree = Some(rebuilt);
        self.validity = Validity::Valid;
        RefreshOutcome::Rebuilt
    }

    /// Call after a successful save or load of `text`.
    pub fn set_saved_checksum(&mut self, text: &str) {
        self.saved_checksum = checksum(text);
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The unfiltered tree.
    pub fn tree(&self) -> Option<&Arc<TreeNode>> {
        self.tree.as_ref()
    }

    /// What the tree widget should show: the filtered view, or the tree itself.
    pub fn view(&self) -> Option<&Arc<TreeNode>> {
        self.view.as_ref()
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn status_text(&self) -> String {
        self.validity.status_text()
    }

    pub fn status_detail(&self) -> Option<&str> {
        self.validity.detail()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn filter(&self) -> &FilterQuery {
        &self.filter
    }

    pub fn set_filter(&mut self, query: impl Into<FilterQuery>) {
        self.filter = query.into();
        self.view = self
            .tree
            .as_ref()
            .and_then(|tree| search::filter(tree, &self.filter));
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(FilterQuery::default());
    }

    /// Opens or closes one node. Returns false if no node lives at `path`.
    pub fn set_expanded(&mut self, path: &Path, expanded: bool) -> bool {
        let found = self.update_trees(|root| expansion::set_expanded(root, path, expanded));
        found.0 || found.1
    }

    pub fn expand_all(&mut self) {
        self.update_trees(|root| {
            expansion::expand_all(root);
            true
        });
    }

    pub fn collapse_all(&mut self) {
        self.update_trees(|root| {
            expansion::collapse_all(root);
            true
        });
    }

    // Applies `f` to the tree and, when a filter is active, to the view too.
    fn update_trees(&mut self, f: impl Fn(&mut TreeNode) -> bool) -> (bool, bool) {
        if self.filter.is_blank() {
            // drop the view's reference first so make_mut doesn't clone
            self.view = None;
            let in_tree = self.tree.as_mut().is_some_and(|t| f(Arc::make_mut(t)));
            self.view = self.tree.clone();
            return (in_tree, false);
        }
        let in_tree = self.tree.as_mut().is_some_and(|t| f(Arc::make_mut(t)));
        let in_view = self.view.as_mut().is_some_and(|v| f(Arc::make_mut(v)));
        (in_tree, in_view)
    }

    /// Text offset of the node at `path`, if the quoted keys can be found.
    pub fn resolve_selection(&self, text: &str, path: &Path) -> Option<usize> {
        let offset = resolver::resolve(text, path);
        if offset.is_none() {
            tracing::trace!(%path, "selection could not be resolved");
        }
        offset
    }

    pub fn format(&self, text: &str, indent: usize) -> Result<String, SyncError> {
        node::format_json(text, indent)
    }

    fn root(&self) -> Result<&TreeNode, SyncError> {
        self.tree.as_deref().ok_or(SyncError::NoDocument)
    }

    pub fn node_key(&self, path: &Path) -> Result<String, SyncError> {
        node::node_key(self.root()?, path)
    }

    pub fn node_value(&self, path: &Path) -> Result<Option<String>, SyncError> {
        node::node_value(self.root()?, path)
    }

    pub fn node_json_path(&self, path: &Path) -> Result<String, SyncError> {
        node::node_json_path(self.root()?, path)
    }

    pub fn node_json(&self, path: &Path, indent: usize) -> Result<String, SyncError> {
        node::node_json(self.root()?, path, indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::find;

    #[test]
    fn load_is_clean_and_valid() {
        let doc = DocumentState::load(r#"{"a": 1}"#);
        assert!(!doc.is_dirty());
        assert_eq!(doc.validity(), &Validity::Valid);
        assert_eq!(doc.status_text(), "Valid JSON");
        assert!(Arc::ptr_eq(doc.tree().unwrap(), doc.view().unwrap()));
    }

    #[test]
    fn numbers_keep_their_source_text() {
        let doc = DocumentState::load(r#"{"big": 1e400, "id": 123456789012345678901234567890}"#);
        assert_eq!(doc.validity(), &Validity::Valid);

        let root = doc.tree().unwrap();
        let big = find(root, &Path::parse("root.big")).unwrap();
        assert_eq!(big.value.as_deref(), Some("1e400"));
        let id = find(root, &Path::parse("root.id")).unwrap();
        assert_eq!(id.value.as_deref(), Some("123456789012345678901234567890"));

        let round_trip = crate::tree::to_value(root);
        let source: serde_json::Value =
            serde_json::from_str(r#"{"big": 1e400, "id": 123456789012345678901234567890}"#).unwrap();
        assert_eq!(round_trip, source);
    }

    #[test]
    fn dirty_tracks_checksum_not_history() {
        let saved = r#"{"a": 1}"#;
        let mut doc = DocumentState::load(saved);

        doc.refresh(r#"{"a": 2}"#);
        assert!(doc.is_dirty());

        doc.refresh(saved);
        assert!(!doc.is_dirty());

        doc.refresh(r#"{"a": 3}"#);
        doc.set_saved_checksum(r#"{"a": 3}"#);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn invalid_text_keeps_previous_tree_and_expansion() {
        let mut doc = DocumentState::load(r#"{"a": {"b": 1}}"#);
        assert!(doc.set_expanded(&Path::parse("root.a"), true));
        let before = Arc::clone(doc.tree().unwrap());

        let outcome = doc.refresh(r#"{"a": }"#);
        assert_eq!(outcome, RefreshOutcome::KeptPrevious);
        assert!(Arc::ptr_eq(doc.tree().unwrap(), &before));
        assert!(doc.is_dirty());

        match doc.validity() {
            Validity::Invalid(err) => {
                let loc = err.location.unwrap();
                assert_eq!((loc.line, loc.column), (1, 7));
            }
            other => panic!("expected invalid, got {other:?}"),
        }
        assert!(doc.status_text().starts_with("Invalid JSON at line 1, column 7"));
        assert!(doc.status_detail().is_some());
    }

    #[test]
    fn rebuild_restores_expansion_by_path() {
        let mut doc = DocumentState::load(r#"{"a": {"b": [1]}}"#);
        doc.set_expanded(&Path::root(), true);
        doc.set_expanded(&Path::parse("root.a.b"), true);

        doc.refresh(r#"{"z": 0, "a": {"b": [1, 2]}}"#);
        let tree = doc.tree().unwrap();
        assert!(tree.expanded);
        assert!(find(tree, &Path::parse("root.a.b")).unwrap().expanded);
        assert!(!find(tree, &Path::parse("root.a")).unwrap().expanded);
    }

    #[test]
    fn blank_text_is_an_empty_document() {
        let mut doc = DocumentState::load("[1]");
        assert_eq!(doc.refresh("  \n"), RefreshOutcome::Emptied);
        assert!(doc.tree().is_none());
        assert_eq!(doc.validity(), &Validity::Empty);
        assert!(doc.validity().is_valid());
    }

    #[test]
    fn filter_is_reapplied_and_cleared_by_reference() {
        let mut doc = DocumentState::load(r#"{"alpha": 1, "beta": 2}"#);
        doc.set_filter("alp");
        let view = doc.view().unwrap();
        assert_eq!(view.children.len(), 1);
        assert!(!Arc::ptr_eq(view, doc.tree().unwrap()));

        doc.refresh(r#"{"alpha": 1, "beta": 2, "alps": 3}"#);
        assert_eq!(doc.view().unwrap().children.len(), 2);

        // containers force-opened by the filter stay closed in the tree
        assert!(!doc.tree().unwrap().expanded);

        doc.set_filter("nothing");
        assert!(doc.view().is_none());

        doc.clear_filter();
        assert!(Arc::ptr_eq(doc.view().unwrap(), doc.tree().unwrap()));
    }

    #[test]
    fn expand_all_mirrors_into_unfiltered_view() {
        let mut doc = DocumentState::load(r#"{"a": {"b": {}}}"#);
        doc.expand_all();
        assert!(Arc::ptr_eq(doc.view().unwrap(), doc.tree().unwrap()));
        assert!(find(doc.view().unwrap(), &Path::parse("root.a.b")).unwrap().expanded);
        doc.collapse_all();
        assert!(!doc.view().unwrap().expanded);
    }

    #[test]
    fn node_actions_need_a_document() {
        let doc = DocumentState::new();
        assert!(matches!(doc.node_key(&Path::root()), Err(SyncError::NoDocument)));

        let doc = DocumentState::load(r#"{"a": [1]}"#);
        assert_eq!(doc.node_json(&Path::parse("root.a"), 4).unwrap(), "[\n    1\n]");
        assert_eq!(doc.resolve_selection(r#"{"a": [1]}"#, &Path::parse("root.a")), Some(6));
        assert_eq!(doc.resolve_selection("{}", &Path::parse("root.a")), None);
    }
}
