use serde_json::{Map, Number, Value};

use crate::path::{Path, Segment, ROOT_KEY};
use crate::types::{NodeType, TreeNode};

pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…", &s[..cut]),
    }
}

// Display text for a scalar. Containers have none.
pub fn display_value(v: &Value) -> Option<String> {
    match v {
        Value::Object(_) | Value::Array(_) => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".into()),
    }
}

pub fn node_type(v: &Value) -> NodeType {
    match v {
        Value::Object(_) => NodeType::Object,
        Value::Array(_) => NodeType::Array,
        Value::String(_) => NodeType::String,
        Value::Number(_) => NodeType::Number,
        Value::Bool(_) => NodeType::Boolean,
        Value::Null => NodeType::Null,
    }
}

/// Builds the node hierarchy for a parsed document. The root is keyed `root`.
pub fn build(root: &Value) -> TreeNode {
    build_node(ROOT_KEY.to_string(), Path::root(), root)
}

fn build_node(key: String, path: Path, v: &Value) -> TreeNode {
    let children = match v {
        Value::Object(map) => map
            .iter()
            .map(|(k, child)| build_node(k.clone(), path.key(k.as_str()), child))
            .collect(),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, child)| build_node(format!("[{i}]"), path.index(i), child))
            .collect(),
        _ => Vec::new(),
    };

    TreeNode {
        key,
        value: display_value(v),
        node_type: node_type(v),
        path,
        children,
        expanded: false,
    }
}

/// Reconstructs the JSON value a tree was built from.
///
/// Object member names come from the child paths, not the display keys, so
/// this also works on filtered views.
pub fn to_value(node: &TreeNode) -> Value {
    match node.node_type {
        NodeType::Object => {
            let mut map = Map::with_capacity(node.children.len());
            for child in &node.children {
                let name = match child.path.segment() {
                    Segment::Key(k) => k.clone(),
                    _ => child.key.clone(),
                };
                map.insert(name, to_value(child));
            }
            Value::Object(map)
        }
        NodeType::Array => Value::Array(node.children.iter().map(to_value).collect()),
        NodeType::String => Value::String(node.value.clone().unwrap_or_default()),
        NodeType::Number => node
            .value
            .as_deref()
            .and_then(|n| n.parse::<Number>().ok())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        NodeType::Boolean => Value::Bool(node.value.as_deref() == Some("true")),
        NodeType::Null => Value::Null,
    }
}

/// Locates the node at `path` by walking its segments from the root.
pub fn find<'a>(root: &'a TreeNode, path: &Path) -> Option<&'a TreeNode> {
    let mut segments = path.segments().into_iter();
    if segments.next()? != root.path.segment() {
        return None;
    }
    let mut node = root;
    for segment in segments {
        node = node.children.iter().find(|c| c.path.segment() == segment)?;
    }
    Some(node)
}

pub fn find_mut<'a>(root: &'a mut TreeNode, path: &Path) -> Option<&'a mut TreeNode> {
    let mut segments = path.segments().into_iter();
    if segments.next()? != root.path.segment() {
        return None;
    }
    let mut node = root;
    for segment in segments {
        node = node.children.iter_mut().find(|c| c.path.segment() == segment)?;
    }
    Some(node)
}

/// One-line rendering of a node as shown in the tree widget.
pub fn label(node: &TreeNode, preview_limit: usize) -> String {
    let value = node.value.as_deref().unwrap_or("null");
    match node.node_type {
        NodeType::Object => format!("{} {{ }}", node.key),
        NodeType::Array => format!("{} [ ]", node.key),
        NodeType::String => format!("{} : \"{}\"", node.key, truncate(value, preview_limit)),
        NodeType::Number | NodeType::Boolean | NodeType::Null => format!("{} : {}", node.key, value),
    }
}

/// Visible lines of the tree: a node's children are listed only when it is expanded.
pub fn visible_lines(root: &TreeNode, preview_limit: usize) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        out.push((depth, label(node, preview_limit)));
        if node.expanded {
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }
    out
}
