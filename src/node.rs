use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use crate::error::SyncError;
use crate::path::Path;
use crate::tree::{find, to_value};
use crate::types::TreeNode;

// Pretty-print with `indent` spaces per level.
pub fn to_pretty_string(value: &Value, indent: usize) -> Result<String, SyncError> {
    let indent = " ".repeat(indent);
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser).map_err(SyncError::Serialize)?;
    // serde_json only ever writes valid UTF-8
    String::from_utf8(out).map_err(|e| SyncError::Serialize(serde::ser::Error::custom(e)))
}

/// Reformats a whole document.
pub fn format_json(text: &str, indent: usize) -> Result<String, SyncError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SyncError::Parse(e.into()))?;
    to_pretty_string(&value, indent)
}

fn lookup<'a>(root: &'a TreeNode, pointer: &Path) -> Result<&'a TreeNode, SyncError> {
    find(root, pointer).ok_or_else(|| SyncError::UnknownPath(pointer.to_string()))
}

pub fn node_key(root: &TreeNode, pointer: &Path) -> Result<String, SyncError> {
    Ok(lookup(root, pointer)?.key.clone())
}

// Scalars give their display text; containers have no value of their own.
pub fn node_value(root: &TreeNode, pointer: &Path) -> Result<Option<String>, SyncError> {
    Ok(lookup(root, pointer)?.value.clone())
}

pub fn node_json_path(root: &TreeNode, pointer: &Path) -> Result<String, SyncError> {
    Ok(lookup(root, pointer)?.path.to_json_path())
}

/// The subtree at `pointer` serialized back to pretty JSON.
pub fn node_json(root: &TreeNode, pointer: &Path, indent: usize) -> Result<String, SyncError> {
    let node = lookup(root, pointer)?;
    to_pretty_string(&to_value(node), indent)
}
