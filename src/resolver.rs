//! Maps a tree path back to a position in the source text.
//!
//! This is a best-effort sequential search, not a JSON-aware locator: each
//! key of the path is looked up as a quoted string starting where the previous
//! one ended. A key that also appears verbatim earlier in the text (say, as a
//! sibling's string value) will be matched there instead.

use crate::path::Path;

/// Byte offset of the node at `path`, or `None` when some key can't be found.
///
/// Root and array-index segments are skipped. After the last key the offset
/// is advanced over the `:` and whitespace so it lands on the value.
pub fn resolve(text: &str, path: &Path) -> Option<usize> {
    let mut cursor = 0;
    let mut matched_key = false;

    for segment in path.segments() {
        let Some(key) = segment.as_key() else { continue };
        let needle = quoted(key);
        let found = text[cursor..].find(&needle)?;
        cursor += found + needle.len();
        matched_key = true;
    }

    if matched_key {
        cursor = skip_to_value(text, cursor);
    }
    Some(cursor)
}

// The key as it appears between quotes in JSON source.
fn quoted(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""))
}

fn skip_to_value(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    let after_ws = rest.trim_start();
    match after_ws.strip_prefix(':') {
        Some(value) => text.len() - value.trim_start().len(),
        None => from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lands_on_nested_value() {
        let text = r#"{"a":{"b":1}}"#;
        let offset = resolve(text, &Path::parse("root.a.b")).unwrap();
        assert_eq!(offset, 10);
        assert_eq!(&text[offset..offset + 1], "1");
    }

    #[test]
    fn skips_whitespace_around_colon() {
        let text = "{\n    \"name\" :   \"x\"\n}";
        let offset = resolve(text, &Path::parse("root.name")).unwrap();
        assert!(text[offset..].starts_with("\"x\""));
    }

    #[test]
    fn root_and_indices_contribute_nothing() {
        let text = r#"[{"a": 1}, {"a": 2}]"#;
        assert_eq!(resolve(text, &Path::root()), Some(0));
        // index segments are ignored, so the first "a" wins
        let offset = resolve(text, &Path::parse("root.[1].a")).unwrap();
        assert_eq!(&text[offset..offset + 1], "1");
    }

    #[test]
    fn missing_key_fails() {
        assert_eq!(resolve(r#"{"a": {"b": 1}}"#, &Path::parse("root.a.c")), None);
        // cursor only moves forward: "a" can't be found after "b"
        assert_eq!(resolve(r#"{"a": 1, "b": 2}"#, &Path::parse("root.b.a")), None);
    }

    #[test]
    fn duplicated_key_text_matches_earliest_occurrence() {
        let text = r#"{"x": "b", "b": 1}"#;
        let offset = resolve(text, &Path::parse("root.b")).unwrap();
        // lands after the string value "b", not on the real member
        assert_eq!(offset, r#"{"x": "b""#.len());
    }

    #[test]
    fn escaped_keys_are_searched_in_source_form() {
        let text = r#"{"say \"hi\"": true}"#;
        let offset = resolve(text, &Path::root().key("say \"hi\"")).unwrap();
        assert!(text[offset..].starts_with("true"));
    }
}
