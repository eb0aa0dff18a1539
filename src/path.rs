//! Structural addresses into a JSON tree.
//!
//! A [`Path`] shares its parent through an `Arc`, so building a child never
//! copies the chain above it. Equality and hashing walk the segments, which
//! makes two paths built from unrelated trees compare equal when they address
//! the same location. That is what lets expansion and selection survive a
//! full rebuild of the tree.

use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Synthetic key of the root node. Never a literal JSON key.
pub const ROOT_KEY: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Root,
    Key(String),
    Index(usize),
}

impl Segment {
    /// Whether the segment names a literal object member.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Root | Segment::Index(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Root => f.write_str(ROOT_KEY),
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

#[derive(Debug)]
struct Link {
    parent: Option<Path>,
    segment: Segment,
    depth: usize,
}

#[derive(Debug, Clone)]
pub struct Path(Arc<Link>);

impl Path {
    pub fn root() -> Self {
        Path(Arc::new(Link {
            parent: None,
            segment: Segment::Root,
            depth: 1,
        }))
    }

    pub fn child(&self, segment: Segment) -> Self {
        Path(Arc::new(Link {
            parent: Some(self.clone()),
            segment,
            depth: self.0.depth + 1,
        }))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    pub fn parent(&self) -> Option<&Path> {
        self.0.parent.as_ref()
    }

    pub fn segment(&self) -> &Segment {
        &self.0.segment
    }

    pub fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none() && self.0.segment == Segment::Root
    }

    /// Segments from the root down to this path.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::with_capacity(self.0.depth);
        let mut cursor = Some(self);
        while let Some(p) = cursor {
            out.push(&p.0.segment);
            cursor = p.0.parent.as_ref();
        }
        out.reverse();
        out
    }

    /// Parses the dotted display form, e.g. `root.items.[2].name`.
    ///
    /// A leading `root` is optional. Empty input is the root path. Inside a
    /// key, `\.` is a literal dot and `\\` a backslash; a key that starts
    /// with `\[` is never read as an index. This is the inverse of `Display`.
    pub fn parse(raw: &str) -> Path {
        let mut path = Path::root();
        if raw.is_empty() {
            return path;
        }
        let mut parts = split_dotted(raw).into_iter().peekable();
        if parts.peek().is_some_and(|(part, escaped)| !escaped && part == ROOT_KEY) {
            parts.next();
        }
        for (part, escaped) in parts {
            let index = part
                .strip_prefix('[')
                .and_then(|p| p.strip_suffix(']'))
                .and_then(|p| p.parse::<usize>().ok())
                .filter(|_| !escaped);
            path = match index {
                Some(i) => path.index(i),
                None => path.key(part),
            };
        }
        path
    }

    /// JSONPath rendering, e.g. `$.items[2]['odd key']`.
    pub fn to_json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in self.segments() {
            match segment {
                Segment::Root => {}
                Segment::Index(i) => out.push_str(&format!("[{i}]")),
                Segment::Key(k) if is_identifier(k) => {
                    out.push('.');
                    out.push_str(k);
                }
                Segment::Key(k) => {
                    out.push_str("['");
                    out.push_str(&k.replace('\\', "\\\\").replace('\'', "\\'"));
                    out.push_str("']");
                }
            }
        }
        out
    }
}

// Splits on unescaped dots. The flag marks parts whose first char was escaped.
fn split_dotted(raw: &str) -> Vec<(String, bool)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped_start = false;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if current.is_empty() {
                    escaped_start = true;
                }
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '.' => {
                parts.push((std::mem::take(&mut current), escaped_start));
                escaped_start = false;
            }
            c => current.push(c),
        }
    }
    parts.push((current, escaped_start));
    parts
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if key.starts_with('[') || key == ROOT_KEY {
        f.write_str("\\")?;
    }
    for c in key.chars() {
        if c == '.' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.depth != other.0.depth {
            return false;
        }
        let (mut a, mut b) = (Some(self), Some(other));
        while let (Some(x), Some(y)) = (a, b) {
            if Arc::ptr_eq(&x.0, &y.0) {
                return true;
            }
            if x.0.segment != y.0.segment {
                return false;
            }
            a = x.0.parent.as_ref();
            b = y.0.parent.as_ref();
        }
        a.is_none() && b.is_none()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.depth.hash(state);
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().into_iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                Segment::Key(k) => write_key(f, k)?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
