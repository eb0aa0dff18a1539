//! Lexical highlighting of JSON source text.
//!
//! The scan is a single regex pass with ordered alternatives. It never fails:
//! anything it doesn't recognise, including half-typed garbage, is emitted as
//! an unclassified run, so the spans always cover the whole text.
//!
//! Scans run on the rayon pool. Every submission gets a generation number and
//! the owner only applies the result of the newest one.

use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?P<STRING>"(?:[^"\\]|\\.)*")"#,
        r"|(?P<NUMBER>-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)",
        r"|(?P<BOOLEAN>\b(?:true|false)\b)",
        r"|(?P<NULL>\bnull\b)",
        r"|(?P<BRACE>[{}])",
        r"|(?P<BRACKET>[\[\]])",
        r"|(?P<COLON>:)",
        r"|(?P<COMMA>,)",
    ))
    .expect("token pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Key,
    String,
    Number,
    Boolean,
    Null,
    Brace,
    Bracket,
    Colon,
    Comma,
}

impl TokenClass {
    pub fn style_class(self) -> &'static str {
        match self {
            TokenClass::Key => "json-key",
            TokenClass::String => "json-string",
            TokenClass::Number => "json-number",
            TokenClass::Boolean => "json-boolean",
            TokenClass::Null => "json-null",
            TokenClass::Brace => "json-brace",
            TokenClass::Bracket => "json-bracket",
            TokenClass::Colon => "json-colon",
            TokenClass::Comma => "json-comma",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleSpan {
    pub len: usize,
    pub class: Option<TokenClass>,
}

/// Gap-free run-length styling of a text. Lengths are in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleSpans {
    spans: Vec<StyleSpan>,
    total_len: usize,
}

impl StyleSpans {
    pub fn iter(&self) -> impl Iterator<Item = &StyleSpan> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Length of text covered. Always equals the scanned text's length.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Spans with absolute byte ranges.
    pub fn ranges(&self) -> impl Iterator<Item = (Range<usize>, Option<TokenClass>)> + '_ {
        self.spans.iter().scan(0usize, |start, span| {
            let range = *start..*start + span.len;
            *start = range.end;
            Some((range, span.class))
        })
    }
}

#[derive(Default)]
struct StyleSpansBuilder {
    spans: Vec<StyleSpan>,
    total_len: usize,
}

impl StyleSpansBuilder {
    fn add(&mut self, class: Option<TokenClass>, len: usize) {
        if len == 0 {
            return;
        }
        self.spans.push(StyleSpan { len, class });
        self.total_len += len;
    }

    fn create(self) -> StyleSpans {
        StyleSpans {
            spans: self.spans,
            total_len: self.total_len,
        }
    }
}

pub fn compute_highlighting(text: &str) -> StyleSpans {
    let mut builder = StyleSpansBuilder::default();
    let mut last_end = 0;

    for caps in TOKEN_PATTERN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let class = if caps.name("STRING").is_some() {
            if followed_by_colon(&text[whole.end()..]) {
                TokenClass::Key
            } else {
                TokenClass::String
            }
        } else if caps.name("NUMBER").is_some() {
            TokenClass::Number
        } else if caps.name("BOOLEAN").is_some() {
            TokenClass::Boolean
        } else if caps.name("NULL").is_some() {
            TokenClass::Null
        } else if caps.name("BRACE").is_some() {
            TokenClass::Brace
        } else if caps.name("BRACKET").is_some() {
            TokenClass::Bracket
        } else if caps.name("COLON").is_some() {
            TokenClass::Colon
        } else {
            TokenClass::Comma
        };

        builder.add(None, whole.start() - last_end);
        builder.add(Some(class), whole.len());
        last_end = whole.end();
    }

    builder.add(None, text.len() - last_end);
    builder.create()
}

fn followed_by_colon(rest: &str) -> bool {
    rest.trim_start().starts_with(':')
}

#[derive(Debug, Clone)]
pub struct HighlightResult {
    pub generation: u64,
    pub spans: Arc<StyleSpans>,
}

/// Generation bookkeeping for off-thread scans.
#[derive(Debug, Default)]
pub struct Highlighter {
    submitted: u64,
    applied: u64,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a scan of `text` on the rayon pool and hands the result to
    /// `deliver` from the worker thread. Returns the scan's generation.
    pub fn submit<F>(&mut self, text: String, deliver: F) -> u64
    where
        F: FnOnce(HighlightResult) + Send + 'static,
    {
        self.submitted += 1;
        let generation = self.submitted;
        tracing::debug!(generation, bytes = text.len(), "highlight scan submitted");
        rayon::spawn(move || {
            let spans = Arc::new(compute_highlighting(&text));
            deliver(HighlightResult { generation, spans });
        });
        generation
    }

    /// Whether `result` belongs to the latest submission. Marks it applied if so.
    pub fn accept(&mut self, result: &HighlightResult) -> bool {
        if result.generation != self.submitted {
            tracing::trace!(
                generation = result.generation,
                latest = self.submitted,
                "discarding stale highlight result"
            );
            return false;
        }
        self.applied = result.generation;
        true
    }

    pub fn latest_submitted(&self) -> u64 {
        self.submitted
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<(&str, Option<TokenClass>)> {
        compute_highlighting(text)
            .ranges()
            .map(|(r, c)| (&text[r], c))
            .collect()
    }

    #[test]
    fn classifies_every_token_kind() {
        let text = r#"{"k": "v", "n": 42, "b": true, "x": null}"#;
        let spans = compute_highlighting(text);
        assert_eq!(spans.total_len(), text.len());

        use TokenClass::*;
        let classified: Vec<_> = tokens(text)
            .into_iter()
            .filter(|(_, c)| c.is_some())
            .collect();
        assert_eq!(
            classified,
            vec![
                ("{", Some(Brace)),
                ("\"k\"", Some(Key)),
                (":", Some(Colon)),
                ("\"v\"", Some(String)),
                (",", Some(Comma)),
                ("\"n\"", Some(Key)),
                (":", Some(Colon)),
                ("42", Some(Number)),
                (",", Some(Comma)),
                ("\"b\"", Some(Key)),
                (":", Some(Colon)),
                ("true", Some(Boolean)),
                (",", Some(Comma)),
                ("\"x\"", Some(Key)),
                (":", Some(Colon)),
                ("null", Some(Null)),
                ("}", Some(Brace)),
            ]
        );

        // the only unclassified runs are the spaces
        assert!(tokens(text)
            .iter()
            .filter(|(_, c)| c.is_none())
            .all(|(s, _)| s.trim().is_empty()));
    }

    #[test]
    fn spans_cover_text_without_gaps() {
        let text = "[1.5e-3, -2, \"a\\\"b\" ,\n  false] trailing ~~";
        let spans = compute_highlighting(text);
        let mut expected_start = 0;
        for (range, _) in spans.ranges() {
            assert_eq!(range.start, expected_start);
            assert!(!range.is_empty());
            expected_start = range.end;
        }
        assert_eq!(expected_start, text.len());
    }

    #[test]
    fn tolerates_invalid_json() {
        use TokenClass::*;
        let text = r#"{"a": , "unterminated"#;
        let got = tokens(text);
        assert_eq!(got[0], ("{", Some(Brace)));
        assert_eq!(got[1], ("\"a\"", Some(Key)));
        // the unterminated string and the space before it stay unclassified
        assert_eq!(got.last().unwrap(), &(" \"unterminated", None));
        assert_eq!(compute_highlighting("").len(), 0);
    }

    #[test]
    fn key_detection_skips_whitespace_before_colon() {
        let got = tokens("{\"k\"\n   : 1}");
        assert_eq!(got[1], ("\"k\"", Some(TokenClass::Key)));
        let got = tokens("[\"k\", 1]");
        assert_eq!(got[1], ("\"k\"", Some(TokenClass::String)));
    }

    #[test]
    fn keywords_need_word_boundaries() {
        let got = tokens("nullable truely");
        assert!(got.iter().all(|(_, c)| *c != Some(TokenClass::Null)));
        assert!(got.iter().all(|(_, c)| *c != Some(TokenClass::Boolean)));
    }

    #[test]
    fn only_latest_generation_is_accepted() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut highlighter = Highlighter::new();
        let first = {
            let tx = tx.clone();
            highlighter.submit("[1]".into(), move |r| tx.send(r).unwrap())
        };
        let second = highlighter.submit("[1, 2]".into(), move |r| tx.send(r).unwrap());
        assert!(second > first);

        let mut results: Vec<HighlightResult> = rx.iter().take(2).collect();
        results.sort_by_key(|r| r.generation);
        assert!(!highlighter.accept(&results[0]));
        assert!(highlighter.accept(&results[1]));
        assert_eq!(highlighter.last_applied(), second);
        assert_eq!(results[1].spans.total_len(), "[1, 2]".len());
    }
}
