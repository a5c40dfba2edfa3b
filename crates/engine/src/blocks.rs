//! Key classifiers for directive blocks.
//!
//! Each mapping key is labelled once per node; the transformer then reads
//! labels instead of re-probing regexes per handler. Patterns are anchored at
//! the start of the key and whitespace-tolerant, exactly as the canonical
//! surface syntax shows — no stricter.

use regex::Regex;
use std::sync::LazyLock;

static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{%\s*assign\s*%\}").expect("assign pattern"));

static MERGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{%\s*merge\s*%\}").expect("merge pattern"));

static ELSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{%\s*else\s*%\}").expect("else pattern"));

static IF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{%\s*if\s+(.+?)\s*%\}").expect("if pattern"));

static FOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{%\s*for\s+(?:(\w+?)\s*,\s*)?(\w+?)\s+in\s+(.+?)\s*%\}").expect("for pattern")
});

static CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\s*(.+?)\s*\}\}").expect("context pattern"));

/// A directive key's parsed meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Assign,
    Merge,
    Else,
    If {
        condition: String,
    },
    For {
        index: Option<String>,
        item: String,
        expression: String,
    },
    /// A `{{ expr }}` key: the context block.
    ContextExpr {
        expression: String,
    },
}

/// Labels a mapping key; non-directive keys return `None`.
pub(crate) fn classify(key: &str) -> Option<BlockKind> {
    if ASSIGN_RE.is_match(key) {
        return Some(BlockKind::Assign);
    }
    if MERGE_RE.is_match(key) {
        return Some(BlockKind::Merge);
    }
    if ELSE_RE.is_match(key) {
        return Some(BlockKind::Else);
    }
    if let Some(captures) = IF_RE.captures(key) {
        return Some(BlockKind::If {
            condition: captures[1].to_string(),
        });
    }
    if let Some(captures) = FOR_RE.captures(key) {
        return Some(BlockKind::For {
            index: captures.get(1).map(|m| m.as_str().to_string()),
            item: captures[2].to_string(),
            expression: captures[3].to_string(),
        });
    }
    if let Some(captures) = CONTEXT_RE.captures(key) {
        return Some(BlockKind::ContextExpr {
            expression: captures[1].to_string(),
        });
    }
    None
}
