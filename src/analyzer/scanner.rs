//! Heuristic Code Scanner
//!
//! Best-effort, non-authoritative extraction of function names, class
//! names, and import targets from raw file text. This is intentionally
//! not a parser: the patterns are plain regexes keyed by extension
//! family, false positives are acceptable, and no input — empty, binary,
//! or malformed — ever produces an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Extension families the scanner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// js, jsx, ts, tsx
    Script,
    /// py
    Python,
}

impl Dialect {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "js" | "jsx" | "ts" | "tsx" => Some(Self::Script),
            "py" => Some(Self::Python),
            _ => None,
        }
    }
}

/// Symbols extracted from one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
}

// Named declarations, arrow-style const assignments, object-method
// shorthand, and brace-opening call-like declarations. The union of all
// four over-captures; uniqueness matters, order does not.
static SCRIPT_FUNCTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"function\s+(\w+)\s*\(").unwrap(),
        Regex::new(r"const\s+(\w+)\s*=\s*\(").unwrap(),
        Regex::new(r"(\w+)\s*:\s*function\s*\(").unwrap(),
        Regex::new(r"(\w+)\s*\([^)]*\)\s*\{").unwrap(),
    ]
});

static PYTHON_FUNCTIONS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r"def\s+(\w+)\s*\(").unwrap()]);

static CLASS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"class\s+(\w+)").unwrap());

static SCRIPT_IMPORTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap(),
        Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap(),
    ]
});

static PYTHON_IMPORTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"import\s+(\w+)").unwrap(),
        Regex::new(r"from\s+(\w+)\s+import").unwrap(),
    ]
});

/// Scan file text for functions, classes, and imports.
///
/// Unsupported extensions yield three empty lists.
pub fn scan(content: &str, extension: &str) -> ScanResult {
    let Some(dialect) = Dialect::from_extension(extension) else {
        return ScanResult::default();
    };

    ScanResult {
        functions: capture_unique(content, function_patterns(dialect)),
        classes: capture_unique(content, std::slice::from_ref(&*CLASS_PATTERN)),
        imports: capture_unique(content, import_patterns(dialect)),
    }
}

fn function_patterns(dialect: Dialect) -> &'static [Regex] {
    match dialect {
        Dialect::Script => &SCRIPT_FUNCTIONS,
        Dialect::Python => &PYTHON_FUNCTIONS,
    }
}

fn import_patterns(dialect: Dialect) -> &'static [Regex] {
    match dialect {
        Dialect::Script => &SCRIPT_IMPORTS,
        Dialect::Python => &PYTHON_IMPORTS,
    }
}

/// Union the first capture group of every pattern, deduplicated
fn capture_unique(content: &str, patterns: &[Regex]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for pattern in patterns {
        for capture in pattern.captures_iter(content) {
            if let Some(name) = capture.get(1) {
                seen.insert(name.as_str().to_string());
            }
        }
    }
    seen.into_iter().collect()
}
