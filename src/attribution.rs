//! Normalization of spawned-task attribution hints.
//!
//! A hint is the raw value of the [`SPAWN_CALLER_KEY`] extra. It is
//! reconciled with the source analyzer into `file:function:line`, or the
//! most precise degraded form available.

use crate::analyzer::SourceAnalyzer;
use crate::args::Extras;
use crate::caller::basename;
use crate::spawn::SPAWN_CALLER_KEY;

/// Internal extra recording `file:line` of the log invocation. Never
/// emitted.
pub const CALLSITE_KEY: &str = "__callsite";

/// Shape of a raw attribution value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionHint<'a> {
    /// `file:function:line`, already normalized.
    Qualified { file: &'a str, function: &'a str, line: usize },
    /// `path:line`
    FileLine { path: &'a str, line: usize },
    /// `path:function`
    FileFunction { path: &'a str, function: &'a str },
    /// No colon at all.
    Label(&'a str),
}

impl<'a> AttributionHint<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let Some((head, tail)) = raw.rsplit_once(':') else {
            return AttributionHint::Label(raw);
        };
        match tail.trim().parse::<usize>() {
            Ok(line) => match head.rsplit_once(':') {
                Some((file, function)) if is_identifier(function) => {
                    AttributionHint::Qualified { file, function, line }
                }
                _ => AttributionHint::FileLine { path: head, line },
            },
            Err(_) => AttributionHint::FileFunction { path: head, function: tail },
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Normalize one hint.
///
/// `callsite` is the `file:line` of the log invocation, used to supply a
/// line when only a function name is known.
pub fn normalize_hint(raw: &str, callsite: Option<&str>, analyzer: &SourceAnalyzer) -> String {
    match AttributionHint::parse(raw) {
        AttributionHint::Qualified { file, function, line } => {
            format!("{}:{}:{}", basename(file), function, line)
        }
        AttributionHint::FileLine { path, line } => match analyzer.function_enclosing_line(path, line) {
            Some(function) => format!("{}:{}:{}", basename(path), function, line),
            // keep the path when its basename would resolve to another file
            None if shadowed(path, |name| analyzer.function_enclosing_line(name, line).is_some()) => {
                format!("{}:{}", path, line)
            }
            None => format!("{}:{}", basename(path), line),
        },
        AttributionHint::FileFunction { path, function } => {
            let line = analyzer
                .first_log_call_line_in_function(path, function)
                .or_else(|| callsite.and_then(callsite_line));
            match line {
                Some(line) => format!("{}:{}:{}", basename(path), function, line),
                None if shadowed(path, |name| analyzer.first_log_call_line_in_function(name, function).is_some()) => {
                    format!("{}:{}", path, function)
                }
                None => format!("{}:{}", basename(path), function),
            }
        }
        AttributionHint::Label(label) => basename(label).to_string(),
    }
}

/// A path with directories whose basename alone resolves differently.
fn shadowed(path: &str, resolves: impl FnOnce(&str) -> bool) -> bool {
    let name = basename(path);
    name != path && resolves(name)
}

fn callsite_line(callsite: &str) -> Option<usize> {
    callsite.rsplit_once(':').and_then(|(_, line)| line.parse().ok())
}

/// Resolve the spawned-task attribution of a call.
///
/// Returns `None` when no hint is present. Otherwise the normalized value
/// replaces the hint in `extras`. The internal callsite key is left for
/// the caller to strip.
pub fn normalize_attribution(extras: &mut Extras, analyzer: &SourceAnalyzer) -> Option<String> {
    let raw = extras.get(SPAWN_CALLER_KEY)?.to_string();
    let normalized = normalize_hint(&raw, extras.get(CALLSITE_KEY), analyzer);
    extras.set(SPAWN_CALLER_KEY, normalized.clone());
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SOURCE: &str = "fn main() {\n    let x = 1;\n    log.info(\"started\");\n}\n\nfn idle() {\n}\n";

    fn analyzer() -> (tempfile::TempDir, SourceAnalyzer) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("main.rs"), SOURCE).unwrap();
        let analyzer = SourceAnalyzer::new(dir.path());
        (dir, analyzer)
    }

    #[test]
    fn hint_shapes() {
        assert_eq!(
            AttributionHint::parse("main.rs:main:12"),
            AttributionHint::Qualified { file: "main.rs", function: "main", line: 12 }
        );
        assert_eq!(
            AttributionHint::parse("src/main.rs:12"),
            AttributionHint::FileLine { path: "src/main.rs", line: 12 }
        );
        assert_eq!(
            AttributionHint::parse("C:\\app\\main.rs:7"),
            AttributionHint::FileLine { path: "C:\\app\\main.rs", line: 7 }
        );
        assert_eq!(
            AttributionHint::parse("main.rs:main"),
            AttributionHint::FileFunction { path: "main.rs", function: "main" }
        );
        assert_eq!(AttributionHint::parse("worker"), AttributionHint::Label("worker"));
    }

    #[test]
    fn file_line_gains_function() {
        let (_dir, analyzer) = analyzer();
        assert_eq!(normalize_hint("src/main.rs:2", None, &analyzer), "main.rs:main:2");
        assert_eq!(normalize_hint("src/main.rs:5", None, &analyzer), "main.rs:5");
    }

    #[test]
    fn file_function_gains_line() {
        let (_dir, analyzer) = analyzer();
        assert_eq!(normalize_hint("main.rs:main", None, &analyzer), "main.rs:main:3");
        assert_eq!(normalize_hint("main.rs:idle", Some("src/main.rs:42"), &analyzer), "main.rs:idle:42");
        assert_eq!(normalize_hint("main.rs:idle", None, &analyzer), "main.rs:idle");
    }

    #[test]
    fn labels_keep_basename() {
        let (_dir, analyzer) = analyzer();
        assert_eq!(normalize_hint("jobs/worker", None, &analyzer), "worker");
    }

    #[test]
    fn normalization_is_idempotent() {
        let (_dir, analyzer) = analyzer();
        for raw in ["src/main.rs:2", "main.rs:main", "main.rs:idle", "src/main.rs:5", "worker"] {
            let once = normalize_hint(raw, Some("src/main.rs:9"), &analyzer);
            let twice = normalize_hint(&once, Some("src/main.rs:9"), &analyzer);
            assert_eq!(once, twice, "hint {raw}");
        }
    }

    #[test]
    fn degraded_hints_stay_stable_with_duplicate_basenames() {
        let dir = tempfile::tempdir().unwrap();
        let sources = [("src", "fn main() {\n}\n"), ("examples", "\n\n\nfn other() {\n    log.info(\"x\");\n}\n")];
        for (sub, source) in sources {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("main.rs"), source).unwrap();
        }
        let analyzer = SourceAnalyzer::new(dir.path());

        assert_eq!(normalize_hint("src/main.rs:5", None, &analyzer), "src/main.rs:5");
        assert_eq!(normalize_hint("src/main.rs:other", None, &analyzer), "src/main.rs:other");
        for raw in ["src/main.rs:5", "src/main.rs:1", "src/main.rs:other", "main.rs:5"] {
            let once = normalize_hint(raw, None, &analyzer);
            let twice = normalize_hint(&once, None, &analyzer);
            assert_eq!(once, twice, "hint {raw}");
        }
    }

    #[test]
    fn extras_are_rewritten() {
        let (_dir, analyzer) = analyzer();
        let mut extras = Extras::new();
        assert_eq!(normalize_attribution(&mut extras, &analyzer), None);

        extras.push(SPAWN_CALLER_KEY, "src/main.rs:2");
        extras.push(CALLSITE_KEY, "src/main.rs:3");
        assert_eq!(normalize_attribution(&mut extras, &analyzer).as_deref(), Some("main.rs:main:2"));
        assert_eq!(extras.get(SPAWN_CALLER_KEY), Some("main.rs:main:2"));
    }
}
