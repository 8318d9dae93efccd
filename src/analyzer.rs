//! Static analysis of Rust sources for caller attribution.
//!
//! Files are parsed with `syn` (with `proc-macro2` span locations enabled
//! so that line numbers are available outside of a procedural macro) and
//! reduced to a plain [`SourceIndex`] of function spans, spawn statements
//! and log calls. Indexes are cached per canonical path for the lifetime of
//! the analyzer; sources are assumed not to change during a run.
//!
//! Every query returns `Option`: a missing file, a parse error or a name
//! that cannot be found is a negative answer, never an error.

use dashmap::DashMap;
use proc_macro2::Span;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};

/// Call names treated as "spawn a concurrent task".
const SPAWN_CALLS: &[&str] = &["spawn", "spawn_blocking", "spawn_local"];

/// Lexical markers used by the textual fallback scan.
const SPAWN_MARKERS: &[&str] = &["spawn(", "spawn_blocking(", "spawn_local("];

const LOG_RECEIVERS: &[&str] = &["log", "logger"];

const LOG_METHODS: &[&str] = &[
    "info", "warn", "error", "debug",
    "infof", "warnf", "errorf", "debugf",
    "info_ctx", "warn_ctx", "error_ctx", "debug_ctx",
    "infof_ctx", "warnf_ctx", "errorf_ctx", "debugf_ctx",
];

const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// One `fn` item found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Lines of spawn statements in the body, ascending.
    pub spawn_lines: Vec<usize>,
    /// Lines of log calls in the body, ascending.
    pub log_lines: Vec<usize>,
}

impl FunctionInfo {
    fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// First spawn at or after `line`.
    pub fn spawn_line_from(&self, line: usize) -> Option<usize> {
        self.spawn_lines.iter().copied().find(|&l| l >= line)
    }
}

/// Parsed summary of a single source file.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    pub path: PathBuf,
    pub functions: Vec<FunctionInfo>,
}

impl SourceIndex {
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> syn::Result<Self> {
        let file = syn::parse_file(source)?;
        let mut collector = FunctionCollector::default();
        collector.visit_file(&file);
        Ok(Self { path: path.into(), functions: collector.functions })
    }

    /// Innermost function whose span contains `line`.
    pub fn enclosing(&self, line: usize) -> Option<&FunctionInfo> {
        self.functions
            .iter()
            .filter(|f| f.contains(line))
            .min_by_key(|f| f.end_line - f.start_line)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Function named `name` enclosing `line` (innermost), or the first
    /// one with that name when none encloses it.
    pub fn function_at(&self, name: &str, line: usize) -> Option<&FunctionInfo> {
        self.functions
            .iter()
            .filter(|f| f.name == name && f.contains(line))
            .min_by_key(|f| f.end_line - f.start_line)
            .or_else(|| self.function(name))
    }
}

#[derive(Default)]
struct FunctionCollector {
    functions: Vec<FunctionInfo>,
}

impl FunctionCollector {
    fn record(&mut self, sig: &syn::Signature, block: &syn::Block) {
        let mut calls = CallScanner::default();
        for stmt in &block.stmts {
            calls.visit_stmt(stmt);
        }
        calls.spawn_lines.sort_unstable();
        calls.log_lines.sort_unstable();

        self.functions.push(FunctionInfo {
            name: sig.ident.to_string(),
            start_line: line_of(sig.fn_token.span),
            end_line: block.brace_token.span.close().end().line,
            spawn_lines: calls.spawn_lines,
            log_lines: calls.log_lines,
        });
    }
}

impl<'ast> Visit<'ast> for FunctionCollector {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.record(&node.sig, &node.block);
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.record(&node.sig, &node.block);
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        if let Some(block) = &node.default {
            self.record(&node.sig, block);
        }
        visit::visit_trait_item_fn(self, node);
    }
}

/// Collects spawn and log calls of one function body. Nested items are
/// their own functions and are not entered.
#[derive(Default)]
struct CallScanner {
    spawn_lines: Vec<usize>,
    log_lines: Vec<usize>,
}

impl<'ast> Visit<'ast> for CallScanner {
    fn visit_item(&mut self, _node: &'ast syn::Item) {}

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        if let syn::Expr::Path(path) = node.func.as_ref() {
            let is_spawn = path
                .path
                .segments
                .last()
                .is_some_and(|seg| SPAWN_CALLS.contains(&seg.ident.to_string().as_str()));
            if is_spawn {
                self.spawn_lines.push(line_of(path.span()));
            }
        }
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        let method = node.method.to_string();
        if SPAWN_CALLS.contains(&method.as_str()) {
            self.spawn_lines.push(line_of(node.method.span()));
        }
        if LOG_METHODS.contains(&method.as_str()) && is_log_receiver(&node.receiver) {
            self.log_lines.push(line_of(node.method.span()));
        }
        visit::visit_expr_method_call(self, node);
    }
}

fn is_log_receiver(expr: &syn::Expr) -> bool {
    let name = match expr {
        syn::Expr::Path(p) if p.path.segments.len() == 1 => p.path.segments[0].ident.to_string(),
        syn::Expr::Field(f) => match &f.member {
            syn::Member::Named(ident) => ident.to_string(),
            syn::Member::Unnamed(_) => return false,
        },
        syn::Expr::Reference(r) => return is_log_receiver(&r.expr),
        syn::Expr::Paren(p) => return is_log_receiver(&p.expr),
        _ => return false,
    };
    LOG_RECEIVERS.contains(&name.as_str())
}

fn line_of(span: Span) -> usize {
    span.start().line
}

/// Source analyzer rooted at a working tree.
pub struct SourceAnalyzer {
    root: PathBuf,
    indexes: DashMap<PathBuf, Option<Arc<SourceIndex>>>,
    located: DashMap<String, Option<PathBuf>>,
}

impl SourceAnalyzer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), indexes: DashMap::new(), located: DashMap::new() }
    }

    /// Process-wide analyzer rooted at the current directory.
    pub fn shared() -> Arc<SourceAnalyzer> {
        static SHARED: OnceLock<Arc<SourceAnalyzer>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Arc::new(SourceAnalyzer::new(root))
            })
            .clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the innermost function enclosing `line`.
    pub fn function_enclosing_line(&self, path: &str, line: usize) -> Option<String> {
        self.index(path)?.enclosing(line).map(|f| f.name.clone())
    }

    /// First and last line of `function`.
    pub fn function_span(&self, path: &str, function: &str) -> Option<(usize, usize)> {
        self.index(path)?.function(function).map(|f| (f.start_line, f.end_line))
    }

    /// The function named `function` that encloses `line`; see
    /// [`SourceIndex::function_at`].
    pub fn function_at(&self, path: &str, function: &str, line: usize) -> Option<FunctionInfo> {
        self.index(path)?.function_at(function, line).cloned()
    }

    /// Line of the first log call inside `function`.
    pub fn first_log_call_line_in_function(&self, path: &str, function: &str) -> Option<usize> {
        self.index(path)?.function(function)?.log_lines.first().copied()
    }

    /// Line of the first spawn statement inside `function`.
    pub fn first_spawn_line_in_function(&self, path: &str, function: &str) -> Option<usize> {
        self.index(path)?.function(function)?.spawn_lines.first().copied()
    }

    /// First spawn statement inside `function` at or after `line`.
    pub fn spawn_line_after(&self, path: &str, function: &str, line: usize) -> Option<usize> {
        self.index(path)?.function_at(function, line)?.spawn_line_from(line)
    }

    /// Textual fallback: first line within `window` lines after `from_line`
    /// that contains a spawn call marker.
    pub fn scan_spawn_marker(&self, path: &str, from_line: usize, window: usize) -> Option<usize> {
        let file = self.existing(path).or_else(|| self.locate(path))?;
        let source = fs::read_to_string(&file).ok()?;
        source
            .lines()
            .enumerate()
            .map(|(i, text)| (i + 1, text))
            .skip(from_line)
            .take(window)
            .find(|(_, text)| {
                let code = text.trim_start();
                !code.starts_with("//") && SPAWN_MARKERS.iter().any(|m| code.contains(m))
            })
            .map(|(line, _)| line)
    }

    /// Parsed index of `path`, falling back to a basename search of the
    /// working tree when the path does not exist or does not parse.
    pub fn index(&self, path: &str) -> Option<Arc<SourceIndex>> {
        if let Some(index) = self.existing(path).and_then(|p| self.load(&p)) {
            return Some(index);
        }
        let found = self.locate(path)?;
        self.load(&found)
    }

    fn existing(&self, path: &str) -> Option<PathBuf> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        let joined = self.root.join(candidate);
        joined.is_file().then_some(joined)
    }

    fn load(&self, path: &Path) -> Option<Arc<SourceIndex>> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(cached) = self.indexes.get(&key) {
            return cached.clone();
        }

        let parsed = match fs::read_to_string(&key) {
            Ok(source) => match SourceIndex::parse(key.clone(), &source) {
                Ok(index) => Some(Arc::new(index)),
                Err(err) => {
                    tracing::debug!(path = %key.display(), error = %err, "source parse failed");
                    None
                }
            },
            Err(err) => {
                tracing::debug!(path = %key.display(), error = %err, "source read failed");
                None
            }
        };
        self.indexes.insert(key, parsed.clone());
        parsed
    }

    /// Find a file by basename under the root.
    ///
    /// On duplicates, paths with an `examples` component win, then paths
    /// ending with the requested relative path, then the shortest path.
    pub fn locate(&self, path: &str) -> Option<PathBuf> {
        let name = crate::caller::basename(path);
        if name.is_empty() {
            return None;
        }
        if let Some(cached) = self.located.get(path) {
            return cached.clone();
        }

        let mut candidates = Vec::new();
        collect_named(&self.root, name, &mut candidates);
        let wanted = Path::new(path);
        let best = candidates
            .into_iter()
            .min_by_key(|c| {
                let in_examples = c.components().any(|comp| comp == Component::Normal("examples".as_ref()));
                (!in_examples, !c.ends_with(wanted), c.as_os_str().len())
            });

        if best.is_none() {
            tracing::trace!(path, root = %self.root.display(), "source file not found in working tree");
        }
        self.located.insert(path.to_string(), best.clone());
        best
    }
}

fn collect_named(dir: &Path, name: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if kind.is_dir() {
            if file_name.starts_with('.') || SKIPPED_DIRS.contains(&file_name.as_ref()) {
                continue;
            }
            collect_named(&path, name, out);
        } else if kind.is_file() && file_name == name {
            out.push(path);
        }
    }
}
