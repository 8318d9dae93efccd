//! Stack-based caller resolution.
//!
//! Walks the live call stack and reports the first frame that belongs to
//! application code. Only meaningful on the thread that performs the log
//! call: a spawned thread or task cannot see the frames of its creator.

use std::path::{Path, PathBuf};

pub const UNKNOWN_CALLER: &str = "unknown";

const INTERNAL_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "tokio::",
    "test::",
    "futures",
    "__rust",
    "rust_begin",
    "_start",
    "__libc",
];

const INTERNAL_PATH_MARKERS: &[&str] =
    &["/rustc/", "\\rustc\\", "/.cargo/registry/", "\\.cargo\\registry\\", "/.rustup/"];

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSite {
    pub file: PathBuf,
    pub function: String,
    pub line: u32,
    /// The frame was a closure or async body inside `function`.
    pub closure: bool,
}

impl FrameSite {
    pub fn to_caller_string(&self) -> String {
        format!("{}:{}:{}", basename(&self.file.to_string_lossy()), self.function, self.line)
    }
}

/// Return `basename(file):function:line` of the first application frame,
/// or [`UNKNOWN_CALLER`].
pub fn resolve_caller(skip: usize) -> String {
    caller_frame(skip)
        .map(|site| site.to_caller_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}

/// First application frame after discarding `skip` innermost frames.
pub fn caller_frame(skip: usize) -> Option<FrameSite> {
    let mut depth = 0usize;
    let mut found: Option<FrameSite> = None;

    backtrace::trace(|frame| {
        depth += 1;
        if depth <= skip {
            return true;
        }
        backtrace::resolve_frame(frame, |symbol| {
            if found.is_some() {
                return;
            }
            let (Some(name), Some(file), Some(line)) = (symbol.name(), symbol.filename(), symbol.lineno()) else {
                return;
            };
            let name = format!("{:#}", name);
            if is_internal(&name, file) {
                return;
            }
            if let Some((function, closure)) = short_function_name(&name) {
                found = Some(FrameSite { file: file.to_path_buf(), function, line, closure });
            }
        });
        found.is_none()
    });

    found
}

pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn is_internal(symbol: &str, file: &Path) -> bool {
    let file = file.to_string_lossy();
    if INTERNAL_PATH_MARKERS.iter().any(|marker| file.contains(marker)) {
        return true;
    }

    let bare = symbol.trim_start_matches('<');
    let own_crate = concat!(env!("CARGO_CRATE_NAME"), "::");
    let in_own_crate = bare.starts_with(own_crate) || symbol.contains(&format!(" as {}", own_crate));
    if in_own_crate && !symbol.contains("::tests::") {
        return true;
    }
    if [" as core::", " as std::", " as alloc::"].iter().any(|shim| symbol.contains(shim)) {
        return true;
    }
    INTERNAL_PREFIXES.iter().any(|prefix| bare.starts_with(prefix))
}

/// Reduce a demangled symbol to its last named segment.
///
/// Generic arguments and `<T as Trait>` qualifiers are dropped, as are
/// closure and async-body segments; the boolean reports whether any such
/// anonymous segment was present.
pub(crate) fn short_function_name(symbol: &str) -> Option<(String, bool)> {
    let mut plain = String::with_capacity(symbol.len());
    let mut depth = 0usize;
    let mut prev = '\0';
    for c in symbol.chars() {
        match c {
            '<' => depth += 1,
            '>' if prev != '-' && depth > 0 => depth -= 1,
            _ if depth == 0 => plain.push(c),
            _ => {}
        }
        prev = c;
    }

    let mut closure = false;
    let mut last = None;
    for segment in plain.split("::") {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if segment.starts_with('{') {
            closure = true;
            continue;
        }
        last = Some(segment);
    }
    last.map(|name| (name.to_string(), closure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(short_function_name("app::server::run"), Some(("run".to_string(), false)));
        assert_eq!(
            short_function_name("app::main::{{closure}}::{{closure}}"),
            Some(("main".to_string(), true))
        );
        assert_eq!(
            short_function_name("<app::Worker as app::Job>::execute::<u8>"),
            Some(("execute".to_string(), false))
        );
        assert_eq!(
            short_function_name("<app::Server>::serve::{closure#0}"),
            Some(("serve".to_string(), true))
        );
        assert_eq!(short_function_name("{{closure}}"), None);
    }

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(basename("src/spawn.rs"), "spawn.rs");
        assert_eq!(basename("C:\\work\\main.rs"), "main.rs");
        assert_eq!(basename("main.rs"), "main.rs");
    }

    #[test]
    fn internal_frames() {
        let src = Path::new("src/app.rs");
        assert!(is_internal("std::rt::lang_start", src));
        assert!(is_internal("<F as core::ops::function::FnOnce<()>>::call_once", src));
        assert!(is_internal("wslogger::logger::Logger::info", src));
        assert!(is_internal("app::run", Path::new("/rustc/abc/library/std/src/rt.rs")));
        assert!(!is_internal("wslogger::caller::tests::resolves_this_test", src));
        assert!(!is_internal("app::run", src));
    }

    #[test]
    fn resolves_this_test() {
        let caller = resolve_caller(0);
        assert!(caller.starts_with("caller.rs:resolves_this_test:"), "{caller}");
    }
}
