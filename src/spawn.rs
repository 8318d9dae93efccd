//! Spawn-site capture.
//!
//! A spawned thread or task cannot walk back to the frames of the code that
//! created it, so attribution has to be taken on the spawning side, at
//! spawn time, and carried into the task as an immutable [`SpawnHandle`].

use crate::analyzer::SourceAnalyzer;
use crate::args::Arg;
use crate::caller::{self, basename};
use crate::logger::{leveled_methods, Logger};
use crate::record::Level;
use crate::trace::TraceContext;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Extra under which the spawn site of a task is attached to its records.
pub const SPAWN_CALLER_KEY: &str = "spawn_caller";

/// Correction added to the spawn statement line found by static analysis.
/// With `rustfmt` layouts the statement line itself is the right answer.
pub const SPAWN_LINE_OFFSET: isize = 0;

/// Lines after the capture call searched by the textual fallback.
pub const SPAWN_SCAN_WINDOW: usize = 20;

/// Attribution captured at spawn time, plus the logger to write through.
///
/// Created on the spawning thread and moved (or cloned) into the task; it
/// is never mutated afterwards.
#[derive(Clone)]
pub struct SpawnHandle {
    logger: Logger,
    callsite: Arc<str>,
}

impl SpawnHandle {
    pub(crate) fn new(logger: Logger, callsite: String) -> Self {
        Self { logger, callsite: Arc::from(callsite) }
    }

    /// The captured `file:function:line` (or degraded) location.
    pub fn callsite(&self) -> &str {
        &self.callsite
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    leveled_methods! {
        Info => info, infof, info_ctx, infof_ctx;
        Warn => warn, warnf, warn_ctx, warnf_ctx;
        Error => error, errorf, error_ctx, errorf_ctx;
        Debug => debug, debugf, debug_ctx, debugf_ctx;
    }

    fn dispatch(&self, level: Level, ctx: &dyn TraceContext, args: Vec<Arg>, location: &'static Location<'static>) {
        self.logger.emit(level, ctx, args, Some(&self.callsite), location);
    }
}

impl fmt::Debug for SpawnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnHandle").field("callsite", &self.callsite).finish()
    }
}

/// Function enclosing `location`: the live caller frame when it is a named
/// function in the same file, otherwise the analyzer's answer.
fn enclosing_function(analyzer: &SourceAnalyzer, location: &Location<'_>) -> Option<String> {
    let file = basename(location.file());
    caller::caller_frame(0)
        .filter(|frame| !frame.closure && basename(&frame.file.to_string_lossy()) == file)
        .map(|frame| frame.function)
        .or_else(|| analyzer.function_enclosing_line(location.file(), location.line() as usize))
}

/// Resolve the spawn site for a capture made at `location`, which sits
/// shortly before the actual spawn statement.
pub(crate) fn capture_spawn_site(analyzer: &SourceAnalyzer, location: &Location<'_>) -> String {
    let path = location.file();
    let captured = location.line() as usize;
    let function = enclosing_function(analyzer, location);
    let info = function.as_deref().and_then(|function| analyzer.function_at(path, function, captured));

    let line = info
        .as_ref()
        .and_then(|info| info.spawn_line_from(captured).or_else(|| info.spawn_lines.first().copied()))
        .map(|line| line.saturating_add_signed(SPAWN_LINE_OFFSET))
        .or_else(|| {
            // the scan never leaves a known function
            let window = info
                .as_ref()
                .map_or(SPAWN_SCAN_WINDOW, |info| info.end_line.saturating_sub(captured).min(SPAWN_SCAN_WINDOW));
            analyzer.scan_spawn_marker(path, captured, window)
        })
        .unwrap_or(captured);

    format_site(path, function.as_deref(), line)
}

/// Spawn site for helpers that spawn themselves: `location` is the spawn
/// statement.
pub(crate) fn spawn_call_site(analyzer: &SourceAnalyzer, location: &Location<'_>) -> String {
    let function = enclosing_function(analyzer, location);
    format_site(location.file(), function.as_deref(), location.line() as usize)
}

fn format_site(path: &str, function: Option<&str>, line: usize) -> String {
    match function {
        Some(function) => format!("{}:{}:{}", basename(path), function, line),
        None => format!("{}:{}", basename(path), line),
    }
}
