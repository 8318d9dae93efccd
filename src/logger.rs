use crate::analyzer::SourceAnalyzer;
use crate::args::{parse_log_args, quote_if_spaced, Arg, Extras};
use crate::attribution::{self, CALLSITE_KEY};
use crate::caller::{self, basename, UNKNOWN_CALLER};
use crate::config::{LoggerBuilder, LoggerConfig};
use crate::format;
use crate::record::{Level, LogRecord};
use crate::sink::LogSink;
use crate::spawn::{self, SpawnHandle, SPAWN_CALLER_KEY};
use crate::trace::TraceContext;
use chrono::Local;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Generates the sixteen leveled calls on a type that provides
/// `dispatch(level, ctx, args, location)`.
macro_rules! leveled_methods {
    ($($level:ident => $plain:ident, $fmt:ident, $ctx:ident, $fmt_ctx:ident;)+) => {
        $(
            #[doc = concat!("Log at `", stringify!($level), "`: a message followed by key/value pairs.")]
            #[track_caller]
            pub fn $plain(&self, args: impl $crate::args::IntoArgs) {
                self.dispatch(
                    $crate::record::Level::$level,
                    &(),
                    $crate::args::IntoArgs::into_args(args),
                    ::std::panic::Location::caller(),
                );
            }

            #[doc = concat!("Log a formatted message at `", stringify!($level), "`.")]
            #[track_caller]
            pub fn $fmt(&self, message: ::std::fmt::Arguments<'_>) {
                self.dispatch(
                    $crate::record::Level::$level,
                    &(),
                    vec![$crate::args::Arg::Str(message.to_string())],
                    ::std::panic::Location::caller(),
                );
            }

            #[doc = concat!("Like [`Self::", stringify!($plain), "`], with trace context.")]
            #[track_caller]
            pub fn $ctx(&self, ctx: &dyn $crate::trace::TraceContext, args: impl $crate::args::IntoArgs) {
                self.dispatch(
                    $crate::record::Level::$level,
                    ctx,
                    $crate::args::IntoArgs::into_args(args),
                    ::std::panic::Location::caller(),
                );
            }

            #[doc = concat!("Like [`Self::", stringify!($fmt), "`], with trace context.")]
            #[track_caller]
            pub fn $fmt_ctx(&self, ctx: &dyn $crate::trace::TraceContext, message: ::std::fmt::Arguments<'_>) {
                self.dispatch(
                    $crate::record::Level::$level,
                    ctx,
                    vec![$crate::args::Arg::Str(message.to_string())],
                    ::std::panic::Location::caller(),
                );
            }
        )+
    };
}

pub(crate) use leveled_methods;

struct Inner {
    config: LoggerConfig,
    sink: Arc<dyn LogSink>,
    analyzer: Arc<SourceAnalyzer>,
}

/// Structured logger. Cheap to clone; clones share configuration and sink.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("config", &self.inner.config).finish_non_exhaustive()
    }
}

impl Logger {
    /// Logger with default settings, writing to stdout.
    pub fn new() -> Self {
        Self::from_parts(LoggerConfig::default(), Arc::new(crate::sink::StdoutSink), SourceAnalyzer::shared())
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub(crate) fn from_parts(config: LoggerConfig, sink: Arc<dyn LogSink>, analyzer: Arc<SourceAnalyzer>) -> Self {
        Self { inner: Arc::new(Inner { config, sink, analyzer }) }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn analyzer(&self) -> &SourceAnalyzer {
        &self.inner.analyzer
    }

    pub fn flush(&self) {
        if let Err(e) = self.inner.sink.flush() {
            eprintln!("error flushing log sink: {}", e);
        }
    }

    leveled_methods! {
        Info => info, infof, info_ctx, infof_ctx;
        Warn => warn, warnf, warn_ctx, warnf_ctx;
        Error => error, errorf, error_ctx, errorf_ctx;
        Debug => debug, debugf, debug_ctx, debugf_ctx;
    }

    /// Capture the current location as the spawn site of a task about to
    /// be created. Call it on the spawning thread, right before spawning,
    /// and move the handle into the task.
    #[track_caller]
    pub fn capture_spawn_site(&self) -> SpawnHandle {
        let location = Location::caller();
        let callsite = spawn::capture_spawn_site(&self.inner.analyzer, location);
        SpawnHandle::new(self.clone(), callsite)
    }

    /// Alias of [`Logger::capture_spawn_site`].
    #[track_caller]
    pub fn wrap_task(&self) -> SpawnHandle {
        let location = Location::caller();
        let callsite = spawn::capture_spawn_site(&self.inner.analyzer, location);
        SpawnHandle::new(self.clone(), callsite)
    }

    /// Spawn a thread whose handle is attributed to this call.
    #[track_caller]
    pub fn spawn_thread<F, T>(&self, f: F) -> std::thread::JoinHandle<T>
    where
        F: FnOnce(SpawnHandle) -> T + Send + 'static,
        T: Send + 'static,
    {
        let location = Location::caller();
        let handle = SpawnHandle::new(self.clone(), spawn::spawn_call_site(&self.inner.analyzer, location));
        std::thread::spawn(move || f(handle))
    }

    /// Spawn a tokio task whose handle is attributed to this call.
    #[cfg(feature = "tokio")]
    #[track_caller]
    pub fn spawn_task<F, Fut>(&self, f: F) -> tokio::task::JoinHandle<Fut::Output>
    where
        F: FnOnce(SpawnHandle) -> Fut,
        Fut: std::future::Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let location = Location::caller();
        let handle = SpawnHandle::new(self.clone(), spawn::spawn_call_site(&self.inner.analyzer, location));
        tokio::spawn(f(handle))
    }

    fn dispatch(&self, level: Level, ctx: &dyn TraceContext, args: Vec<Arg>, location: &'static Location<'static>) {
        self.emit(level, ctx, args, None, location);
    }

    /// Build, render and write one record.
    pub(crate) fn emit(
        &self,
        level: Level,
        ctx: &dyn TraceContext,
        args: Vec<Arg>,
        spawn_site: Option<&str>,
        location: &'static Location<'static>,
    ) {
        let timestamp = Local::now();
        let config = &self.inner.config;

        let span = ctx.span_context(config.include_span_attributes);
        let (message, mut extras) = parse_log_args(args);
        if let Some(site) = spawn_site {
            extras.set(SPAWN_CALLER_KEY, site);
        }
        extras.set(CALLSITE_KEY, format!("{}:{}", location.file(), location.line()));

        let caller = self.resolve_caller(&mut extras, location);
        extras.remove(CALLSITE_KEY);

        let (trace_id, span_id) = match span {
            Some(span) => {
                for (key, value) in span.attributes {
                    if !extras.contains_key(&key) {
                        extras.push(key, quote_if_spaced(&value));
                    }
                }
                (Some(span.trace_id), Some(span.span_id))
            }
            None => (None, None),
        };

        let record = LogRecord {
            timestamp,
            level,
            app_name: config.app_name.clone(),
            caller,
            message,
            trace_id,
            span_id,
            extras,
        };
        self.write(&record);
    }

    /// Caller resolution pipeline: spawned-task hint, then the live stack,
    /// then the invocation site itself.
    fn resolve_caller(&self, extras: &mut Extras, location: &'static Location<'static>) -> String {
        let file = basename(location.file());
        attribution::normalize_attribution(extras, &self.inner.analyzer)
            .or_else(|| {
                caller::caller_frame(0)
                    .filter(|frame| basename(&frame.file.to_string_lossy()) == file)
                    .map(|frame| format!("{}:{}:{}", file, frame.function, location.line()))
            })
            .or_else(|| {
                self.inner
                    .analyzer
                    .function_enclosing_line(location.file(), location.line() as usize)
                    .map(|function| format!("{}:{}:{}", file, function, location.line()))
            })
            .or_else(|| (!file.is_empty()).then(|| format!("{}:{}", file, location.line())))
            .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
    }

    fn write(&self, record: &LogRecord) {
        let config = &self.inner.config;
        let mut line = if config.json {
            match record.to_json() {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("error serializing log record: {}", e);
                    format::render(&config.format, record, false)
                }
            }
        } else {
            format::render(&config.format, record, config.color)
        };
        line.push('\n');

        if let Err(e) = self.inner.sink.write_line(line.as_bytes()) {
            eprintln!("error writing log record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn logger(sink: &MemorySink) -> Logger {
        Logger::builder().sink(sink.clone()).color(false).format("{caller} {level} {message} {extra}").build().unwrap()
    }

    #[test]
    fn caller_is_this_function_and_line() {
        let sink = MemorySink::new();
        let log = logger(&sink);
        let line = line!() + 1;
        log.info(("hello", "k", "v"));
        assert_eq!(sink.contents(), format!("logger.rs:caller_is_this_function_and_line:{} INFO hello k=v\n", line));
    }

    #[test]
    fn callsite_key_is_never_emitted() {
        let sink = MemorySink::new();
        let log = logger(&sink);
        log.warn(("w", CALLSITE_KEY, "forged"));
        assert!(!sink.contents().contains(CALLSITE_KEY), "{}", sink.contents());
    }

    #[test]
    fn formatted_variants() {
        let sink = MemorySink::new();
        let log = logger(&sink);
        log.debugf(format_args!("{} + {} = {}", 2, 3, 5));
        log.errorf_ctx(&(), format_args!("wrapped: {}", "cause"));
        let lines = sink.lines();
        assert!(lines[0].ends_with("DEBUG 2 + 3 = 5"), "{}", lines[0]);
        assert!(lines[1].ends_with("ERROR wrapped: cause"), "{}", lines[1]);
    }

    #[test]
    fn hint_from_caller_extra_overrides_caller() {
        let sink = MemorySink::new();
        let log = logger(&sink);
        log.info(("from main", SPAWN_CALLER_KEY, "main.rs:main:7"));
        assert_eq!(sink.contents(), "main.rs:main:7 INFO from main spawn_caller=main.rs:main:7\n");
    }
}
