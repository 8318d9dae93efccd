//! Structured logging facade with placeholder templates, JSON output,
//! trace-context propagation, rotating files and best-effort caller
//! attribution for log lines written from spawned threads and tasks.
//!
//! ```no_run
//! use wslogger::Logger;
//!
//! let log = Logger::builder().app_name("billing").color(false).build().unwrap();
//! log.info(("invoice sent", "id", 42));
//!
//! let handle = log.capture_spawn_site();
//! std::thread::spawn(move || handle.warn("retrying"));
//! ```

pub mod analyzer;
pub mod args;
pub mod attribution;
pub mod caller;
pub mod config;
pub mod env;
pub mod format;
pub mod init;
pub mod logger;
pub mod noop_sink;
pub mod record;
pub mod rotate;
pub mod sink;
pub mod spawn;
pub mod trace;

pub use args::{Arg, Extras, IntoArgs, KeyValue};
pub use config::{BuildError, LoggerBuilder, LoggerConfig};
pub use logger::Logger;
pub use record::{Level, LogRecord};
pub use rotate::{RotatingFileSink, RotationConfig};
pub use sink::{FanoutSink, LogSink, MemorySink, StderrSink, StdoutSink, WriterSink};
pub use spawn::{SpawnHandle, SPAWN_CALLER_KEY};
pub use trace::{SpanContext, TraceContext, TraceContextLayer};
