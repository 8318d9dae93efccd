use crate::analyzer::SourceAnalyzer;
use crate::env;
use crate::format::DEFAULT_FORMAT;
use crate::logger::Logger;
use crate::rotate::{RotatingFileSink, RotationConfig};
use crate::sink::{FanoutSink, LogSink, StdoutSink, WriterSink};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_APP_NAME: &str = "MyApp";

/// Rendering options of a [`Logger`], fixed at construction.
///
/// **Fields**
/// - `app_name`: value of the `{app_name}` placeholder and JSON field.
/// - `format`: placeholder template for text output.
/// - `color`: wrap levels and keys in ANSI colors (text output only).
/// - `json`: emit one JSON object per line instead of the template.
/// - `include_span_attributes`: add the fields of the active span to the
///   extras of context-qualified calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    pub app_name: String,
    pub format: String,
    pub color: bool,
    pub json: bool,
    pub include_span_attributes: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            color: true,
            json: false,
            include_span_attributes: false,
        }
    }
}

/// Error type returned when building a logger.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("invalid rotation settings: {0}")]
    InvalidRotation(String),

    #[error("cannot open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

enum SinkChoice {
    Sink(Arc<dyn LogSink>),
    Rotating(RotationConfig),
}

/// Builder for [`Logger`]. Options apply once; the built logger is
/// immutable.
pub struct LoggerBuilder {
    config: LoggerConfig,
    sink: SinkChoice,
    also: Option<SinkChoice>,
    analyzer: Option<Arc<SourceAnalyzer>>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            config: LoggerConfig::default(),
            sink: SinkChoice::Sink(Arc::new(StdoutSink)),
            also: None,
            analyzer: None,
        }
    }
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    /// Set the output template. An empty template keeps the current one.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        if !format.is_empty() {
            self.config.format = format;
        }
        self
    }

    pub fn color(mut self, enable: bool) -> Self {
        self.config.color = enable;
        self
    }

    pub fn json(mut self, enable: bool) -> Self {
        self.config.json = enable;
        self
    }

    pub fn include_span_attributes(mut self, enable: bool) -> Self {
        self.config.include_span_attributes = enable;
        self
    }

    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = SinkChoice::Sink(Arc::new(sink));
        self
    }

    pub fn shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = SinkChoice::Sink(sink);
        self
    }

    /// Write to any `Write` implementation, serialized by a mutex.
    pub fn writer<W: Write + Send + 'static>(self, writer: W) -> Self {
        self.sink(WriterSink::new(writer))
    }

    /// Write only to a rotating file.
    pub fn rotating_file(mut self, rotation: RotationConfig) -> Self {
        self.sink = SinkChoice::Rotating(rotation);
        self
    }

    /// Write to stdout and to a rotating file.
    pub fn multi_writer(mut self, rotation: RotationConfig) -> Self {
        self.sink = SinkChoice::Sink(Arc::new(StdoutSink));
        self.also = Some(SinkChoice::Rotating(rotation));
        self
    }

    /// Also write every line to `sink`, in addition to the primary sink.
    pub fn also(mut self, sink: impl LogSink + 'static) -> Self {
        self.also = Some(SinkChoice::Sink(Arc::new(sink)));
        self
    }

    /// Resolve source files for attribution relative to `root`.
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.analyzer = Some(Arc::new(SourceAnalyzer::new(root)));
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<SourceAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Apply the `WSLOG_*` environment variables, see [`crate::env`].
    pub fn from_env(mut self) -> Self {
        if let Some(name) = env::env_string(env::WSLOG_APP_NAME_ENV) {
            self = self.app_name(name);
        }
        if let Some(format) = env::env_string(env::WSLOG_FORMAT_ENV) {
            self = self.format(format);
        }
        if let Some(json) = env::env_flag(env::WSLOG_JSON_ENV) {
            self = self.json(json);
        }
        if let Some(color) = env::env_flag(env::WSLOG_COLOR_ENV) {
            self = self.color(color);
        }
        if env::env_string(env::NO_COLOR_ENV).is_some() {
            self = self.color(false);
        }
        if let Some(path) = env::env_string(env::WSLOG_FILE_ENV) {
            let defaults = RotationConfig::default();
            self = self.rotating_file(RotationConfig {
                path: PathBuf::from(path),
                max_size_mb: env::env_parse(env::WSLOG_MAX_SIZE_MB_ENV).unwrap_or(defaults.max_size_mb),
                max_backups: env::env_parse(env::WSLOG_MAX_BACKUPS_ENV).unwrap_or(defaults.max_backups),
                max_age_days: env::env_parse(env::WSLOG_MAX_AGE_DAYS_ENV).unwrap_or(defaults.max_age_days),
                compress: env::env_flag(env::WSLOG_COMPRESS_ENV).unwrap_or(defaults.compress),
            });
        }
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn build(self) -> Result<Logger, BuildError> {
        let primary = open_sink(self.sink)?;
        let sink = match self.also {
            Some(also) => Arc::new(FanoutSink::new(primary, open_sink(also)?)) as Arc<dyn LogSink>,
            None => primary,
        };
        let analyzer = self.analyzer.unwrap_or_else(SourceAnalyzer::shared);
        Ok(Logger::from_parts(self.config, sink, analyzer))
    }
}

fn open_sink(choice: SinkChoice) -> Result<Arc<dyn LogSink>, BuildError> {
    match choice {
        SinkChoice::Sink(sink) => Ok(sink),
        SinkChoice::Rotating(rotation) => Ok(Arc::new(RotatingFileSink::open(rotation)?)),
    }
}
