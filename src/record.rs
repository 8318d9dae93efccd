use crate::args::Extras;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

pub(crate) const COLOR_RESET: &str = "\x1b[0m";

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Debug => "DEBUG",
        }
    }

    /// ANSI color code for this level, without the reset sequence.
    pub fn color_code(&self) -> &'static str {
        match self {
            Level::Info => "\x1b[32m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
            Level::Debug => "\x1b[36m",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-resolved log event, built per call and dropped after it is
/// written.
///
/// The serialized form is the JSON wire shape: empty trace/span ids and an
/// empty extras map are left out of the object.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    #[serde(rename = "time")]
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub app_name: String,
    pub caller: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(rename = "extra", skip_serializing_if = "Extras::is_empty")]
    pub extras: Extras,
}

impl LogRecord {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Local::now(),
            level: Level::Warn,
            app_name: "UnitTest".to_string(),
            caller: "main.rs:main:3".to_string(),
            message: "hello".to_string(),
            trace_id: None,
            span_id: None,
            extras: Extras::new(),
        }
    }

    #[test]
    fn json_omits_empty_optional_fields() {
        let json: serde_json::Value = serde_json::from_str(&record().to_json().unwrap()).unwrap();
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["app_name"], "UnitTest");
        assert!(json.get("trace_id").is_none());
        assert!(json.get("span_id").is_none());
        assert!(json.get("extra").is_none());
        assert!(json["time"].is_string());
    }

    #[test]
    fn json_keeps_extra_insertion_order() {
        let mut rec = record();
        rec.extras.push("zeta", "1");
        rec.extras.push("alpha", "2");
        rec.trace_id = Some("0af7651916cd43dd8448eb211c80319c".to_string());
        let line = rec.to_json().unwrap();
        assert!(line.contains(r#""extra":{"zeta":"1","alpha":"2"}"#), "{line}");
        assert!(line.contains(r#""trace_id":"0af7651916cd43dd8448eb211c80319c""#));
    }

    #[test]
    fn level_colors() {
        assert_eq!(Level::Debug.color_code(), "\x1b[36m");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }
}
