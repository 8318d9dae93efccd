//! Placeholder templates for plain-text output.
//!
//! Recognized placeholders are `{time}`, `{app_name}`, `{caller}`,
//! `{level}`, `{message}`, `{trace_id}`, `{span_id}` and `{extra}`.
//! A placeholder whose value is empty disappears from the line; unknown
//! `{...}` sequences are kept literally.

use crate::record::{Level, LogRecord, COLOR_RESET};
use crate::spawn::SPAWN_CALLER_KEY;

pub const DEFAULT_FORMAT: &str = "[{time}] [{app_name}] [{caller}] [{level}] {message} {extra}";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PLACEHOLDERS: [&str; 8] = [
    "time", "app_name", "caller", "level", "message", "trace_id", "span_id", "extra",
];

struct Painter {
    code: Option<&'static str>,
}

impl Painter {
    fn new(level: Level, color: bool) -> Self {
        Self { code: color.then(|| level.color_code()) }
    }

    fn paint(&self, text: &str) -> String {
        match self.code {
            Some(code) => format!("{}{}{}", code, text, COLOR_RESET),
            None => text.to_string(),
        }
    }
}

/// Render `record` through `template`.
pub fn render(template: &str, record: &LogRecord, color: bool) -> String {
    let painter = Painter::new(record.level, color);

    let trace_token = non_empty(&record.trace_id).map(|id| format!("{}={}", painter.paint("trace_id"), id));
    let span_token = non_empty(&record.span_id).map(|id| format!("{}={}", painter.paint("span_id"), id));

    let value_of = |name: &str| -> String {
        match name {
            "time" => record.timestamp.format(TIME_FORMAT).to_string(),
            "app_name" => record.app_name.clone(),
            "caller" => record.caller.clone(),
            "level" => painter.paint(record.level.as_str()),
            "message" => record.message.clone(),
            "trace_id" => trace_token.clone().unwrap_or_default(),
            "span_id" => span_token.clone().unwrap_or_default(),
            "extra" => render_extras(record, &painter),
            _ => String::new(),
        }
    };

    let mut out = String::with_capacity(template.len() + record.message.len() + 64);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let placeholder = tail
            .find('}')
            .map(|close| (&tail[1..close], close))
            .filter(|(name, _)| PLACEHOLDERS.contains(name));
        match placeholder {
            Some((name, close)) => {
                out.push_str(&value_of(name));
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    let mut line = out.trim_end().to_string();
    for token in [trace_token, span_token].into_iter().flatten() {
        if !line.contains(&token) {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&token);
        }
    }
    line
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn render_extras(record: &LogRecord, painter: &Painter) -> String {
    record
        .extras
        .ordered_with_first(SPAWN_CALLER_KEY)
        .map(|kv| format!("{}={}", painter.paint(&kv.key), kv.value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Extras;
    use chrono::Local;

    fn record(level: Level) -> LogRecord {
        LogRecord {
            timestamp: Local::now(),
            level,
            app_name: "UnitTest".to_string(),
            caller: "lib.rs:run:10".to_string(),
            message: "hello world".to_string(),
            trace_id: None,
            span_id: None,
            extras: Extras::new(),
        }
    }

    #[test]
    fn default_template() {
        let mut rec = record(Level::Info);
        rec.extras.push("foo", "bar");
        let line = render(DEFAULT_FORMAT, &rec, false);
        assert!(line.contains("[UnitTest] [lib.rs:run:10] [INFO] hello world foo=bar"), "{line}");
        assert!(line.starts_with('['));
    }

    #[test]
    fn empty_placeholders_vanish() {
        let line = render("{message} {trace_id} {span_id} {extra}", &record(Level::Info), false);
        assert_eq!(line, "hello world");
    }

    #[test]
    fn unknown_braces_are_literal() {
        let line = render("{level} {nope} {message}", &record(Level::Warn), false);
        assert_eq!(line, "WARN {nope} hello world");
    }

    #[test]
    fn values_are_not_substituted_twice() {
        let mut rec = record(Level::Info);
        rec.message = "literal {caller}".to_string();
        assert_eq!(render("{message}", &rec, false), "literal {caller}");
    }

    #[test]
    fn level_and_keys_are_colored() {
        let mut rec = record(Level::Debug);
        rec.extras.push("k", "v");
        let line = render("{level} {extra}", &rec, true);
        assert_eq!(line, "\x1b[36mDEBUG\x1b[0m \x1b[36mk\x1b[0m=v");
    }

    #[test]
    fn trace_fields_are_appended_when_template_omits_them() {
        let mut rec = record(Level::Error);
        rec.trace_id = Some("4bf92f3577b34da6a3ce929d0e0e4736".to_string());
        rec.span_id = Some("00f067aa0ba902b7".to_string());
        let line = render("{level} - {message}", &rec, false);
        assert_eq!(
            line,
            "ERROR - hello world trace_id=4bf92f3577b34da6a3ce929d0e0e4736 span_id=00f067aa0ba902b7"
        );

        let line = render("{trace_id} {message} {span_id}", &rec, true);
        assert_eq!(line.matches("trace_id").count(), 1);
        assert_eq!(line.matches("span_id").count(), 1);
    }

    #[test]
    fn spawn_caller_is_rendered_first() {
        let mut rec = record(Level::Info);
        rec.extras.push("a", "1");
        rec.extras.push(SPAWN_CALLER_KEY, "main.rs:main:4");
        let line = render("{extra}", &rec, false);
        assert_eq!(line, "spawn_caller=main.rs:main:4 a=1");
    }
}
