//! Human-readable rendering of structured log lines

use super::OutputConverter;
use chrono::DateTime;
use colored::Colorize;
use serde_json::{Map, Value};
use std::borrow::Cow;

const TIME_KEYS: [&str; 2] = ["time", "timestamp"];
const MESSAGE_KEYS: [&str; 2] = ["message", "msg"];
const LEVEL_KEY: &str = "level";
const ERROR_KEY: &str = "error";

/// Renders JSON log records as `<time> <LVL> <message> key=value ...`.
///
/// Lines that are not a JSON object pass through untouched.
#[derive(Debug, Clone, Copy)]
pub struct LogLineRenderer {
    color: bool,
}

impl LogLineRenderer {
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    fn render(&self, mut fields: Map<String, Value>) -> String {
        let mut parts = Vec::new();

        if let Some(time) = take_first(&mut fields, &TIME_KEYS) {
            let time = format_time(&time);
            parts.push(if self.color { time.dimmed().to_string() } else { time });
        }

        if let Some(level) = fields.shift_remove(LEVEL_KEY) {
            parts.push(self.level_tag(&value_text(&level)));
        }

        if let Some(message) = take_first(&mut fields, &MESSAGE_KEYS) {
            let message = value_text(&message);
            if !message.is_empty() {
                parts.push(message);
            }
        }

        if let Some(error) = fields.shift_remove(ERROR_KEY) {
            let pair = format!("{ERROR_KEY}={}", field_value(&error));
            parts.push(if self.color { pair.red().to_string() } else { pair });
        }

        for (key, value) in &fields {
            let key = format!("{key}=");
            let key = if self.color { key.cyan().to_string() } else { key };
            parts.push(format!("{key}{}", field_value(value)));
        }

        parts.join(" ")
    }

    fn level_tag(&self, level: &str) -> String {
        let tag = match level.to_ascii_lowercase().as_str() {
            "trace" => "TRC",
            "debug" => "DBG",
            "info" => "INF",
            "warn" | "warning" => "WRN",
            "error" => "ERR",
            "fatal" => "FTL",
            "panic" => "PNC",
            _ => return level.to_uppercase(),
        };
        if !self.color {
            return tag.to_string();
        }
        match tag {
            "TRC" => tag.magenta().to_string(),
            "DBG" => tag.yellow().to_string(),
            "INF" => tag.green().to_string(),
            "WRN" => tag.red().to_string(),
            _ => tag.red().bold().to_string(),
        }
    }
}

impl OutputConverter for LogLineRenderer {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        let (body, terminator) = split_terminator(line);
        if body.first() != Some(&b'{') {
            return Cow::Borrowed(line);
        }

        let fields = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => fields,
            _ => return Cow::Borrowed(line),
        };

        let mut rendered = self.render(fields).into_bytes();
        rendered.extend_from_slice(terminator);
        Cow::Owned(rendered)
    }
}

/// Split a trailing `\n` or `\r\n` off `line`
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let body_len = if line.ends_with(b"\r\n") {
        line.len() - 2
    } else if line.ends_with(b"\n") {
        line.len() - 1
    } else {
        line.len()
    };
    line.split_at(body_len)
}

fn take_first(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| fields.shift_remove(*key))
}

fn format_time(time: &Value) -> String {
    match time {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| raw.clone()),
        other => other.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().any(char::is_whitespace) => value.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(line: &str) -> String {
        let renderer = LogLineRenderer::new(false);
        String::from_utf8(renderer.convert(line.as_bytes()).into_owned()).unwrap()
    }

    #[test]
    fn test_renders_basic_record() {
        assert_eq!(
            render("{\"level\":\"info\",\"time\":\"2024-05-01T10:11:12Z\",\"message\":\"server started\"}\n"),
            "10:11:12 INF server started\n"
        );
    }

    #[test]
    fn test_renders_fields_in_order_after_error() {
        assert_eq!(
            render(r#"{"level":"error","msg":"request failed","path":"/users","status":500,"error":"timeout"}"#),
            "ERR request failed error=timeout path=/users status=500"
        );
    }

    #[test]
    fn test_quotes_values_with_whitespace() {
        assert_eq!(
            render(r#"{"level":"warn","message":"slow","query":"select 1"}"#),
            "WRN slow query=\"select 1\""
        );
    }

    #[test]
    fn test_unknown_level_is_uppercased() {
        assert_eq!(render(r#"{"level":"notice","message":"hi"}"#), "NOTICE hi");
    }

    #[test]
    fn test_keeps_crlf_terminator() {
        assert_eq!(render("{\"level\":\"debug\",\"message\":\"x\"}\r\n"), "DBG x\r\n");
    }

    #[test]
    fn test_passes_through_non_json() {
        let renderer = LogLineRenderer::new(true);
        let lines: [&[u8]; 4] = [b"--- PASS: TestFoo (0.00s)\n", b"", b"{not json}\n", b"[1,2]\n"];
        for line in lines {
            assert!(matches!(renderer.convert(line), Cow::Borrowed(out) if out == line));
        }
    }

    #[test]
    fn test_colored_output_keeps_message() {
        let renderer = LogLineRenderer::new(true);
        let out = renderer.convert(br#"{"level":"info","message":"hello"}"#);
        assert!(String::from_utf8_lossy(&out).contains("hello"));
    }
}
