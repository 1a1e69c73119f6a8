//! Structured test-event stream support
//!
//! With `-json` the test runner emits one JSON event per line. Those lines are
//! consumed by CI parsers and IDEs, so they are never rendered for humans.
//! The only rewrite allowed is on `output` events whose text is itself a JSON
//! log record: that inner text goes through the base converter and the event
//! is re-encoded with every other field left as it was.
//!
//! Field names are matched exactly in their PascalCase wire form, as
//! `go test -json` writes them. A line such as `{"action":"output",...}`
//! does not decode as an event and passes through unchanged.

use super::OutputConverter;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Key of the event field carrying output text
const OUTPUT_KEY: &str = "Output";

/// Action of a test event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestAction {
    Start,
    Run,
    Pause,
    Cont,
    Pass,
    Bench,
    Fail,
    Output,
    Skip,
    /// Actions added by newer test runners
    #[serde(untagged)]
    Other(String),
}

/// One record of the test-event wire protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    pub action: TestAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Fields this schema does not model, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rewrites embedded log payloads of `output` events, passing everything else through.
#[derive(Debug, Clone)]
pub struct TestEventConverter<C> {
    inner: C,
}

impl<C: OutputConverter> TestEventConverter<C> {
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }

    /// `None` means the line must be emitted unchanged
    fn rewrite(&self, line: &[u8]) -> Option<Vec<u8>> {
        if line.first() != Some(&b'{') {
            return None;
        }

        // The raw map keeps field order and unmodelled fields; the typed
        // decode only validates the line against the event schema.
        let mut raw: Value = serde_json::from_slice(line).ok()?;
        let event = TestEvent::deserialize(&raw).ok()?;
        if event.action != TestAction::Output {
            return None;
        }
        let output = event.output?;
        if !output.starts_with('{') {
            return None;
        }

        let converted = self.inner.convert(output.as_bytes());
        let converted = String::from_utf8_lossy(&converted).into_owned();
        raw.as_object_mut()?
            .insert(OUTPUT_KEY.to_string(), Value::String(converted));

        let mut encoded = serde_json::to_vec(&raw).ok()?;
        encoded.push(b'\n');
        Some(encoded)
    }
}

impl<C: OutputConverter> OutputConverter for TestEventConverter<C> {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        match self.rewrite(line) {
            Some(rewritten) => Cow::Owned(rewritten),
            None => Cow::Borrowed(line),
        }
    }
}
