//! Behaviour of the JSON-aware converter on the test-event stream

use keel_core::output::{LogLineRenderer, OutputConverter, TestAction, TestEvent, TestEventConverter};
use serde_json::Value;
use std::borrow::Cow;

/// Upper-cases the message of a JSON log line, leaving its other fields alone
struct ShoutingConverter;

impl OutputConverter for ShoutingConverter {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        let Ok(mut record) = serde_json::from_slice::<Value>(line) else {
            return Cow::Borrowed(line);
        };
        let Some(fields) = record.as_object_mut() else {
            return Cow::Borrowed(line);
        };
        for key in ["msg", "message"] {
            if let Some(Value::String(text)) = fields.get_mut(key) {
                *text = text.to_uppercase();
            }
        }
        let mut out = serde_json::to_vec(&record).unwrap_or_else(|_| line.to_vec());
        out.push(b'\n');
        Cow::Owned(out)
    }
}

fn converter() -> TestEventConverter<ShoutingConverter> {
    TestEventConverter::new(ShoutingConverter)
}

fn decode(line: &[u8]) -> Value {
    serde_json::from_slice(line).unwrap()
}

#[test]
fn test_non_json_lines_pass_through_unchanged() {
    let converter = converter();
    let lines: [&[u8]; 5] = [
        b"=== RUN   TestFoo\n",
        b"--- PASS: TestFoo (0.00s)\n",
        b"",
        b"\n",
        b" {\"Action\":\"output\"}\n",
    ];

    for line in lines {
        assert_eq!(converter.convert(line).as_ref(), line);
    }
}

#[test]
fn test_non_output_events_pass_through_unchanged() {
    let converter = converter();
    let lines: [&[u8]; 3] = [
        b"{\"Time\":\"2024-05-01T10:11:12Z\",\"Action\":\"run\",\"Package\":\"app\",\"Test\":\"TestA\"}\n",
        b"{\"Action\":\"pass\",\"Package\":\"app\",\"Elapsed\":0.01}\n",
        b"{\"Action\":\"fail\",\"Output\":\"{\\\"msg\\\":\\\"not rewritten\\\"}\"}\n",
    ];

    for line in lines {
        assert_eq!(converter.convert(line).as_ref(), line);
    }
}

#[test]
fn test_plain_text_output_passes_through_unchanged() {
    let converter = converter();
    let line = b"{\"Action\":\"output\",\"Test\":\"TestA\",\"Output\":\"=== RUN   TestA\\n\"}\n";
    assert_eq!(converter.convert(line).as_ref(), line);
}

#[test]
fn test_malformed_lines_pass_through_unchanged() {
    let converter = converter();
    let lines: [&[u8]; 3] = [
        b"{\"Action\":\"output\",\"Output\":\n",
        b"{\"Output\":\"{\\\"msg\\\":\\\"no action\\\"}\"}\n",
        b"{\"Action\":\"output\",\"Output\":42}\n",
    ];

    for line in lines {
        assert_eq!(converter.convert(line).as_ref(), line);
    }
}

#[test]
fn test_embedded_log_output_is_converted() {
    let converter = converter();
    let line = b"{\"Action\":\"output\",\"Output\":\"{\\\"level\\\":\\\"info\\\",\\\"msg\\\":\\\"hi\\\"}\\n\"}\n";

    let converted = converter.convert(line);
    let event: TestEvent = serde_json::from_slice(&converted).unwrap();

    assert_eq!(event.action, TestAction::Output);
    let output = event.output.unwrap();
    assert!(output.contains("\"HI\""), "output was {output:?}");
    assert!(output.ends_with('\n'));
}

#[test]
fn test_only_output_field_changes() {
    let converter = converter();
    let line = concat!(
        "{\"Time\":\"2024-05-01T10:11:12.123456789+02:00\",\"Action\":\"output\",",
        "\"Package\":\"app/users\",\"Test\":\"TestGet\",",
        "\"Output\":\"{\\\"msg\\\":\\\"hello\\\"}\\n\"}\n"
    );

    let converted = converter.convert(line.as_bytes());
    assert!(converted.ends_with(b"\n"));

    let mut before = decode(line.as_bytes());
    let after = decode(&converted);
    before["Output"] = after["Output"].clone();
    assert_eq!(before, after);

    // The original timestamp text is kept, not re-rendered.
    assert_eq!(after["Time"], "2024-05-01T10:11:12.123456789+02:00");
}

#[test]
fn test_unknown_fields_survive_in_order() {
    let converter = converter();
    let line = concat!(
        "{\"Action\":\"output\",\"ImportPath\":\"app/users [app/users.test]\",",
        "\"Output\":\"{\\\"msg\\\":\\\"x\\\"}\\n\",\"Zeta\":1,\"Alpha\":[true]}\n"
    );

    let converted = converter.convert(line.as_bytes());
    let after = decode(&converted);
    let keys: Vec<&str> = after.as_object().unwrap().keys().map(String::as_str).collect();

    assert_eq!(keys, vec!["Action", "ImportPath", "Output", "Zeta", "Alpha"]);
    assert_eq!(after["ImportPath"], "app/users [app/users.test]");
    assert_eq!(after["Alpha"], serde_json::json!([true]));
}

#[test]
fn test_pass_through_is_idempotent() {
    let converter = converter();
    let lines: [&[u8]; 3] = [
        b"ok  \tapp/users\t0.012s\n",
        b"{\"Action\":\"pass\",\"Test\":\"TestA\"}\n",
        b"{\"Action\":\"output\",\"Output\":\"PASS\\n\"}\n",
    ];

    for line in lines {
        let once = converter.convert(line).into_owned();
        let twice = converter.convert(&once).into_owned();
        assert_eq!(once, twice);
    }
}

#[test]
fn test_log_renderer_inside_event_stream() {
    let converter = TestEventConverter::new(LogLineRenderer::new(false));
    let line = b"{\"Action\":\"output\",\"Output\":\"{\\\"level\\\":\\\"warn\\\",\\\"message\\\":\\\"slow query\\\",\\\"ms\\\":120}\\n\"}\n";

    let converted = converter.convert(line);
    let event: TestEvent = serde_json::from_slice(&converted).unwrap();

    assert_eq!(event.output.as_deref(), Some("WRN slow query ms=120\n"));
}
