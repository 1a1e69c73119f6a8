//! Per-line output conversion
//!
//! Everything the daemon streams back goes through an [`OutputConverter`]
//! one line at a time. The base converter renders structured log lines for
//! humans; when the test runner was asked for its JSON event stream, the
//! [`TestEventConverter`] wraps the base converter so only the embedded log
//! payloads are rewritten and the event framing survives intact.

pub mod log_line;
pub mod test_event;
pub mod writer;

pub use log_line::LogLineRenderer;
pub use test_event::{TestAction, TestEvent, TestEventConverter};
pub use writer::LineBuffer;

use crate::args::requests_json_events;
use std::borrow::Cow;

/// Converts one line of output (terminator included)
pub trait OutputConverter: Send + Sync {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]>;
}

impl<C: OutputConverter + ?Sized> OutputConverter for Box<C> {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        (**self).convert(line)
    }
}

impl<C: OutputConverter + ?Sized> OutputConverter for &C {
    fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        (**self).convert(line)
    }
}

/// Pick the converter for a test run.
pub fn select_converter<S: AsRef<str>>(args: &[S], color: bool) -> Box<dyn OutputConverter> {
    let base = LogLineRenderer::new(color);
    if requests_json_events(args) {
        tracing::debug!("test runner emits JSON events, converting embedded output only");
        Box::new(TestEventConverter::new(base))
    } else {
        Box::new(base)
    }
}
