//! Compiled projects: the daemon runs the tests and streams output back

use crate::daemon::{DaemonClient, FrameTarget, OutputFrame, StreamEvent, TestRequest};
use crate::error::{DaemonError, KeelError, KeelResult};
use crate::interrupt::InterruptHandle;
use crate::output::{LineBuffer, OutputConverter};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

/// How a test run stream came to an end
#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamStatus {
    /// The daemon reported an exit code
    Exited(i32),
    /// The stream closed without an exit code
    Ended,
    /// Interrupted by the user
    Cancelled,
    /// The daemon refused the run; carries its explanation
    Refused(String),
}

/// Converts frames line by line and writes them to the matching terminal stream.
///
/// This is the only writer of test output; each target keeps its own buffer
/// for unterminated lines.
struct ConvertingSink<'c, C: ?Sized, O, E> {
    converter: &'c C,
    stdout: O,
    stderr: E,
    stdout_lines: LineBuffer,
    stderr_lines: LineBuffer,
}

impl<'c, C, O, E> ConvertingSink<'c, C, O, E>
where
    C: OutputConverter + ?Sized,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    fn new(converter: &'c C, stdout: O, stderr: E) -> Self {
        Self {
            converter,
            stdout,
            stderr,
            stdout_lines: LineBuffer::new(),
            stderr_lines: LineBuffer::new(),
        }
    }

    async fn write_frame(&mut self, frame: &OutputFrame) -> std::io::Result<()> {
        match frame.target {
            FrameTarget::Stdout => {
                let converted = self.stdout_lines.push(self.converter, &frame.data);
                write_flushed(&mut self.stdout, &converted).await
            }
            FrameTarget::Stderr => {
                let converted = self.stderr_lines.push(self.converter, &frame.data);
                write_flushed(&mut self.stderr, &converted).await
            }
        }
    }

    async fn write_diagnostics(&mut self, text: &str) -> std::io::Result<()> {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        write_flushed(&mut self.stderr, text.as_bytes()).await
    }

    async fn write_event(&mut self, event: &StreamEvent) -> std::io::Result<()> {
        match event {
            StreamEvent::Output(frame) => self.write_frame(frame).await,
            StreamEvent::Diagnostics(text) => self.write_diagnostics(text).await,
            StreamEvent::Exit(_) => Ok(()),
        }
    }

    /// Convert and write any unterminated lines still buffered
    async fn flush_pending(&mut self) -> std::io::Result<()> {
        let out = self.stdout_lines.finish(self.converter);
        write_flushed(&mut self.stdout, &out).await?;
        let err = self.stderr_lines.finish(self.converter);
        write_flushed(&mut self.stderr, &err).await
    }
}

async fn write_flushed<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Run a compiled test through the daemon, relaying converted output.
///
/// Returns the exit code the process should finish with.
#[instrument(skip_all, fields(app_root = %request.app_root.display(), args = ?request.args))]
pub async fn run_stream_flow<D, C, O, E>(
    daemon: &D,
    request: TestRequest,
    converter: &C,
    interrupt: &InterruptHandle,
    stdout: O,
    stderr: E,
) -> KeelResult<i32>
where
    D: DaemonClient + ?Sized,
    C: OutputConverter + ?Sized,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut events = tokio::select! {
        biased;
        _ = interrupt.cancelled() => return Err(KeelError::Cancelled),
        result = daemon.run_compiled_test(request, interrupt.token()) => result?,
    };

    let mut sink = ConvertingSink::new(converter, stdout, stderr);

    let status = loop {
        tokio::select! {
            biased;
            event = events.next() => match event {
                Some(Ok(StreamEvent::Exit(code))) => break StreamStatus::Exited(code),
                Some(Ok(event)) => sink.write_event(&event).await?,
                Some(Err(DaemonError::FailedPrecondition { message })) => break StreamStatus::Refused(message),
                Some(Err(e)) => {
                    sink.flush_pending().await?;
                    return Err(e.into());
                }
                None => break StreamStatus::Ended,
            },
            _ = interrupt.cancelled() => {
                debug!(reason = ?interrupt.reason(), "test run interrupted, waiting for the daemon call to end");
                // The stream closes only after the daemon has been told to stop.
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) => sink.write_event(&event).await?,
                        Err(e) => {
                            debug!("test run stream failed after interrupt: {}", e);
                            break;
                        }
                    }
                }
                break StreamStatus::Cancelled;
            }
        }
    };

    sink.flush_pending().await?;
    debug!(?status, "test run stream finished");

    match status {
        StreamStatus::Exited(code) => Ok(code),
        StreamStatus::Ended | StreamStatus::Cancelled => Ok(0),
        StreamStatus::Refused(message) => {
            sink.write_diagnostics(&message).await?;
            Ok(1)
        }
    }
}
