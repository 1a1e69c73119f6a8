//! Local socket transport for the daemon
//!
//! Every call opens its own connection, writes one request line and reads
//! response lines until a terminal one arrives.

use super::protocol::{
    DaemonRequest, DaemonResponse, OutputFrame, StreamEvent, TestRequest, TestSpec, TestSpecRequest,
};
use super::{DaemonClient, DaemonEndpoint, EventStream};
use crate::error::DaemonError;
use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Events buffered between the socket reader and the consuming flow
const EVENT_BUFFER: usize = 64;

trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

type ResponseLines = Lines<BufReader<ReadHalf<Box<dyn Connection>>>>;
type RequestWriter = WriteHalf<Box<dyn Connection>>;

/// Daemon client speaking JSON-Lines over a Unix or TCP socket
#[derive(Debug, Clone)]
pub struct SocketDaemonClient {
    endpoint: DaemonEndpoint,
}

impl SocketDaemonClient {
    pub fn new(endpoint: DaemonEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &DaemonEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DaemonError> {
        let unavailable = |e: std::io::Error| DaemonError::unavailable(self.endpoint.to_string(), e.to_string());

        match &self.endpoint {
            #[cfg(unix)]
            DaemonEndpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await.map_err(unavailable)?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            DaemonEndpoint::Unix(_) => Err(DaemonError::unavailable(
                self.endpoint.to_string(),
                "unix sockets are not supported on this platform",
            )),
            DaemonEndpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr).await.map_err(unavailable)?;
                Ok(Box::new(stream))
            }
        }
    }

    /// Connect and send `request`, returning both halves of the connection
    async fn call(&self, request: &DaemonRequest) -> Result<(ResponseLines, RequestWriter), DaemonError> {
        let connection = self.connect().await?;
        let (reader, mut writer) = tokio::io::split(connection);
        send_request(&mut writer, request).await?;
        Ok((BufReader::new(reader).lines(), writer))
    }
}

#[async_trait]
impl DaemonClient for SocketDaemonClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn test_spec(&self, request: TestSpecRequest) -> Result<TestSpec, DaemonError> {
        let (mut lines, _writer) = self.call(&DaemonRequest::TestSpec(request)).await?;

        match next_response(&mut lines).await? {
            Some(DaemonResponse::TestSpec(spec)) => Ok(spec),
            Some(DaemonResponse::Error { code, message }) => Err(DaemonError::from_remote(&code, message)),
            Some(other) => Err(DaemonError::protocol(format!(
                "expected a test spec, got {other:?}"
            ))),
            None => Err(DaemonError::transport(
                "connection closed before the test spec was received",
            )),
        }
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn run_compiled_test(
        &self,
        request: TestRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, DaemonError> {
        let (lines, writer) = self.call(&DaemonRequest::RunTest(request)).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(lines, writer, cancel, tx));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

async fn send_request<W>(writer: &mut W, request: &DaemonRequest) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
{
    let line = request.to_json_line()?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next non-blank response line; `None` on a clean close
async fn next_response<R>(lines: &mut Lines<R>) -> Result<Option<DaemonResponse>, DaemonError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        return Ok(Some(DaemonResponse::from_json_line(&line)?));
    }
    Ok(None)
}

/// Translate a response into a stream event; `Ok(None)` ends the stream.
fn into_event(response: DaemonResponse) -> Result<Option<StreamEvent>, DaemonError> {
    match response {
        DaemonResponse::Output { stream, data } => Ok(Some(StreamEvent::Output(OutputFrame {
            target: stream,
            data: data.into_bytes(),
        }))),
        DaemonResponse::Diagnostics { message } => Ok(Some(StreamEvent::Diagnostics(message))),
        DaemonResponse::Exit { code } => Ok(Some(StreamEvent::Exit(code))),
        DaemonResponse::Error { code, .. } if code == "cancelled" => Ok(None),
        DaemonResponse::Error { code, message } => Err(DaemonError::from_remote(&code, message)),
        DaemonResponse::TestSpec(_) => Err(DaemonError::protocol(
            "received a test spec on a test run stream",
        )),
    }
}

/// Move decoded responses into `tx` in order until a terminal one arrives.
async fn pump_events<R, W>(
    mut lines: Lines<R>,
    mut writer: W,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<StreamEvent, DaemonError>>,
) where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("test run cancelled, notifying daemon");
                if let Err(e) = send_request(&mut writer, &DaemonRequest::Cancel).await {
                    debug!("could not deliver cancel request: {}", e);
                }
                let _ = writer.shutdown().await;
                break;
            }
            response = next_response(&mut lines) => response,
        };

        let event = match response.and_then(|r| r.map(into_event).transpose()) {
            Ok(Some(Some(event))) => Ok(event),
            Ok(Some(None)) | Ok(None) => break,
            Err(e) => Err(e),
        };

        let terminal = !matches!(event, Ok(StreamEvent::Output(_)) | Ok(StreamEvent::Diagnostics(_)));
        if tx.send(event).await.is_err() {
            warn!("test run stream dropped before the daemon finished");
            break;
        }
        if terminal {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn lines_of(input: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(input.as_bytes()).lines()
    }

    #[tokio::test]
    async fn test_next_response_skips_blank_lines() {
        let mut lines = lines_of("\n  \n{\"type\":\"exit\",\"code\":3}\n");
        let response = next_response(&mut lines).await.unwrap();
        assert_eq!(response, Some(DaemonResponse::Exit { code: 3 }));
        assert_eq!(next_response(&mut lines).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pump_events_stops_at_exit() {
        let lines = lines_of(concat!(
            "{\"type\":\"output\",\"stream\":\"stdout\",\"data\":\"ok\\n\"}\n",
            "{\"type\":\"diagnostics\",\"message\":\"main.go:1: unused\"}\n",
            "{\"type\":\"exit\",\"code\":2}\n",
            "{\"type\":\"output\",\"stream\":\"stdout\",\"data\":\"late\\n\"}\n",
        ));
        let (tx, rx) = mpsc::channel(8);

        pump_events(lines, tokio::io::sink(), CancellationToken::new(), tx).await;

        let events: Vec<_> = ReceiverStream::new(rx).map(Result::unwrap).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Output(OutputFrame::stdout("ok\n")),
                StreamEvent::Diagnostics("main.go:1: unused".to_string()),
                StreamEvent::Exit(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_pump_events_reports_remote_errors() {
        let lines = lines_of("{\"type\":\"error\",\"code\":\"failed_precondition\",\"message\":\"build failed\"}\n");
        let (tx, mut rx) = mpsc::channel(8);

        pump_events(lines, tokio::io::sink(), CancellationToken::new(), tx).await;

        let err = rx.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, DaemonError::FailedPrecondition { .. }));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_events_treats_cancelled_as_clean_end() {
        let lines = lines_of("{\"type\":\"error\",\"code\":\"cancelled\",\"message\":\"\"}\n");
        let (tx, mut rx) = mpsc::channel(8);

        pump_events(lines, tokio::io::sink(), CancellationToken::new(), tx).await;

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_events_sends_cancel_when_token_fires() {
        let (client, server) = tokio::io::duplex(1024);
        let (_client_read, client_write) = tokio::io::split(client);
        let (server_read, _server_write) = tokio::io::split(server);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(8);

        pump_events(lines_of(""), client_write, cancel, tx).await;

        let mut server_lines = BufReader::new(server_read).lines();
        assert_eq!(
            server_lines.next_line().await.unwrap().as_deref(),
            Some("{\"method\":\"cancel\"}")
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let client = SocketDaemonClient::new(DaemonEndpoint::Unix(dir.path().join("missing.sock")));

        let err = client
            .test_spec(TestSpecRequest {
                app_root: dir.path().to_path_buf(),
                working_dir: ".".into(),
                args: Vec::new(),
                environ: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::Unavailable { .. }));
    }
}
