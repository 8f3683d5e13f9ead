//! Async DAP client for one adapter process.
//!
//! Owns the transport (writer task + reader task), the request
//! dispatcher, and the outbound event channel. Responses and events
//! arrive on the same inbound stream but are routed independently:
//! a slow event consumer never stalls response correlation.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;

use crate::capabilities::AdapterCapabilities;
use crate::dispatcher::Dispatcher;
use crate::error::DapError;
use crate::framing::{encode_message, FrameDecoder};
use crate::protocol::{Capabilities, Event, InitializeArguments, Message, Request};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A connected DAP client.
///
/// Construct with [`DapClient::spawn`] for a real adapter subprocess,
/// or [`DapClient::from_streams`] to drive any byte-stream pair
/// (tests use `tokio::io::duplex`).
pub struct DapClient {
    dispatcher: Arc<Mutex<Dispatcher>>,
    writer_tx: mpsc::Sender<Vec<u8>>,
    events_rx: Option<mpsc::UnboundedReceiver<Event>>,
    initialized_rx: Mutex<Option<oneshot::Receiver<()>>>,
    child: Mutex<Option<Child>>,
    request_timeout: Duration,
}

impl DapClient {
    /// Spawn an adapter subprocess and connect over its stdio.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, DapError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DapError::Transport("could not capture adapter stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DapError::Transport("could not capture adapter stdout".into()))?;

        Ok(Self::build(stdout, stdin, Some(child)))
    }

    /// Connect over an arbitrary reader/writer pair.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::build(reader, writer, None)
    }

    fn build<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new()));
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
        let (initialized_tx, initialized_rx) = oneshot::channel::<()>();

        // Writer task: drains framed messages to the adapter.
        tokio::spawn(async move {
            let mut writer = writer;
            while let Some(bytes) = writer_rx.recv().await {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        // Reader task: frames the inbound stream, completes pending
        // requests, forwards events. Exits on EOF, read error, or a
        // protocol error; all three fail every pending request.
        let reader_dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let mut reader = reader;
            let mut decoder = FrameDecoder::new();
            let mut initialized_tx = Some(initialized_tx);
            let mut buf = [0u8; 8192];
            'transport: loop {
                let n = match reader.read(&mut buf).await {
                    Ok(0) => break 'transport,
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!(error = %e, "transport read failed");
                        break 'transport;
                    }
                };
                decoder.extend(&buf[..n]);
                loop {
                    let value = match decoder.next_message() {
                        Ok(Some(value)) => value,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(error = %e, "unrecoverable frame error, closing transport");
                            break 'transport;
                        }
                    };
                    match Message::classify(value) {
                        Ok(Message::Response(response)) => {
                            reader_dispatcher.lock().await.complete(response);
                        }
                        Ok(Message::Event(event)) => {
                            if event.event == "initialized" {
                                if let Some(tx) = initialized_tx.take() {
                                    let _ = tx.send(());
                                }
                            }
                            // Receiver gone means nobody cares anymore.
                            let _ = events_tx.send(event);
                        }
                        Ok(Message::Request(request)) => {
                            tracing::debug!(command = %request.command, "reverse request ignored");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "unrecoverable protocol error, closing transport");
                            break 'transport;
                        }
                    }
                }
            }
            reader_dispatcher.lock().await.fail_all();
        });

        Self {
            dispatcher,
            writer_tx,
            events_rx: Some(events_rx),
            initialized_rx: Mutex::new(Some(initialized_rx)),
            child: Mutex::new(child),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Take the inbound event channel. Yields `Some` exactly once;
    /// the session layer consumes it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.events_rx.take()
    }

    /// Override the per-request timeout.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// Send a request and await its response body.
    ///
    /// Fails with [`DapError::Request`] when the adapter rejects the
    /// command, [`DapError::Timeout`] when no response arrives in
    /// time, and [`DapError::TransportClosed`] when the transport
    /// dies while the request is pending.
    pub async fn request(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, DapError> {
        let (seq, rx) = self.dispatcher.lock().await.register();
        let request = Request::new(seq, command, arguments);
        let value = serde_json::to_value(&request)
            .map_err(|e| DapError::Protocol(format!("unserializable request: {e}")))?;

        self.writer_tx
            .send(encode_message(&value))
            .await
            .map_err(|_| DapError::TransportClosed)?;

        match timeout(self.request_timeout, rx).await {
            Err(_) => {
                self.dispatcher.lock().await.forget(seq);
                Err(DapError::Timeout {
                    command: command.to_string(),
                })
            }
            Ok(Err(_)) => Err(DapError::TransportClosed),
            Ok(Ok(outcome)) => outcome,
        }
    }

    /// Run the initialize handshake: send the `initialize` request
    /// and wait for the adapter's `initialized` event. Returns the
    /// adapter's resolved capabilities.
    pub async fn initialize(&self, adapter_id: &str) -> Result<AdapterCapabilities, DapError> {
        let args = InitializeArguments::for_adapter(adapter_id);
        let value = serde_json::to_value(&args)
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self.request("initialize", Some(value)).await?;

        let caps: Capabilities = match body {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| DapError::Protocol(format!("bad capabilities body: {e}")))?,
            None => Capabilities::default(),
        };

        let pending = self.initialized_rx.lock().await.take();
        if let Some(rx) = pending {
            timeout(self.request_timeout, rx)
                .await
                .map_err(|_| DapError::Timeout {
                    command: "initialize".into(),
                })?
                .map_err(|_| DapError::TransportClosed)?;
        }

        Ok(AdapterCapabilities::from_initialize_response(&caps))
    }

    /// How many requests are currently in flight.
    pub async fn pending_requests(&self) -> usize {
        self.dispatcher.lock().await.pending_count()
    }

    /// Whether the outbound side of the transport is closed.
    pub fn is_closed(&self) -> bool {
        self.writer_tx.is_closed()
    }

    /// Tear the transport down: kill the adapter process (if we
    /// spawned one) and fail every pending request.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        self.dispatcher.lock().await.fail_all();
    }
}

impl std::fmt::Debug for DapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapClient")
            .field("request_timeout", &self.request_timeout)
            .field("writer_closed", &self.writer_tx.is_closed())
            .finish()
    }
}
