//! One debug session: lifecycle state machine plus the stores and
//! event plumbing that hang off it.
//!
//! All mutable session state lives in `SessionInner` behind a single
//! async mutex. Mutating operations hold the lock across their
//! adapter round trip, so state transitions are serialized; response
//! correlation happens in the transport layer and never needs this
//! lock, so holding it across an await cannot deadlock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{broadcast, Mutex};

use drover_dap::protocol::{
    AttachArguments, BreakpointEventBody, ContinueArguments, ContinuedEventBody,
    DisconnectArguments, EvaluateArguments, EvaluateResponseBody, ExceptionFilterOptions,
    ExceptionInfoArguments, ExceptionInfoResponseBody, Event, ExitedEventBody, LaunchArguments,
    NextArguments, OutputEventBody, PauseArguments, Scope,
    ScopesArguments, ScopesResponseBody, SetBreakpointsArguments, SetBreakpointsResponseBody,
    SetExceptionBreakpointsArguments, Source, StackFrame, StackTraceArguments,
    StackTraceResponseBody, StepInArguments, StepOutArguments, StoppedEventBody, Thread,
    ThreadsResponseBody, Variable, VariablesArguments, VariablesResponseBody,
};
use drover_dap::{AdapterCapabilities, DapClient, DapError};
use drover_sourcemap::SourceMapper;

use crate::breakpoints::{Breakpoint, BreakpointSpec, BreakpointStats, BreakpointStore};
use crate::error::SessionError;
use crate::events::{EventLog, EventRecord};
use crate::watch::{Watch, WatchStore};

/// Capacity of the per-session event broadcast channel. Observers
/// that lag past this see `RecvError::Lagged` and can resync from
/// the event log.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshaking with the adapter.
    Connecting,
    /// Handshake complete, no debuggee yet.
    Connected,
    /// The debuggee is executing.
    Running,
    /// The debuggee is paused.
    Stopped,
    /// The session has ended.
    Terminated,
    /// The session failed and cannot continue.
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::Terminated => "terminated",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// A point-in-time summary of one session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// The session id.
    pub id: String,
    /// The adapter the session runs against.
    pub adapter: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Launched program, if any.
    pub program: Option<String>,
    /// Number of breakpoints across all sources.
    pub breakpoints: usize,
    /// Number of watch expressions.
    pub watches: usize,
    /// When the session was created.
    pub created_at: SystemTime,
}

struct SessionInner {
    state: SessionState,
    capabilities: AdapterCapabilities,
    program: Option<String>,
    use_source_maps: bool,
    mapper: SourceMapper,
    current_thread: Option<i64>,
    current_frame: Option<i64>,
    log_sink: Option<PathBuf>,
    last_activity: Instant,
    breakpoints: BreakpointStore,
    watches: WatchStore,
    log: EventLog,
}

impl SessionInner {
    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn require(&self, operation: &str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::state(operation, self.state))
        }
    }
}

/// A live debug session against one adapter process.
pub struct DebugSession {
    id: String,
    adapter_name: String,
    launch_hints: serde_json::Map<String, serde_json::Value>,
    client: DapClient,
    inner: Mutex<SessionInner>,
    events_tx: broadcast::Sender<EventRecord>,
    created_at: SystemTime,
}

impl DebugSession {
    /// Connect a session over an already-constructed client: run the
    /// initialize handshake, finish configuration, and start the
    /// event loop. On success the session is `Connected`.
    pub async fn connect(
        id: impl Into<String>,
        adapter_name: impl Into<String>,
        launch_hints: serde_json::Map<String, serde_json::Value>,
        mut client: DapClient,
    ) -> Result<Arc<Self>, SessionError> {
        let adapter_name = adapter_name.into();
        let events = client
            .take_events()
            .ok_or_else(|| DapError::Transport("event channel already taken".into()))?;

        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = Arc::new(Self {
            id: id.into(),
            adapter_name: adapter_name.clone(),
            launch_hints,
            client,
            inner: Mutex::new(SessionInner {
                state: SessionState::Connecting,
                capabilities: AdapterCapabilities::default(),
                program: None,
                use_source_maps: false,
                mapper: SourceMapper::new(),
                current_thread: None,
                current_frame: None,
                log_sink: None,
                last_activity: Instant::now(),
                breakpoints: BreakpointStore::new(),
                watches: WatchStore::new(),
                log: EventLog::new(),
            }),
            events_tx,
            created_at: SystemTime::now(),
        });

        tokio::spawn(Self::event_loop(Arc::clone(&session), events));

        match session.handshake(&adapter_name).await {
            Ok(()) => Ok(session),
            Err(e) => {
                let mut inner = session.inner.lock().await;
                inner.state = SessionState::Error;
                drop(inner);
                session.client.shutdown().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, adapter_name: &str) -> Result<(), SessionError> {
        let capabilities = self.client.initialize(adapter_name).await?;
        if capabilities.supports_configuration_done_request {
            self.client.request("configurationDone", None).await?;
        }
        let mut inner = self.inner.lock().await;
        inner.capabilities = capabilities;
        inner.state = SessionState::Connected;
        inner.touch();
        Ok(())
    }

    // -----------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------

    /// Drains the adapter's event stream, applies each event's effect
    /// under the session lock, then publishes an immutable record.
    /// The single-consumer loop means observers never see partially
    /// applied state.
    async fn event_loop(
        session: Arc<Self>,
        mut events: tokio::sync::mpsc::UnboundedReceiver<Event>,
    ) {
        while let Some(event) = events.recv().await {
            session.apply_event(&event).await;
            let (record, sink) = {
                let mut inner = session.inner.lock().await;
                let record = EventRecord::from_event(&session.id, &event);
                inner.log.push(record.clone());
                (record, inner.log_sink.clone())
            };
            if let Some(path) = sink {
                Self::write_sink_line(&path, &record);
            }
            // No subscribers is fine.
            let _ = session.events_tx.send(record);
        }

        // Channel closed: the transport is gone. Anything but a
        // deliberate teardown is a session failure.
        let mut inner = session.inner.lock().await;
        if inner.state != SessionState::Terminated {
            tracing::error!(session = %session.id, "adapter transport closed unexpectedly");
            inner.state = SessionState::Error;
            let record = EventRecord::synthetic(&session.id, "transport_closed");
            inner.log.push(record.clone());
            drop(inner);
            let _ = session.events_tx.send(record);
        }
    }

    /// Append one record to the session's log file. Best effort: a
    /// failing sink is reported once per write, never fatal.
    fn write_sink_line(path: &Path, record: &EventRecord) {
        use std::io::Write as _;
        let millis = record
            .timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let line = serde_json::json!({
            "ts": millis,
            "session": record.session_id,
            "event": record.kind,
            "body": record.payload,
        });
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            tracing::warn!(sink = %path.display(), error = %e, "could not write event log sink");
        }
    }

    async fn apply_event(&self, event: &Event) {
        match event.event.as_str() {
            "stopped" => {
                let body: StoppedEventBody =
                    match serde_json::from_value(event.body.clone().unwrap_or_default()) {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::warn!(session = %self.id, error = %e, "unreadable stopped event");
                            return;
                        }
                    };
                let mut inner = self.inner.lock().await;
                inner.state = SessionState::Stopped;
                if let Some(tid) = body.thread_id {
                    inner.current_thread = Some(tid);
                }
                if let Some(ids) = &body.hit_breakpoint_ids {
                    let hit = inner.breakpoints.record_hits(ids);
                    if hit.len() < ids.len() {
                        tracing::debug!(session = %self.id, "stop referenced untracked breakpoints");
                    }
                }
                let thread = inner.current_thread;
                drop(inner);
                if let Some(tid) = thread {
                    self.refresh_top_frame(tid).await;
                }
            }
            "continued" => {
                // The body is optional on the wire.
                if let Some(body) = event
                    .body
                    .clone()
                    .and_then(|v| serde_json::from_value::<ContinuedEventBody>(v).ok())
                {
                    tracing::debug!(
                        session = %self.id,
                        thread = body.thread_id,
                        all = body.all_threads_continued.unwrap_or(false),
                        "execution continued"
                    );
                }
                let mut inner = self.inner.lock().await;
                inner.state = SessionState::Running;
                inner.current_frame = None;
            }
            "exited" => {
                if let Some(body) = event
                    .body
                    .clone()
                    .and_then(|v| serde_json::from_value::<ExitedEventBody>(v).ok())
                {
                    tracing::info!(session = %self.id, code = body.exit_code, "debuggee exited");
                }
                let mut inner = self.inner.lock().await;
                inner.state = SessionState::Terminated;
                inner.current_thread = None;
                inner.current_frame = None;
            }
            "terminated" => {
                let mut inner = self.inner.lock().await;
                inner.state = SessionState::Terminated;
                inner.current_thread = None;
                inner.current_frame = None;
            }
            "output" => {
                if let Some(body) = event
                    .body
                    .clone()
                    .and_then(|v| serde_json::from_value::<OutputEventBody>(v).ok())
                {
                    tracing::debug!(
                        session = %self.id,
                        category = body.category.as_deref().unwrap_or("console"),
                        output = %body.output.trim_end(),
                        "adapter output"
                    );
                }
            }
            "breakpoint" => {
                let body: BreakpointEventBody =
                    match serde_json::from_value(event.body.clone().unwrap_or_default()) {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::warn!(session = %self.id, error = %e, "unreadable breakpoint event");
                            return;
                        }
                    };
                let mut inner = self.inner.lock().await;
                inner.breakpoints.apply_change(&body.breakpoint);
            }
            // initialized and anything else: logged only.
            _ => {}
        }
    }

    /// Re-sync the frame cursor after a stop. Best effort: a failed
    /// stackTrace leaves the cursor unset rather than failing the
    /// event loop.
    async fn refresh_top_frame(&self, thread_id: i64) {
        let args = StackTraceArguments {
            thread_id,
            levels: Some(1),
        };
        let result = match serde_json::to_value(&args) {
            Ok(value) => self.client.request("stackTrace", Some(value)).await,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "could not build stackTrace arguments");
                return;
            }
        };
        let frame = result
            .ok()
            .flatten()
            .and_then(|body| serde_json::from_value::<StackTraceResponseBody>(body).ok())
            .and_then(|body| body.stack_frames.first().map(|f| f.id));
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Stopped {
            inner.current_frame = frame;
        }
    }

    // -----------------------------------------------------------------
    // Launch and flow control
    // -----------------------------------------------------------------

    /// Launch a program under the debugger. Adapter-specific launch
    /// hints from the registry fill in any keys the caller left out.
    pub async fn launch(
        &self,
        program: &str,
        args: Vec<String>,
        stop_on_entry: bool,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("launch", &[SessionState::Connected])?;

        let launch = LaunchArguments {
            program: Some(program.to_string()),
            args: if args.is_empty() { None } else { Some(args) },
            cwd: None,
            env: None,
            stop_on_entry: Some(stop_on_entry),
            no_debug: None,
        };
        let mut value = serde_json::to_value(&launch)
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        if let Some(object) = value.as_object_mut() {
            for (key, hint) in &self.launch_hints {
                object.entry(key.clone()).or_insert_with(|| hint.clone());
            }
        }

        self.client.request("launch", Some(value)).await?;
        inner.program = Some(program.to_string());
        inner.state = SessionState::Running;
        Ok(())
    }

    /// Attach to an already-running debuggee.
    pub async fn attach(&self, process_id: Option<i64>) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("attach", &[SessionState::Connected])?;

        let attach = AttachArguments { process_id };
        let mut value = serde_json::to_value(&attach)
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        if let Some(object) = value.as_object_mut() {
            for (key, hint) in &self.launch_hints {
                object.entry(key.clone()).or_insert_with(|| hint.clone());
            }
        }

        self.client.request("attach", Some(value)).await?;
        inner.state = SessionState::Running;
        Ok(())
    }

    async fn resume(
        &self,
        command: &str,
        operation: &str,
        thread_id: Option<i64>,
        build: fn(i64) -> serde_json::Result<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require(operation, &[SessionState::Stopped])?;
        let tid = thread_id.or(inner.current_thread).ok_or_else(|| {
            SessionError::state(&format!("{operation} without a stopped thread"), inner.state)
        })?;
        let value =
            build(tid).map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        self.client.request(command, Some(value)).await?;
        inner.state = SessionState::Running;
        inner.current_frame = None;
        Ok(())
    }

    /// Resume execution. Defaults to the thread of the last stop.
    pub async fn continue_execution(&self, thread_id: Option<i64>) -> Result<(), SessionError> {
        self.resume("continue", "continue", thread_id, |tid| {
            serde_json::to_value(ContinueArguments { thread_id: tid })
        })
        .await
    }

    /// Step over the current line.
    pub async fn step_over(&self, thread_id: Option<i64>) -> Result<(), SessionError> {
        self.resume("next", "stepOver", thread_id, |tid| {
            serde_json::to_value(NextArguments { thread_id: tid })
        })
        .await
    }

    /// Step into the call on the current line.
    pub async fn step_in(&self, thread_id: Option<i64>) -> Result<(), SessionError> {
        self.resume("stepIn", "stepIn", thread_id, |tid| {
            serde_json::to_value(StepInArguments { thread_id: tid })
        })
        .await
    }

    /// Step out of the current function.
    pub async fn step_out(&self, thread_id: Option<i64>) -> Result<(), SessionError> {
        self.resume("stepOut", "stepOut", thread_id, |tid| {
            serde_json::to_value(StepOutArguments { thread_id: tid })
        })
        .await
    }

    /// Ask the adapter to pause a running debuggee. The state flips
    /// to `Stopped` when the `stopped` event arrives, not here.
    pub async fn pause(&self, thread_id: Option<i64>) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("pause", &[SessionState::Running])?;
        let tid = thread_id.or(inner.current_thread).unwrap_or(1);
        let value = serde_json::to_value(PauseArguments { thread_id: tid })
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        self.client.request("pause", Some(value)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    /// All threads of the debuggee.
    pub async fn threads(&self) -> Result<Vec<Thread>, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("threads", &[SessionState::Running, SessionState::Stopped])?;
        let body = self
            .client
            .request("threads", None)
            .await?
            .unwrap_or_default();
        let body: ThreadsResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad threads body: {e}")))?;
        Ok(body.threads)
    }

    /// The call stack of a stopped thread, topmost frame first. When
    /// source maps are enabled, frame locations are rewritten to
    /// their original sources.
    pub async fn stack_trace(&self, thread_id: Option<i64>) -> Result<Vec<StackFrame>, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("stackTrace", &[SessionState::Stopped])?;
        let tid = thread_id.or(inner.current_thread).ok_or_else(|| {
            SessionError::state("stackTrace without a stopped thread", inner.state)
        })?;

        let value = serde_json::to_value(StackTraceArguments {
            thread_id: tid,
            levels: None,
        })
        .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("stackTrace", Some(value))
            .await?
            .unwrap_or_default();
        let body: StackTraceResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad stackTrace body: {e}")))?;

        let frames = if inner.use_source_maps {
            inner.mapper.transform_stack_trace(body.stack_frames)
        } else {
            body.stack_frames
        };
        inner.current_frame = frames.first().map(|f| f.id);
        Ok(frames)
    }

    /// Variable scopes of a frame. Defaults to the current frame.
    pub async fn scopes(&self, frame_id: Option<i64>) -> Result<Vec<Scope>, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("scopes", &[SessionState::Stopped])?;
        let frame = frame_id
            .or(inner.current_frame)
            .ok_or_else(|| SessionError::state("scopes without a frame", inner.state))?;
        let value = serde_json::to_value(ScopesArguments { frame_id: frame })
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("scopes", Some(value))
            .await?
            .unwrap_or_default();
        let body: ScopesResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad scopes body: {e}")))?;
        Ok(body.scopes)
    }

    /// Child variables of a container reference.
    pub async fn variables(&self, variables_reference: i64) -> Result<Vec<Variable>, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("variables", &[SessionState::Stopped])?;
        let value = serde_json::to_value(VariablesArguments { variables_reference })
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("variables", Some(value))
            .await?
            .unwrap_or_default();
        let body: VariablesResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad variables body: {e}")))?;
        Ok(body.variables)
    }

    /// Evaluate an expression in a frame context. Defaults to the
    /// current frame and the "repl" context.
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("evaluate", &[SessionState::Stopped])?;
        let frame = frame_id.or(inner.current_frame);
        drop(inner);
        self.evaluate_in_frame(expression, frame, context.unwrap_or("repl"))
            .await
    }

    async fn evaluate_in_frame(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateResponseBody, SessionError> {
        let value = serde_json::to_value(EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: Some(context.to_string()),
        })
        .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("evaluate", Some(value))
            .await?
            .unwrap_or_default();
        let body: EvaluateResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad evaluate body: {e}")))?;
        Ok(body)
    }

    // -----------------------------------------------------------------
    // Breakpoints
    // -----------------------------------------------------------------

    /// Replace all breakpoints for a source file and sync them to the
    /// adapter. Returns the store's view after verification.
    pub async fn set_breakpoints(
        &self,
        source: &Path,
        specs: Vec<BreakpointSpec>,
    ) -> Result<Vec<Breakpoint>, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require(
            "setBreakpoints",
            &[
                SessionState::Connected,
                SessionState::Running,
                SessionState::Stopped,
            ],
        )?;
        inner.breakpoints.set_all(source, specs);
        self.sync_breakpoints(&mut inner, source).await?;
        Ok(inner.breakpoints.list_source(source).to_vec())
    }

    /// Remove one breakpoint (by line) or all breakpoints for a
    /// source, then re-sync the adapter.
    pub async fn remove_breakpoint(
        &self,
        source: &Path,
        line: Option<i64>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require(
            "removeBreakpoint",
            &[
                SessionState::Connected,
                SessionState::Running,
                SessionState::Stopped,
            ],
        )?;
        match line {
            Some(line) => {
                if !inner.breakpoints.remove_line(source, line) {
                    return Err(SessionError::UnknownBreakpoint {
                        path: source.display().to_string(),
                        line,
                    });
                }
            }
            None => {
                if !inner.breakpoints.clear_source(source) {
                    return Err(SessionError::UnknownSource(source.display().to_string()));
                }
            }
        }
        self.sync_breakpoints(&mut inner, source).await
    }

    /// Send the store's breakpoints for `source` to the adapter and
    /// fold the verification rows back in. Caller holds the lock.
    async fn sync_breakpoints(
        &self,
        inner: &mut SessionInner,
        source: &Path,
    ) -> Result<(), SessionError> {
        let debug_path: PathBuf = if inner.use_source_maps {
            inner.mapper.resolve_debug_path(source)
        } else {
            source.to_path_buf()
        };
        let args = SetBreakpointsArguments {
            source: Source::from_path(&debug_path),
            breakpoints: inner.breakpoints.source_breakpoints(source),
        };
        let value = serde_json::to_value(&args)
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("setBreakpoints", Some(value))
            .await?
            .unwrap_or_default();
        let body: SetBreakpointsResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad setBreakpoints body: {e}")))?;
        inner.breakpoints.apply_verification(source, &body.breakpoints);
        Ok(())
    }

    /// All breakpoints across all sources, in id order.
    pub async fn list_breakpoints(&self) -> Vec<Breakpoint> {
        self.inner.lock().await.breakpoints.list_all()
    }

    /// Aggregate breakpoint counts.
    pub async fn breakpoint_stats(&self) -> BreakpointStats {
        self.inner.lock().await.breakpoints.stats()
    }

    /// Configure which exception categories break execution.
    pub async fn set_exception_breakpoints(
        &self,
        filters: Vec<String>,
        filter_options: Vec<ExceptionFilterOptions>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require(
            "setExceptionBreakpoints",
            &[
                SessionState::Connected,
                SessionState::Running,
                SessionState::Stopped,
            ],
        )?;
        let options = if inner.capabilities.supports_exception_filter_options
            && !filter_options.is_empty()
        {
            Some(filter_options)
        } else {
            None
        };
        let value = serde_json::to_value(SetExceptionBreakpointsArguments {
            filters,
            filter_options: options,
        })
        .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        self.client
            .request("setExceptionBreakpoints", Some(value))
            .await?;
        Ok(())
    }

    /// Details of the exception the given thread stopped on.
    pub async fn exception_info(
        &self,
        thread_id: Option<i64>,
    ) -> Result<ExceptionInfoResponseBody, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("exceptionInfo", &[SessionState::Stopped])?;
        if !inner.capabilities.supports_exception_info_request {
            return Err(DapError::Request {
                command: "exceptionInfo".into(),
                message: "not supported by this adapter".into(),
            }
            .into());
        }
        let tid = thread_id.or(inner.current_thread).ok_or_else(|| {
            SessionError::state("exceptionInfo without a stopped thread", inner.state)
        })?;
        let value = serde_json::to_value(ExceptionInfoArguments { thread_id: tid })
            .map_err(|e| DapError::Protocol(format!("unserializable arguments: {e}")))?;
        let body = self
            .client
            .request("exceptionInfo", Some(value))
            .await?
            .unwrap_or_default();
        let body: ExceptionInfoResponseBody = serde_json::from_value(body)
            .map_err(|e| DapError::Protocol(format!("bad exceptionInfo body: {e}")))?;
        Ok(body)
    }

    // -----------------------------------------------------------------
    // Watches
    // -----------------------------------------------------------------

    /// Register a watch expression. Evaluation happens separately.
    pub async fn add_watch(&self, expression: &str) -> Watch {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.watches.add(expression).clone()
    }

    /// Replace a watch's expression, discarding its stale result.
    pub async fn update_watch(&self, id: &str, expression: &str) -> Result<Watch, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner
            .watches
            .update(id, expression)
            .cloned()
            .ok_or_else(|| SessionError::UnknownWatch(id.to_string()))
    }

    /// Remove a watch expression.
    pub async fn remove_watch(&self, id: &str) -> Result<Watch, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner
            .watches
            .remove(id)
            .ok_or_else(|| SessionError::UnknownWatch(id.to_string()))
    }

    /// All watch expressions with their last results.
    pub async fn watches(&self) -> Vec<Watch> {
        self.inner.lock().await.watches.list().to_vec()
    }

    /// Evaluate one watch against the current (or given) frame.
    /// An adapter-side evaluation failure is captured on the watch,
    /// not returned as an error; transport failures still propagate.
    pub async fn evaluate_watch(
        &self,
        id: &str,
        frame_id: Option<i64>,
    ) -> Result<Watch, SessionError> {
        let mut inner = self.inner.lock().await;
        inner.touch();
        inner.require("evaluateWatch", &[SessionState::Stopped])?;
        let frame = frame_id.or(inner.current_frame);
        let expression = inner
            .watches
            .get(id)
            .map(|w| w.expression.clone())
            .ok_or_else(|| SessionError::UnknownWatch(id.to_string()))?;
        drop(inner);

        let outcome = self.evaluate_in_frame(&expression, frame, "watch").await;
        let mut inner = self.inner.lock().await;
        let watch = match outcome {
            Ok(body) => inner.watches.record_success(id, body.result),
            Err(SessionError::Dap(DapError::Request { message, .. })) => {
                inner.watches.record_error(id, message)
            }
            Err(other) => return Err(other),
        };
        watch
            .cloned()
            .ok_or_else(|| SessionError::UnknownWatch(id.to_string()))
    }

    /// Evaluate every watch against one frame snapshot. A failing
    /// expression records its error and does not poison the batch.
    pub async fn evaluate_all_watches(
        &self,
        frame_id: Option<i64>,
    ) -> Result<Vec<Watch>, SessionError> {
        let ids = {
            let mut inner = self.inner.lock().await;
            inner.touch();
            inner.require("evaluateWatches", &[SessionState::Stopped])?;
            inner.watches.ids()
        };
        let frame = {
            let inner = self.inner.lock().await;
            frame_id.or(inner.current_frame)
        };
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.evaluate_watch(&id, frame).await?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------

    /// End the session. Idempotent: a terminated session disconnects
    /// to a no-op. The disconnect request is best effort; the
    /// transport is torn down regardless.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        {
            let inner = self.inner.lock().await;
            if inner.state == SessionState::Terminated {
                return Ok(());
            }
        }
        let args = serde_json::to_value(DisconnectArguments {
            terminate_debuggee: Some(true),
        })
        .ok();
        let _ = self.client.request("disconnect", args).await;
        self.finish_teardown().await;
        Ok(())
    }

    /// Terminate the debuggee gracefully where the adapter supports
    /// it, falling back to a plain disconnect.
    pub async fn terminate(&self) -> Result<(), SessionError> {
        let supports_terminate = {
            let inner = self.inner.lock().await;
            if inner.state == SessionState::Terminated {
                return Ok(());
            }
            inner.capabilities.supports_terminate_request
        };
        if !supports_terminate {
            return self.disconnect().await;
        }
        let _ = self.client.request("terminate", None).await;
        self.finish_teardown().await;
        Ok(())
    }

    async fn finish_teardown(&self) {
        // Mark terminated before the transport dies so the event
        // loop's closed-channel path does not treat this as a crash.
        {
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Terminated;
            inner.touch();
        }
        self.client.shutdown().await;
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The adapter name the session was created with.
    pub fn adapter(&self) -> &str {
        &self.adapter_name
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Summary snapshot for listings.
    pub async fn info(&self) -> SessionInfo {
        let inner = self.inner.lock().await;
        SessionInfo {
            id: self.id.clone(),
            adapter: self.adapter_name.clone(),
            state: inner.state,
            program: inner.program.clone(),
            breakpoints: inner.breakpoints.stats().total,
            watches: inner.watches.len(),
            created_at: self.created_at,
        }
    }

    /// Enable or disable source-map translation of paths and frames.
    pub async fn set_source_maps(&self, enabled: bool) {
        self.inner.lock().await.use_source_maps = enabled;
    }

    /// Mirror event records to a file as JSON lines, or stop with
    /// `None`. Applies to events recorded after the call.
    pub async fn set_log_sink(&self, path: Option<PathBuf>) {
        self.inner.lock().await.log_sink = path;
    }

    /// Subscribe to this session's event records.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events_tx.subscribe()
    }

    /// Snapshot of the retained event log, oldest first.
    pub async fn event_log(&self) -> Vec<EventRecord> {
        self.inner.lock().await.log.snapshot()
    }

    /// Thread of the most recent stop, if any.
    pub async fn current_thread(&self) -> Option<i64> {
        self.inner.lock().await.current_thread
    }

    /// Frame cursor (top of the last fetched stack), if any.
    pub async fn current_frame(&self) -> Option<i64> {
        self.inner.lock().await.current_frame
    }

    /// Time since the last operation or state change.
    pub async fn idle_time(&self) -> Duration {
        self.inner.lock().await.last_activity.elapsed()
    }
}

impl std::fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("id", &self.id)
            .field("adapter", &self.adapter_name)
            .finish()
    }
}
