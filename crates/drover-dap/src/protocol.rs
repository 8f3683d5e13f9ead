//! DAP protocol message types.
//!
//! Implements the Debug Adapter Protocol message structures with
//! serde Serialize/Deserialize support. Every message on the wire is
//! one of `Request`, `Response` or `Event`; command arguments and
//! bodies for the commands drover issues are typed, everything else
//! passes through as raw JSON.

use serde::{Deserialize, Serialize};

use crate::error::DapError;

// ---------------------------------------------------------------------------
// Base protocol messages
// ---------------------------------------------------------------------------

/// A DAP request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Sequence number.
    pub seq: i64,
    /// Always "request".
    #[serde(rename = "type")]
    pub message_type: String,
    /// The command to execute.
    pub command: String,
    /// Command arguments (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

impl Request {
    /// Build a request with the given sequence number.
    pub fn new(seq: i64, command: impl Into<String>, arguments: Option<serde_json::Value>) -> Self {
        Self {
            seq,
            message_type: "request".into(),
            command: command.into(),
            arguments,
        }
    }
}

/// A DAP response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Sequence number.
    pub seq: i64,
    /// Always "response".
    #[serde(rename = "type")]
    pub message_type: String,
    /// Sequence number of the corresponding request.
    pub request_seq: i64,
    /// Whether the request was successful.
    pub success: bool,
    /// The command this response is for.
    pub command: String,
    /// Error message if `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response body (command-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// A DAP event message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number.
    pub seq: i64,
    /// Always "event".
    #[serde(rename = "type")]
    pub message_type: String,
    /// The event type.
    pub event: String,
    /// Event body (event-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request from the adapter (e.g. `runInTerminal`).
    Request(Request),
    /// A response to one of our requests.
    Response(Response),
    /// An unsolicited event.
    Event(Event),
}

impl Message {
    /// Classify a decoded JSON value by its `type` field.
    pub fn classify(value: serde_json::Value) -> Result<Message, DapError> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| DapError::Protocol("message has no type field".into()))?;
        match kind {
            "request" => serde_json::from_value(value)
                .map(Message::Request)
                .map_err(|e| DapError::Protocol(format!("bad request message: {e}"))),
            "response" => serde_json::from_value(value)
                .map(Message::Response)
                .map_err(|e| DapError::Protocol(format!("bad response message: {e}"))),
            "event" => serde_json::from_value(value)
                .map(Message::Event)
                .map_err(|e| DapError::Protocol(format!("bad event message: {e}"))),
            other => Err(DapError::Protocol(format!("unknown message type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Request arguments
// ---------------------------------------------------------------------------

/// Arguments for the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    /// ID of the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Human-readable name of the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// ID of the debug adapter.
    pub adapter_id: String,
    /// Whether lines are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    /// Whether columns are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_start_at1: Option<bool>,
    /// Path format: "path" or "uri".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    /// Whether the client supports variable type info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_type: Option<bool>,
}

impl InitializeArguments {
    /// Standard initialize arguments for the given adapter id.
    pub fn for_adapter(adapter_id: impl Into<String>) -> Self {
        Self {
            client_id: Some("drover".into()),
            client_name: Some("drover".into()),
            adapter_id: adapter_id.into(),
            lines_start_at1: Some(true),
            columns_start_at1: Some(true),
            path_format: Some("path".into()),
            supports_variable_type: Some(true),
        }
    }
}

/// Capabilities returned by the debug adapter in the `initialize` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// The adapter supports the `configurationDone` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_configuration_done_request: Option<bool>,
    /// The adapter supports conditional breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_conditional_breakpoints: Option<bool>,
    /// The adapter supports hit conditional breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_hit_conditional_breakpoints: Option<bool>,
    /// The adapter supports the `terminate` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_terminate_request: Option<bool>,
    /// The adapter supports `filterOptions` on setExceptionBreakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_exception_filter_options: Option<bool>,
    /// The adapter supports the `exceptionInfo` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_exception_info_request: Option<bool>,
}

/// Arguments for the `launch` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    /// Program to launch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Command-line arguments for the debuggee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Working directory for the debuggee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<serde_json::Value>,
    /// Stop at the entry point of the program.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_entry: Option<bool>,
    /// Run without debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_debug: Option<bool>,
}

/// Arguments for the `attach` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachArguments {
    /// Process ID to attach to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<i64>,
}

/// A source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Short name of the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// File system path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source reference (for sources without a file path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
}

impl Source {
    /// Build a `Source` from a file system path.
    pub fn from_path(path: &std::path::Path) -> Self {
        Self {
            name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            path: Some(path.to_string_lossy().into_owned()),
            source_reference: None,
        }
    }
}

/// A source breakpoint as sent to the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    /// The source line of the breakpoint.
    pub line: i64,
    /// Optional column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Arguments for the `setBreakpoints` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    /// The source to set breakpoints for.
    pub source: Source,
    /// Breakpoints to set (replaces all previous ones for the source).
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// A breakpoint row as reported by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointInfo {
    /// Adapter-assigned identifier for the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Whether the breakpoint has been verified.
    pub verified: bool,
    /// Optional explanatory message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Actual line of the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// Actual column of the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
}

/// Response body for `setBreakpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsResponseBody {
    /// Positional verification rows, one per requested breakpoint.
    pub breakpoints: Vec<BreakpointInfo>,
}

/// Per-filter options for `setExceptionBreakpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionFilterOptions {
    /// The exception filter id.
    pub filter_id: String,
    /// Condition restricting when the filter applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Arguments for the `setExceptionBreakpoints` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExceptionBreakpointsArguments {
    /// Active exception filter ids.
    pub filters: Vec<String>,
    /// Optional per-filter conditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<Vec<ExceptionFilterOptions>>,
}

/// Response body for `exceptionInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfoResponseBody {
    /// Identifier of the exception.
    pub exception_id: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Break mode: "never", "always", "unhandled", "userUnhandled".
    pub break_mode: String,
    /// Structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Flow-control arguments
// ---------------------------------------------------------------------------

/// Arguments for the `continue` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueArguments {
    /// The thread to continue.
    pub thread_id: i64,
}

/// Arguments for the `next` (step over) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextArguments {
    /// The thread to step.
    pub thread_id: i64,
}

/// Arguments for the `stepIn` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInArguments {
    /// The thread to step.
    pub thread_id: i64,
}

/// Arguments for the `stepOut` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutArguments {
    /// The thread to step.
    pub thread_id: i64,
}

/// Arguments for the `pause` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseArguments {
    /// The thread to pause.
    pub thread_id: i64,
}

/// Arguments for the `stackTrace` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    /// The thread to fetch frames for.
    pub thread_id: i64,
    /// Maximum number of frames to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<i64>,
}

/// Response body for `stackTrace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    /// The frames, topmost first.
    pub stack_frames: Vec<StackFrame>,
    /// Total number of frames available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// Arguments for the `scopes` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    /// The frame to fetch scopes for.
    pub frame_id: i64,
}

/// Response body for `scopes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesResponseBody {
    /// The scopes of the frame.
    pub scopes: Vec<Scope>,
}

/// Arguments for the `variables` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    /// The container to enumerate.
    pub variables_reference: i64,
}

/// Response body for `variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesResponseBody {
    /// The child variables.
    pub variables: Vec<Variable>,
}

/// Response body for `threads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsResponseBody {
    /// All threads of the debuggee.
    pub threads: Vec<Thread>,
}

/// Arguments for the `exceptionInfo` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfoArguments {
    /// The thread whose exception to describe.
    pub thread_id: i64,
}

/// Arguments for the `disconnect` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    /// Whether to terminate the debuggee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

// ---------------------------------------------------------------------------
// Runtime types
// ---------------------------------------------------------------------------

/// A thread in the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique identifier of the thread.
    pub id: i64,
    /// Human-readable name of the thread.
    pub name: String,
}

/// A stack frame in the call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Unique identifier for the stack frame.
    pub id: i64,
    /// Name of the frame (function name).
    pub name: String,
    /// Source location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line within the source.
    pub line: i64,
    /// Column within the source.
    pub column: i64,
}

/// A scope (container for variables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Name of the scope (e.g. "Locals", "Globals").
    pub name: String,
    /// Variables reference for this scope.
    pub variables_reference: i64,
    /// Whether the scope is expensive to resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expensive: Option<bool>,
}

/// A variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Name of the variable.
    pub name: String,
    /// Value of the variable as a string.
    pub value: String,
    /// Type of the variable.
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// If > 0, the variable has children accessed via this reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
}

/// Arguments for the `evaluate` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    /// The expression to evaluate.
    pub expression: String,
    /// Stack frame in whose context to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Context: "watch", "repl", "hover".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Response body for `evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    /// The result rendered as text.
    pub result: String,
    /// Type of the result.
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    /// If > 0, the result has children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
}

// ---------------------------------------------------------------------------
// Event bodies
// ---------------------------------------------------------------------------

/// Reason why the debuggee stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// A step request completed.
    Step,
    /// A breakpoint was hit.
    Breakpoint,
    /// An exception occurred.
    Exception,
    /// A pause request was fulfilled.
    Pause,
    /// The entry point was reached.
    Entry,
    /// A goto request completed.
    Goto,
    /// Any reason this client does not model.
    #[serde(other)]
    Other,
}

/// Body of the `stopped` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    /// The reason for the stop.
    pub reason: StopReason,
    /// Thread that stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    /// Whether all threads are stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
    /// Adapter ids of the breakpoints that caused the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_breakpoint_ids: Option<Vec<i64>>,
    /// Additional text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body of the `continued` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuedEventBody {
    /// Thread that continued.
    pub thread_id: i64,
    /// Whether all threads continued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

/// Body of the `output` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    /// Output category: "console", "stdout", "stderr".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The output text.
    pub output: String,
}

/// Body of the `exited` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    /// The exit code of the debuggee.
    pub exit_code: i64,
}

/// Body of the `breakpoint` event (changed verification state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointEventBody {
    /// The reason for the change: "changed", "new", "removed".
    pub reason: String,
    /// The breakpoint as the adapter now sees it.
    pub breakpoint: BreakpointInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_request_serde() {
        let req = Request::new(1, "initialize", Some(serde_json::json!({"adapterID": "node"})));
        let json = serde_json::to_string(&req).unwrap();
        let decoded: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(req, decoded);
        assert!(json.contains("\"type\":\"request\""));
    }

    #[test]
    fn protocol_classify_response() {
        let value = serde_json::json!({
            "seq": 2,
            "type": "response",
            "request_seq": 1,
            "success": true,
            "command": "initialize",
            "body": {}
        });
        match Message::classify(value).unwrap() {
            Message::Response(resp) => {
                assert_eq!(resp.request_seq, 1);
                assert!(resp.success);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn protocol_classify_event() {
        let value = serde_json::json!({
            "seq": 3,
            "type": "event",
            "event": "stopped",
            "body": {"reason": "breakpoint", "threadId": 1}
        });
        match Message::classify(value).unwrap() {
            Message::Event(evt) => assert_eq!(evt.event, "stopped"),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn protocol_classify_missing_type() {
        let err = Message::classify(serde_json::json!({"seq": 1})).unwrap_err();
        assert!(matches!(err, DapError::Protocol(_)));
    }

    #[test]
    fn protocol_classify_unknown_type() {
        let err = Message::classify(serde_json::json!({"seq": 1, "type": "frob"})).unwrap_err();
        assert!(err.to_string().contains("unknown message type"));
    }

    #[test]
    fn protocol_launch_serde() {
        let args = LaunchArguments {
            program: Some("/tmp/app.js".into()),
            args: Some(vec!["--flag".into()]),
            cwd: Some("/tmp".into()),
            env: None,
            stop_on_entry: Some(true),
            no_debug: None,
        };
        let json = serde_json::to_string(&args).unwrap();
        assert!(json.contains("\"stopOnEntry\":true"));
        let decoded: LaunchArguments = serde_json::from_str(&json).unwrap();
        assert_eq!(args, decoded);
    }

    #[test]
    fn protocol_stopped_event_serde() {
        let body = StoppedEventBody {
            reason: StopReason::Breakpoint,
            thread_id: Some(1),
            all_threads_stopped: Some(true),
            hit_breakpoint_ids: Some(vec![7]),
            text: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"reason\":\"breakpoint\""));
        assert!(json.contains("\"hitBreakpointIds\":[7]"));
        let decoded: StoppedEventBody = serde_json::from_str(&json).unwrap();
        assert_eq!(body, decoded);
    }

    #[test]
    fn protocol_lifecycle_event_bodies_serde() {
        let continued: ContinuedEventBody =
            serde_json::from_str(r#"{"threadId":3,"allThreadsContinued":true}"#).unwrap();
        assert_eq!(continued.thread_id, 3);
        assert_eq!(continued.all_threads_continued, Some(true));
        assert!(serde_json::to_string(&continued).unwrap().contains("\"threadId\":3"));

        let output: OutputEventBody =
            serde_json::from_str(r#"{"category":"stdout","output":"hello\n"}"#).unwrap();
        assert_eq!(output.category.as_deref(), Some("stdout"));
        assert_eq!(output.output, "hello\n");

        let exited: ExitedEventBody = serde_json::from_str(r#"{"exitCode":42}"#).unwrap();
        assert_eq!(exited.exit_code, 42);
        assert!(serde_json::to_string(&exited).unwrap().contains("\"exitCode\":42"));
    }

    #[test]
    fn protocol_stop_reason_unmodeled_falls_through() {
        let body: StoppedEventBody =
            serde_json::from_str(r#"{"reason":"instruction breakpoint","threadId":2}"#).unwrap();
        assert_eq!(body.reason, StopReason::Other);
        assert_eq!(body.thread_id, Some(2));
    }

    #[test]
    fn protocol_set_breakpoints_serde() {
        let args = SetBreakpointsArguments {
            source: Source::from_path(std::path::Path::new("/src/app.js")),
            breakpoints: vec![
                SourceBreakpoint {
                    line: 10,
                    column: None,
                    condition: Some("x > 3".into()),
                },
                SourceBreakpoint {
                    line: 20,
                    column: None,
                    condition: None,
                },
            ],
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["source"]["name"], "app.js");
        assert_eq!(json["breakpoints"][0]["line"], 10);
        assert_eq!(json["breakpoints"][0]["condition"], "x > 3");
    }

    #[test]
    fn protocol_breakpoint_info_serde() {
        let row: BreakpointInfo =
            serde_json::from_str(r#"{"id":3,"verified":true,"line":12}"#).unwrap();
        assert_eq!(row.id, Some(3));
        assert!(row.verified);
        assert_eq!(row.line, Some(12));
    }

    #[test]
    fn protocol_stack_frame_serde() {
        let frame = StackFrame {
            id: 1,
            name: "main".into(),
            source: Some(Source::from_path(std::path::Path::new("/src/main.js"))),
            line: 10,
            column: 1,
        };
        let json = serde_json::to_string(&frame).unwrap();
        let decoded: StackFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn protocol_evaluate_serde() {
        let args = EvaluateArguments {
            expression: "items.length".into(),
            frame_id: Some(4),
            context: Some("watch".into()),
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["frameId"], 4);
        assert_eq!(json["context"], "watch");

        let body: EvaluateResponseBody =
            serde_json::from_str(r#"{"result":"42","type":"number"}"#).unwrap();
        assert_eq!(body.result, "42");
        assert_eq!(body.result_type.as_deref(), Some("number"));
    }

    #[test]
    fn protocol_exception_breakpoints_serde() {
        let args = SetExceptionBreakpointsArguments {
            filters: vec!["uncaught".into()],
            filter_options: Some(vec![ExceptionFilterOptions {
                filter_id: "raised".into(),
                condition: Some("isWorthIt".into()),
            }]),
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["filters"][0], "uncaught");
        assert_eq!(json["filterOptions"][0]["filterId"], "raised");
    }

    #[test]
    fn protocol_capabilities_defaults() {
        let caps: Capabilities = serde_json::from_str("{}").unwrap();
        assert!(caps.supports_configuration_done_request.is_none());
        assert!(caps.supports_exception_info_request.is_none());
    }
}
