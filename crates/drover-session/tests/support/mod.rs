//! A scripted in-process debug adapter for integration tests.
//!
//! Speaks real framed DAP over a `tokio::io::duplex` pair and
//! auto-responds to every command drover issues, with canned runtime
//! data and just enough breakpoint state to exercise hit tracking.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{split, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use drover_dap::framing::{encode_message, FrameDecoder};
use drover_dap::protocol::Request;
use drover_dap::DapClient;

/// Handle to the running fake adapter.
pub struct FakeAdapter {
    commands: Arc<Mutex<Vec<String>>>,
    _task: JoinHandle<()>,
}

impl FakeAdapter {
    /// Start a fake adapter and return a client wired to it.
    pub fn start() -> (DapClient, FakeAdapter) {
        let (client_io, server_io) = tokio::io::duplex(16 * 1024);
        let (cr, cw) = split(client_io);
        let client = DapClient::from_streams(cr, cw);

        let commands: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&commands);
        let (sr, sw) = split(server_io);
        let task = tokio::spawn(async move {
            run_adapter(sr, sw, log).await;
        });

        (client, FakeAdapter { commands, _task: task })
    }

    /// Every command received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

struct Endpoint {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    decoder: FrameDecoder,
    next_seq: i64,
}

impl Endpoint {
    async fn recv_request(&mut self) -> Option<Request> {
        loop {
            if let Some(value) = self.decoder.next_message().unwrap() {
                return Some(serde_json::from_value(value).unwrap());
            }
            let mut buf = [0u8; 4096];
            match self.reader.read(&mut buf).await {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.decoder.extend(&buf[..n]),
            }
        }
    }

    async fn send(&mut self, mut message: serde_json::Value) {
        message["seq"] = json!(self.next_seq);
        self.next_seq += 1;
        let bytes = encode_message(&message);
        if self.writer.write_all(&bytes).await.is_err() {
            return;
        }
        let _ = self.writer.flush().await;
    }

    async fn respond(&mut self, request: &Request, body: serde_json::Value) {
        self.send(json!({
            "type": "response",
            "request_seq": request.seq,
            "success": true,
            "command": request.command,
            "body": body,
        }))
        .await;
    }

    async fn reject(&mut self, request: &Request, message: &str) {
        self.send(json!({
            "type": "response",
            "request_seq": request.seq,
            "success": false,
            "command": request.command,
            "message": message,
        }))
        .await;
    }

    async fn event(&mut self, event: &str, body: serde_json::Value) {
        self.send(json!({
            "type": "event",
            "event": event,
            "body": body,
        }))
        .await;
    }
}

async fn run_adapter(
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    log: Arc<Mutex<Vec<String>>>,
) {
    let mut ep = Endpoint {
        reader,
        writer,
        decoder: FrameDecoder::new(),
        next_seq: 1,
    };
    // Adapter ids handed out for breakpoints, newest set last.
    let mut next_bp_id: i64 = 100;
    let mut active_bp_ids: Vec<i64> = Vec::new();

    while let Some(req) = ep.recv_request().await {
        log.lock().unwrap().push(req.command.clone());
        let args = req.arguments.clone().unwrap_or(json!({}));

        match req.command.as_str() {
            "initialize" => {
                ep.respond(
                    &req,
                    json!({
                        "supportsConfigurationDoneRequest": true,
                        "supportsConditionalBreakpoints": true,
                        "supportsTerminateRequest": true,
                        "supportsExceptionInfoRequest": true,
                        "supportsExceptionFilterOptions": true,
                    }),
                )
                .await;
                ep.event("initialized", json!({})).await;
            }
            "configurationDone" => {
                ep.respond(&req, json!({})).await;
            }
            "launch" => {
                let stop_on_entry = args["stopOnEntry"].as_bool().unwrap_or(false);
                ep.respond(&req, json!({})).await;
                if stop_on_entry {
                    ep.event(
                        "stopped",
                        json!({
                            "reason": "entry",
                            "threadId": 1,
                            "allThreadsStopped": true,
                        }),
                    )
                    .await;
                }
            }
            "attach" => {
                ep.respond(&req, json!({})).await;
            }
            "setBreakpoints" => {
                let requested = args["breakpoints"].as_array().cloned().unwrap_or_default();
                active_bp_ids.clear();
                let rows: Vec<serde_json::Value> = requested
                    .iter()
                    .map(|bp| {
                        let id = next_bp_id;
                        next_bp_id += 1;
                        active_bp_ids.push(id);
                        json!({
                            "id": id,
                            "verified": true,
                            "line": bp["line"],
                        })
                    })
                    .collect();
                ep.respond(&req, json!({ "breakpoints": rows })).await;
            }
            "setExceptionBreakpoints" => {
                ep.respond(&req, json!({})).await;
            }
            "continue" => {
                ep.respond(&req, json!({ "allThreadsContinued": true })).await;
                ep.event("continued", json!({ "threadId": 1 })).await;
                if let Some(first) = active_bp_ids.first().copied() {
                    ep.event(
                        "stopped",
                        json!({
                            "reason": "breakpoint",
                            "threadId": 1,
                            "allThreadsStopped": true,
                            "hitBreakpointIds": [first],
                        }),
                    )
                    .await;
                }
            }
            "next" | "stepIn" | "stepOut" => {
                ep.respond(&req, json!({})).await;
                ep.event(
                    "stopped",
                    json!({ "reason": "step", "threadId": 1, "allThreadsStopped": true }),
                )
                .await;
            }
            "pause" => {
                ep.respond(&req, json!({})).await;
                ep.event(
                    "stopped",
                    json!({ "reason": "pause", "threadId": 1, "allThreadsStopped": true }),
                )
                .await;
            }
            "threads" => {
                ep.respond(&req, json!({ "threads": [{ "id": 1, "name": "main" }] }))
                    .await;
            }
            "stackTrace" => {
                ep.respond(
                    &req,
                    json!({
                        "stackFrames": [{
                            "id": 1000,
                            "name": "main",
                            "source": { "name": "app.js", "path": "/work/app.js" },
                            "line": 4,
                            "column": 1,
                        }],
                        "totalFrames": 1,
                    }),
                )
                .await;
            }
            "scopes" => {
                ep.respond(
                    &req,
                    json!({
                        "scopes": [{ "name": "Locals", "variablesReference": 2000, "expensive": false }],
                    }),
                )
                .await;
            }
            "variables" => {
                ep.respond(
                    &req,
                    json!({
                        "variables": [{
                            "name": "x",
                            "value": "42",
                            "type": "number",
                            "variablesReference": 0,
                        }],
                    }),
                )
                .await;
            }
            "evaluate" => {
                let expression = args["expression"].as_str().unwrap_or("");
                if expression.contains("boom") {
                    ep.reject(&req, "ReferenceError: boom is not defined").await;
                } else if expression == "x" {
                    ep.respond(
                        &req,
                        json!({ "result": "42", "type": "number", "variablesReference": 0 }),
                    )
                    .await;
                } else {
                    ep.respond(&req, json!({ "result": format!("<{expression}>") }))
                        .await;
                }
            }
            "exceptionInfo" => {
                ep.respond(
                    &req,
                    json!({
                        "exceptionId": "Error",
                        "description": "boom",
                        "breakMode": "unhandled",
                    }),
                )
                .await;
            }
            "disconnect" | "terminate" => {
                ep.respond(&req, json!({})).await;
                ep.event("exited", json!({ "exitCode": 0 })).await;
                ep.event("terminated", json!({})).await;
                return; // drop the streams, closing the transport
            }
            other => {
                ep.reject(&req, &format!("unsupported command: {other}")).await;
            }
        }
    }
}
