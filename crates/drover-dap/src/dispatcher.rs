//! Request/response dispatcher.
//!
//! Allocates sequence numbers, tracks in-flight requests, and routes
//! each inbound response to its waiting caller via a oneshot channel.
//! Correlation is solely by `request_seq`; arrival order is
//! irrelevant.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::error::DapError;
use crate::protocol::Response;

/// The outcome delivered to a waiting request: the response body on
/// success, or the failure that ended it.
pub type Outcome = Result<Option<serde_json::Value>, DapError>;

/// Tracks pending requests for one transport.
#[derive(Debug)]
pub struct Dispatcher {
    pending: HashMap<i64, oneshot::Sender<Outcome>>,
    next_seq: i64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a new dispatcher with the sequence counter at 1.
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_seq: 1,
        }
    }

    /// Allocate the next sequence number and register a pending
    /// entry for it. Returns the number and the receiver the caller
    /// awaits.
    pub fn register(&mut self) -> (i64, oneshot::Receiver<Outcome>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(seq, tx);
        (seq, rx)
    }

    /// How many requests are still in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Complete the pending request matching this response.
    ///
    /// A `success: false` response resolves the caller with
    /// [`DapError::Request`]. A response with no matching pending
    /// entry (stale or duplicate) is discarded.
    pub fn complete(&mut self, response: Response) {
        let Some(sender) = self.pending.remove(&response.request_seq) else {
            tracing::warn!(
                request_seq = response.request_seq,
                command = %response.command,
                "response for unknown request, discarding"
            );
            return;
        };
        let outcome = if response.success {
            Ok(response.body)
        } else {
            Err(DapError::Request {
                command: response.command,
                message: response
                    .message
                    .unwrap_or_else(|| "no error message".into()),
            })
        };
        // Receiver may have timed out and gone away; that's fine.
        let _ = sender.send(outcome);
    }

    /// Drop a pending entry (e.g. after its caller timed out).
    pub fn forget(&mut self, seq: i64) -> bool {
        self.pending.remove(&seq).is_some()
    }

    /// Fail every still-pending request with [`DapError::TransportClosed`].
    pub fn fail_all(&mut self) {
        for (_, sender) in self.pending.drain() {
            let _ = sender.send(Err(DapError::TransportClosed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(request_seq: i64, success: bool, body: Option<serde_json::Value>) -> Response {
        Response {
            seq: 100 + request_seq,
            message_type: "response".into(),
            request_seq,
            success,
            command: "evaluate".into(),
            message: if success { None } else { Some("eval failed".into()) },
            body,
        }
    }

    #[test]
    fn dispatcher_sequence_numbers_increase() {
        let mut disp = Dispatcher::new();
        let (a, _rx_a) = disp.register();
        let (b, _rx_b) = disp.register();
        assert!(b > a);
        assert_eq!(disp.pending_count(), 2);
    }

    #[tokio::test]
    async fn dispatcher_success_resolves_body() {
        let mut disp = Dispatcher::new();
        let (seq, rx) = disp.register();
        disp.complete(response(seq, true, Some(serde_json::json!({"result": "3"}))));
        let body = rx.await.unwrap().unwrap().unwrap();
        assert_eq!(body["result"], "3");
        assert_eq!(disp.pending_count(), 0);
    }

    #[tokio::test]
    async fn dispatcher_failure_resolves_request_error() {
        let mut disp = Dispatcher::new();
        let (seq, rx) = disp.register();
        disp.complete(response(seq, false, None));
        let err = rx.await.unwrap().unwrap_err();
        match err {
            DapError::Request { command, message } => {
                assert_eq!(command, "evaluate");
                assert_eq!(message, "eval failed");
            }
            other => panic!("expected Request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatcher_out_of_order_correlation() {
        let mut disp = Dispatcher::new();
        let (seq_a, rx_a) = disp.register();
        let (seq_b, rx_b) = disp.register();
        assert!(seq_a < seq_b);

        // Responses arrive b then a.
        disp.complete(response(seq_b, true, Some(serde_json::json!("b"))));
        disp.complete(response(seq_a, true, Some(serde_json::json!("a"))));

        assert_eq!(rx_a.await.unwrap().unwrap(), Some(serde_json::json!("a")));
        assert_eq!(rx_b.await.unwrap().unwrap(), Some(serde_json::json!("b")));
    }

    #[test]
    fn dispatcher_unknown_seq_discarded() {
        let mut disp = Dispatcher::new();
        // No pending entry; must not panic.
        disp.complete(response(99, true, None));
        assert_eq!(disp.pending_count(), 0);
    }

    #[tokio::test]
    async fn dispatcher_fail_all_on_closure() {
        let mut disp = Dispatcher::new();
        let (_a, rx_a) = disp.register();
        let (_b, rx_b) = disp.register();
        disp.fail_all();
        assert_eq!(disp.pending_count(), 0);
        assert!(matches!(
            rx_a.await.unwrap(),
            Err(DapError::TransportClosed)
        ));
        assert!(matches!(
            rx_b.await.unwrap(),
            Err(DapError::TransportClosed)
        ));
    }

    #[test]
    fn dispatcher_default_starts_sequence_at_one() {
        let mut dispatcher = Dispatcher::default();
        let (seq, _rx) = dispatcher.register();
        assert_eq!(seq, 1);
    }

    #[test]
    fn dispatcher_forget_removes_entry() {
        let mut disp = Dispatcher::new();
        let (seq, _rx) = disp.register();
        assert!(disp.forget(seq));
        assert!(!disp.forget(seq));
        assert_eq!(disp.pending_count(), 0);
    }

    #[tokio::test]
    async fn dispatcher_dropped_receiver_does_not_panic() {
        let mut disp = Dispatcher::new();
        let (seq, rx) = disp.register();
        drop(rx);
        disp.complete(response(seq, true, None));
    }
}
