//! Registry of concurrent debug sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use drover_dap::{AdapterRegistry, DapClient};

use crate::error::SessionError;
use crate::session::{DebugSession, SessionInfo, SessionState};

/// Owns every live [`DebugSession`], keyed by caller-chosen id.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<DebugSession>>>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a session over an already-built client and register
    /// it. Fails with [`SessionError::DuplicateSession`] when a live
    /// session already holds the id.
    pub async fn create(
        &self,
        id: &str,
        adapter_name: &str,
        launch_hints: serde_json::Map<String, serde_json::Value>,
        client: DapClient,
    ) -> Result<Arc<DebugSession>, SessionError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(existing) = sessions.get(id) {
                if Self::is_live(existing).await {
                    return Err(SessionError::DuplicateSession(id.to_string()));
                }
            }
        }

        let session = DebugSession::connect(id, adapter_name, launch_hints, client).await?;

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock: the handshake yielded.
        if let Some(existing) = sessions.get(id) {
            if Self::is_live(existing).await {
                drop(sessions);
                let _ = session.disconnect().await;
                return Err(SessionError::DuplicateSession(id.to_string()));
            }
        }
        sessions.insert(id.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Spawn an adapter process from the registry and connect a
    /// session over its stdio.
    pub async fn launch_adapter(
        &self,
        id: &str,
        registry: &AdapterRegistry,
        adapter_name: &str,
    ) -> Result<Arc<DebugSession>, SessionError> {
        let spec = registry.resolve(adapter_name)?;
        let client = DapClient::spawn(&spec.command, &spec.args)?;
        self.create(id, adapter_name, spec.launch_hints.clone(), client)
            .await
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Result<Arc<DebugSession>, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))
    }

    /// Disconnect and deregister a session. The disconnect is best
    /// effort; the session is removed regardless.
    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(id)
                .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?
        };
        let _ = session.disconnect().await;
        Ok(())
    }

    /// Drop every ended session, plus any session idle longer than
    /// `max_idle`. Returns how many were removed.
    pub async fn cleanup(&self, max_idle: Duration) -> usize {
        let candidates: Vec<(String, Arc<DebugSession>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, s)| (id.clone(), Arc::clone(s)))
                .collect()
        };

        let mut expired = Vec::new();
        for (id, session) in candidates {
            let state = session.state().await;
            let ended = matches!(state, SessionState::Terminated | SessionState::Error);
            if ended || session.idle_time().await > max_idle {
                expired.push((id, session));
            }
        }

        let mut removed = 0;
        for (id, session) in expired {
            let _ = session.disconnect().await;
            let mut sessions = self.sessions.write().await;
            if sessions.remove(&id).is_some() {
                removed += 1;
                tracing::info!(session = %id, "cleaned up session");
            }
        }
        removed
    }

    /// Summaries of every registered session.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<DebugSession>> = {
            self.sessions.read().await.values().cloned().collect()
        };
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Number of registered sessions (live or ended).
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn is_live(session: &Arc<DebugSession>) -> bool {
        !matches!(
            session.state().await,
            SessionState::Terminated | SessionState::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_get_unknown_session() {
        let manager = SessionManager::new();
        let err = manager.get("nope").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(id) if id == "nope"));
    }

    #[tokio::test]
    async fn manager_remove_unknown_session() {
        let manager = SessionManager::new();
        let err = manager.remove("nope").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn manager_cleanup_on_empty_manager() {
        let manager = SessionManager::new();
        assert_eq!(manager.cleanup(Duration::from_secs(60)).await, 0);
        assert_eq!(manager.count().await, 0);
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn manager_launch_unknown_adapter() {
        let manager = SessionManager::new();
        let registry = AdapterRegistry::with_builtins();
        let err = manager
            .launch_adapter("dbg-1", &registry, "cobol")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown adapter"));
    }
}
