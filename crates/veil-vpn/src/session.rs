//! Session Lifecycle
//!
//! Per-user connect/disconnect state machine over the session records.
//! The invariant is "at most one active session per user": connecting
//! while connected force-ends the old session first (a hand-off, not an
//! error), and both transitions adjust the affected servers' live user
//! counters. Transitions for one user serialize on that user's lock so
//! concurrent connects can neither leave two sessions active nor skew
//! the counters.
//!
//! Duration is derived (`now - connected_at`), never ticked, so `status`
//! is idempotent and safe to poll. The persisted duration is a cache for
//! reporting only.

use crate::model::{
    ConfigId, ConnectionStatus, Session, UserId, UNKNOWN_SERVER,
};
use crate::store::{NewSession, Store, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{info, warn};

/// Session transition failures
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Configuration {0} not found")]
    NotFound(ConfigId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Session manager
pub struct SessionManager {
    store: Arc<dyn Store>,
    /// Per-user critical sections for state transitions
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

fn elapsed_secs(start: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(start).map(|d| d.as_secs()).unwrap_or(0)
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(user_id).or_default().clone()
    }

    fn server_name(&self, session: &Session) -> Result<String, StoreError> {
        Ok(self
            .store
            .get_server(session.server_id)?
            .map(|s| s.name)
            .unwrap_or_else(|| UNKNOWN_SERVER.to_string()))
    }

    /// End a session record and release its server slot
    fn end_session(&self, mut session: Session, now: SystemTime) -> Result<(), SessionError> {
        session.is_active = false;
        session.disconnected_at = Some(now);
        session.duration_secs = elapsed_secs(session.connected_at, now);
        self.store.update_session(&session)?;
        self.store.update_server_user_count(session.server_id, -1)?;

        info!(
            "Ended session {} for user {} after {}s",
            session.id, session.user_id, session.duration_secs
        );
        Ok(())
    }

    /// Connect the user through one of their configs.
    ///
    /// An already-active session is handed off: ended first, then the
    /// new one starts against the config's server.
    pub async fn connect(
        &self,
        user_id: UserId,
        config_id: ConfigId,
    ) -> Result<ConnectionStatus, SessionError> {
        let config = self
            .store
            .get_config(config_id)?
            .filter(|c| c.user_id == user_id)
            .ok_or(SessionError::NotFound(config_id))?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let now = SystemTime::now();
        if let Some(old) = self.store.get_active_session_for_user(user_id)? {
            info!(
                "User {} reconnecting: handing off session {} on server {}",
                user_id, old.id, old.server_id
            );
            self.end_session(old, now)?;
        }

        let session = self.store.insert_session(NewSession {
            user_id,
            server_id: config.server_id,
            config_id,
            connected_at: now,
        })?;
        self.store.update_server_user_count(config.server_id, 1)?;

        let server_name = self.server_name(&session)?;
        info!(
            "User {} connected to server {} (session {})",
            user_id, config.server_id, session.id
        );

        Ok(ConnectionStatus {
            is_connected: true,
            server_id: Some(config.server_id),
            server_name: Some(server_name),
            bytes_sent: 0,
            bytes_received: 0,
            duration_secs: 0,
            connected_at: Some(now),
        })
    }

    /// End the user's active session, if any.
    ///
    /// Disconnecting while disconnected is a successful no-op.
    pub async fn disconnect(&self, user_id: UserId) -> Result<ConnectionStatus, SessionError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(session) = self.store.get_active_session_for_user(user_id)? {
            self.end_session(session, SystemTime::now())?;
        }
        Ok(ConnectionStatus::disconnected())
    }

    /// Current status with a freshly derived duration.
    ///
    /// The recomputed duration is persisted best-effort; a store failure
    /// there is logged and swallowed because the returned value is
    /// computed in memory either way.
    pub async fn status(&self, user_id: UserId) -> Result<ConnectionStatus, SessionError> {
        let Some(mut session) = self.store.get_active_session_for_user(user_id)? else {
            return Ok(ConnectionStatus::disconnected());
        };

        let duration_secs = elapsed_secs(session.connected_at, SystemTime::now());
        session.duration_secs = duration_secs;
        if let Err(e) = self.store.update_session(&session) {
            warn!("Failed to persist refreshed duration for session {}: {}", session.id, e);
        }

        let server_name = self.server_name(&session)?;
        Ok(ConnectionStatus {
            is_connected: true,
            server_id: Some(session.server_id),
            server_name: Some(server_name),
            bytes_sent: session.bytes_sent,
            bytes_received: session.bytes_received,
            duration_secs,
            connected_at: Some(session.connected_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ServerId, ServerProfile};
    use crate::provision::ProvisioningService;
    use crate::settings::VpnSettings;
    use crate::store::MemStore;

    fn server(id: ServerId) -> ServerProfile {
        ServerProfile {
            id,
            name: format!("server-{id}"),
            country: "Germany".into(),
            endpoint: format!("srv{id}.veil.example"),
            port: 51820,
            public_key: "c2VydmVyLWtleS1zZXJ2ZXIta2V5LXNlcnZlci1rZXk=".into(),
            is_active: true,
            max_users: 100,
            current_users: 0,
            latency_ms: 0.0,
        }
    }

    async fn setup(server_ids: &[ServerId]) -> (SessionManager, ProvisioningService, Arc<MemStore>) {
        let store = Arc::new(MemStore::new());
        for id in server_ids {
            store.add_server(server(*id));
        }
        let provisioning = ProvisioningService::new(store.clone(), VpnSettings::default());
        let sessions = SessionManager::new(store.clone());
        (sessions, provisioning, store)
    }

    fn current_users(store: &MemStore, id: ServerId) -> u32 {
        store.get_server(id).unwrap().unwrap().current_users
    }

    #[tokio::test]
    async fn test_connect_reports_new_session() {
        let (sessions, provisioning, store) = setup(&[1]).await;
        let config = provisioning.create_config(1, 1, None).await.unwrap();

        let status = sessions.connect(1, config.id).await.unwrap();

        assert!(status.is_connected);
        assert_eq!(status.server_id, Some(1));
        assert_eq!(status.server_name.as_deref(), Some("server-1"));
        assert_eq!(status.bytes_sent, 0);
        assert_eq!(status.duration_secs, 0);
        assert_eq!(current_users(&store, 1), 1);
    }

    #[tokio::test]
    async fn test_connect_unowned_config_is_not_found() {
        let (sessions, provisioning, _) = setup(&[1]).await;
        let config = provisioning.create_config(1, 1, None).await.unwrap();

        assert!(matches!(
            sessions.connect(2, config.id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            sessions.connect(1, 999).await,
            Err(SessionError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_reconnect_hands_off_old_session() {
        let (sessions, provisioning, store) = setup(&[1, 2]).await;
        let first = provisioning.create_config(1, 1, None).await.unwrap();
        let second = provisioning.create_config(1, 2, None).await.unwrap();

        sessions.connect(1, first.id).await.unwrap();
        let status = sessions.connect(1, second.id).await.unwrap();

        assert_eq!(status.server_id, Some(2));
        assert_eq!(current_users(&store, 1), 0);
        assert_eq!(current_users(&store, 2), 1);

        let history = store.list_sessions_for_user(1).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[0].disconnected_at.is_some());
        assert!(history[1].is_active);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_noop() {
        let (sessions, _, _) = setup(&[]).await;

        let status = sessions.disconnect(42).await.unwrap();
        assert!(!status.is_connected);
    }

    #[tokio::test]
    async fn test_disconnect_ends_session_and_decrements() {
        let (sessions, provisioning, store) = setup(&[1]).await;
        let config = provisioning.create_config(1, 1, None).await.unwrap();

        sessions.connect(1, config.id).await.unwrap();
        let status = sessions.disconnect(1).await.unwrap();

        assert!(!status.is_connected);
        assert_eq!(current_users(&store, 1), 0);

        // Second disconnect must not drive the counter negative
        sessions.disconnect(1).await.unwrap();
        assert_eq!(current_users(&store, 1), 0);
    }

    #[tokio::test]
    async fn test_status_reports_active_session() {
        let (sessions, provisioning, _) = setup(&[1]).await;
        let config = provisioning.create_config(1, 1, None).await.unwrap();
        sessions.connect(1, config.id).await.unwrap();

        let status = sessions.status(1).await.unwrap();
        assert!(status.is_connected);
        assert_eq!(status.server_name.as_deref(), Some("server-1"));

        // Polling twice must be idempotent
        let again = sessions.status(1).await.unwrap();
        assert!(again.is_connected);
        assert!(again.duration_secs >= status.duration_secs);
    }

    #[tokio::test]
    async fn test_status_without_session_is_disconnected() {
        let (sessions, _, _) = setup(&[]).await;
        let status = sessions.status(7).await.unwrap();
        assert!(!status.is_connected);
    }

    #[tokio::test]
    async fn test_concurrent_connects_leave_one_active_session() {
        let (sessions, provisioning, store) = setup(&[1, 2, 3, 4]).await;
        let mut config_ids = Vec::new();
        for server_id in 1..=4 {
            let config = provisioning.create_config(1, server_id, None).await.unwrap();
            config_ids.push(config.id);
        }

        let sessions = Arc::new(sessions);
        let mut handles = Vec::new();
        for config_id in config_ids {
            let sessions = sessions.clone();
            handles.push(tokio::spawn(async move {
                sessions.connect(1, config_id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let active: Vec<_> = store
            .list_sessions_for_user(1)
            .unwrap()
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        assert_eq!(active.len(), 1);

        let total: u32 = (1..=4).map(|id| current_users(&store, id)).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_session_history_is_append_only() {
        let (sessions, provisioning, store) = setup(&[1]).await;
        let config = provisioning.create_config(1, 1, None).await.unwrap();

        for _ in 0..3 {
            sessions.connect(1, config.id).await.unwrap();
            sessions.disconnect(1).await.unwrap();
        }

        let history = store.list_sessions_for_user(1).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|s| !s.is_active));
        assert!(history.iter().all(|s| s.disconnected_at.is_some()));
    }
}
