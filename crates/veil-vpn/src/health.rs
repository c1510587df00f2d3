//! Server Health
//!
//! Probes a server endpoint over TCP and derives the real-time status
//! callers see (online flag, latency, load percentage). A scheduler
//! decides when to probe; this module only defines what a probe does.

use crate::model::{ServerId, ServerStatus};
use crate::store::{Store, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Default probe timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health lookup failures
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Server {0} not found")]
    ServerNotFound(ServerId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one endpoint probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub online: bool,
    /// Connect latency; 0 when offline
    pub latency_ms: f32,
}

/// Attempt a TCP connect to `host:port` within `timeout`.
///
/// Any connect failure or timeout reads as offline; the probe never
/// hangs past its deadline.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Probe {
    let start = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => {
            let latency_ms = start.elapsed().as_secs_f32() * 1000.0;
            debug!("Probe {}:{} ok ({:.1}ms)", host, port, latency_ms);
            Probe { online: true, latency_ms }
        }
        Ok(Err(e)) => {
            debug!("Probe {}:{} failed: {}", host, port, e);
            Probe { online: false, latency_ms: 0.0 }
        }
        Err(_) => {
            debug!("Probe {}:{} timed out after {:?}", host, port, timeout);
            Probe { online: false, latency_ms: 0.0 }
        }
    }
}

/// Load percentage from the live counters, capped at 100
pub fn load_percentage(current_users: u32, max_users: u32) -> f32 {
    if max_users == 0 {
        return 0.0;
    }
    (current_users as f32 / max_users as f32 * 100.0).min(100.0)
}

/// Health service over the storage collaborator
pub struct HealthService {
    store: Arc<dyn Store>,
}

impl HealthService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Probe a server and report its real-time status.
    ///
    /// The probed latency is persisted best-effort; a store failure is
    /// logged and does not affect the returned status.
    pub async fn server_status(&self, server_id: ServerId) -> Result<ServerStatus, HealthError> {
        let mut server = self
            .store
            .get_server(server_id)?
            .ok_or(HealthError::ServerNotFound(server_id))?;

        let result = probe(&server.endpoint, server.port, PROBE_TIMEOUT).await;

        if result.online {
            server.latency_ms = result.latency_ms;
            if let Err(e) = self.store.update_server(&server) {
                warn!("Failed to persist latency for server {}: {}", server_id, e);
            }
        }

        Ok(ServerStatus {
            server_id,
            is_online: result.online && server.is_active,
            load_percentage: load_percentage(server.current_users, server.max_users),
            latency_ms: if result.online { result.latency_ms } else { 0.0 },
            current_users: server.current_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServerProfile;
    use crate::store::MemStore;
    use tokio::net::TcpListener;

    fn server(id: ServerId, endpoint: &str, port: u16) -> ServerProfile {
        ServerProfile {
            id,
            name: format!("server-{id}"),
            country: "Germany".into(),
            endpoint: endpoint.into(),
            port,
            public_key: "c2VydmVyLWtleS1zZXJ2ZXIta2V5LXNlcnZlci1rZXk=".into(),
            is_active: true,
            max_users: 100,
            current_users: 25,
            latency_ms: 0.0,
        }
    }

    #[test]
    fn test_load_percentage() {
        assert_eq!(load_percentage(25, 100), 25.0);
        assert_eq!(load_percentage(150, 100), 100.0);
        assert_eq!(load_percentage(5, 0), 0.0);
    }

    #[tokio::test]
    async fn test_probe_reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = probe("127.0.0.1", port, PROBE_TIMEOUT).await;

        assert!(result.online);
        assert!(result.latency_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_offline() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = probe("127.0.0.1", port, Duration::from_millis(500)).await;

        assert!(!result.online);
        assert_eq!(result.latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_server_status_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let store = Arc::new(MemStore::new());
        store.add_server(server(1, "127.0.0.1", port));
        let health = HealthService::new(store.clone());

        let status = health.server_status(1).await.unwrap();

        assert!(status.is_online);
        assert_eq!(status.load_percentage, 25.0);
        assert_eq!(status.current_users, 25);
        // Latency was persisted
        assert!(store.get_server(1).unwrap().unwrap().latency_ms > 0.0);
    }

    #[tokio::test]
    async fn test_server_status_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = Arc::new(MemStore::new());
        store.add_server(server(1, "127.0.0.1", port));
        let health = HealthService::new(store);

        let status = health.server_status(1).await.unwrap();

        assert!(!status.is_online);
        assert_eq!(status.latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let health = HealthService::new(Arc::new(MemStore::new()));
        assert!(matches!(
            health.server_status(9).await,
            Err(HealthError::ServerNotFound(9))
        ));
    }
}
