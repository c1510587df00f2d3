//! Storage Collaborator
//!
//! The provisioning and session subsystems persist through this trait
//! only: simple key lookups and updates, no joins. Relationship
//! traversal (config -> server) is always an explicit lookup call,
//! never an assumed pre-loaded relation.
//!
//! `MemStore` is the in-process implementation used by tests and
//! embedded deployments; a database-backed implementation plugs in
//! behind the same trait.

use crate::model::{
    ClientConfig, ConfigId, ServerId, ServerProfile, Session, SessionId, UserId,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::RwLock;
use std::time::SystemTime;

/// Storage failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Insert payload for a new client config (the store assigns the id)
#[derive(Debug, Clone)]
pub struct NewConfig {
    pub user_id: UserId,
    pub server_id: ServerId,
    pub private_key: String,
    pub public_key: String,
    pub address: Ipv4Addr,
    pub dns_servers: String,
    pub profile_text: String,
}

/// Insert payload for a new session (the store assigns the id)
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub server_id: ServerId,
    pub config_id: ConfigId,
    pub connected_at: SystemTime,
}

/// Key-based CRUD consumed by the core services
pub trait Store: Send + Sync {
    fn get_server(&self, id: ServerId) -> Result<Option<ServerProfile>, StoreError>;
    fn list_servers(&self, active_only: bool) -> Result<Vec<ServerProfile>, StoreError>;
    fn update_server(&self, server: &ServerProfile) -> Result<(), StoreError>;

    /// Adjust a server's live session counter by `delta`, flooring at 0
    fn update_server_user_count(&self, id: ServerId, delta: i32) -> Result<(), StoreError>;

    fn count_configs_for_server(&self, id: ServerId) -> Result<u32, StoreError>;
    fn get_config(&self, id: ConfigId) -> Result<Option<ClientConfig>, StoreError>;
    fn list_configs_for_user(&self, id: UserId) -> Result<Vec<ClientConfig>, StoreError>;
    fn insert_config(&self, config: NewConfig) -> Result<ClientConfig, StoreError>;

    /// Returns true if the config existed
    fn delete_config(&self, id: ConfigId) -> Result<bool, StoreError>;

    fn get_active_session_for_user(&self, id: UserId) -> Result<Option<Session>, StoreError>;
    fn list_sessions_for_user(&self, id: UserId) -> Result<Vec<Session>, StoreError>;
    fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;
    fn update_session(&self, session: &Session) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Tables {
    servers: HashMap<ServerId, ServerProfile>,
    configs: HashMap<ConfigId, ClientConfig>,
    sessions: HashMap<SessionId, Session>,
    next_config_id: ConfigId,
    next_session_id: SessionId,
}

/// In-memory store
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_config_id: 1,
                next_session_id: 1,
                ..Tables::default()
            }),
        }
    }

    /// Seed a server record (operator workflow stand-in)
    pub fn add_server(&self, server: ServerProfile) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.servers.insert(server.id, server);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn get_server(&self, id: ServerId) -> Result<Option<ServerProfile>, StoreError> {
        Ok(self.read().servers.get(&id).cloned())
    }

    fn list_servers(&self, active_only: bool) -> Result<Vec<ServerProfile>, StoreError> {
        let mut servers: Vec<_> = self
            .read()
            .servers
            .values()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        servers.sort_by_key(|s| s.id);
        Ok(servers)
    }

    fn update_server(&self, server: &ServerProfile) -> Result<(), StoreError> {
        self.write().servers.insert(server.id, server.clone());
        Ok(())
    }

    fn update_server_user_count(&self, id: ServerId, delta: i32) -> Result<(), StoreError> {
        let mut tables = self.write();
        if let Some(server) = tables.servers.get_mut(&id) {
            server.current_users = server.current_users.saturating_add_signed(delta);
        }
        Ok(())
    }

    fn count_configs_for_server(&self, id: ServerId) -> Result<u32, StoreError> {
        Ok(self.read().configs.values().filter(|c| c.server_id == id).count() as u32)
    }

    fn get_config(&self, id: ConfigId) -> Result<Option<ClientConfig>, StoreError> {
        Ok(self.read().configs.get(&id).cloned())
    }

    fn list_configs_for_user(&self, id: UserId) -> Result<Vec<ClientConfig>, StoreError> {
        let mut configs: Vec<_> = self
            .read()
            .configs
            .values()
            .filter(|c| c.user_id == id)
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.id);
        Ok(configs)
    }

    fn insert_config(&self, config: NewConfig) -> Result<ClientConfig, StoreError> {
        let mut tables = self.write();
        let id = tables.next_config_id;
        tables.next_config_id += 1;

        let record = ClientConfig {
            id,
            user_id: config.user_id,
            server_id: config.server_id,
            private_key: config.private_key,
            public_key: config.public_key,
            address: config.address,
            dns_servers: config.dns_servers,
            profile_text: config.profile_text,
            is_active: true,
            created_at: SystemTime::now(),
        };
        tables.configs.insert(id, record.clone());
        Ok(record)
    }

    fn delete_config(&self, id: ConfigId) -> Result<bool, StoreError> {
        Ok(self.write().configs.remove(&id).is_some())
    }

    fn get_active_session_for_user(&self, id: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .read()
            .sessions
            .values()
            .find(|s| s.user_id == id && s.is_active)
            .cloned())
    }

    fn list_sessions_for_user(&self, id: UserId) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<_> = self
            .read()
            .sessions
            .values()
            .filter(|s| s.user_id == id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut tables = self.write();
        let id = tables.next_session_id;
        tables.next_session_id += 1;

        let record = Session {
            id,
            user_id: session.user_id,
            server_id: session.server_id,
            config_id: session.config_id,
            connected_at: session.connected_at,
            disconnected_at: None,
            bytes_sent: 0,
            bytes_received: 0,
            duration_secs: 0,
            is_active: true,
        };
        tables.sessions.insert(id, record.clone());
        Ok(record)
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        self.write().sessions.insert(session.id, session.clone());
        Ok(())
    }
}
