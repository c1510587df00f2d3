//! Provisioning Service
//!
//! Owns creation and deletion of client configurations. A creation run
//! generates a fresh identity, allocates the next address in the target
//! server's subnet, renders the profile text, and persists the record —
//! all under the invariants:
//!
//! - at most `max_configs_per_user` configs per user
//! - at most one config per (user, server) pair
//! - no two configs on a server ever share an allocation index
//!
//! The count-then-allocate sequence is a per-server critical section:
//! concurrent creations for the same server serialize on that server's
//! lock, so the allocation index stays unique without a free-list.

use crate::keys::KeyPair;
use crate::model::{
    ClientConfig, ConfigId, ConfigView, ServerId, UserId, UNKNOWN_SERVER,
};
use crate::profile::{self, ProfileError, ProfileParams, ALLOWED_IPS_ALL};
use crate::settings::VpnSettings;
use crate::store::{NewConfig, Store, StoreError};
use crate::subnet::{self, AllocError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Provisioning failures, all recoverable at the caller
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Maximum {limit} configurations allowed per user")]
    QuotaExceeded { limit: u32 },

    #[error("Server {0} not found")]
    ServerNotFound(ServerId),

    #[error("Server {0} is not active")]
    ServerInactive(ServerId),

    #[error("Configuration already exists for server {0}")]
    DuplicateConfig(ServerId),

    #[error("Configuration {0} not found")]
    NotFound(ConfigId),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Provisioning service
pub struct ProvisioningService {
    store: Arc<dyn Store>,
    settings: VpnSettings,
    /// Per-server critical sections for the count-then-allocate sequence
    server_locks: Mutex<HashMap<ServerId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProvisioningService {
    pub fn new(store: Arc<dyn Store>, settings: VpnSettings) -> Self {
        Self {
            store,
            settings,
            server_locks: Mutex::new(HashMap::new()),
        }
    }

    fn server_lock(&self, server_id: ServerId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.server_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(server_id).or_default().clone()
    }

    /// Create a configuration for `user_id` on `server_id`.
    ///
    /// `dns_servers` falls back to the configured default when `None`.
    pub async fn create_config(
        &self,
        user_id: UserId,
        server_id: ServerId,
        dns_servers: Option<&str>,
    ) -> Result<ClientConfig, ProvisionError> {
        let server = self
            .store
            .get_server(server_id)?
            .ok_or(ProvisionError::ServerNotFound(server_id))?;
        if !server.is_active {
            return Err(ProvisionError::ServerInactive(server_id));
        }

        let lock = self.server_lock(server_id);
        let _guard = lock.lock().await;

        let existing = self.store.list_configs_for_user(user_id)?;
        let limit = self.settings.max_configs_per_user;
        if existing.len() as u32 >= limit {
            return Err(ProvisionError::QuotaExceeded { limit });
        }
        if existing.iter().any(|c| c.server_id == server_id) {
            return Err(ProvisionError::DuplicateConfig(server_id));
        }

        // Index is the count of configs this server has ever been
        // provisioned before this call; the guard above keeps it unique.
        let index = self.store.count_configs_for_server(server_id)?;
        let address = subnet::allocate(server_id, index)?;
        let identity = KeyPair::generate();

        let dns = dns_servers.unwrap_or(&self.settings.default_dns_servers);
        let private_b64 = identity.private.to_base64();
        let profile_text = profile::render(&ProfileParams {
            private_key: &private_b64,
            server_public_key: &server.public_key,
            endpoint: &server.endpoint,
            port: server.port,
            address,
            dns_servers: dns,
            allowed_ips: ALLOWED_IPS_ALL,
        })?;

        let config = self.store.insert_config(NewConfig {
            user_id,
            server_id,
            private_key: private_b64,
            public_key: identity.public.to_base64(),
            address,
            dns_servers: dns.to_string(),
            profile_text,
        })?;

        info!(
            "Provisioned config {} for user {} on server {} ({})",
            config.id, user_id, server_id, address
        );
        Ok(config)
    }

    /// All of the user's configs, resolved against server display fields.
    ///
    /// A dangling server reference degrades that row to a placeholder
    /// name instead of failing the whole listing.
    pub fn list_configs(&self, user_id: UserId) -> Result<Vec<ConfigView>, ProvisionError> {
        let configs = self.store.list_configs_for_user(user_id)?;
        let mut views = Vec::with_capacity(configs.len());

        for config in configs {
            let server = self.store.get_server(config.server_id)?;
            let (name, country) = match server {
                Some(s) => (s.name, s.country),
                None => {
                    debug!(
                        "Config {} references missing server {}",
                        config.id, config.server_id
                    );
                    (UNKNOWN_SERVER.to_string(), UNKNOWN_SERVER.to_string())
                }
            };
            views.push(ConfigView {
                id: config.id,
                server_id: config.server_id,
                server_name: name,
                server_country: country,
                public_key: config.public_key,
                address: config.address,
                dns_servers: config.dns_servers,
                profile_text: config.profile_text,
                is_active: config.is_active,
                created_at: config.created_at,
            });
        }
        Ok(views)
    }

    /// Single config lookup, ownership-checked
    pub fn get_config(
        &self,
        user_id: UserId,
        config_id: ConfigId,
    ) -> Result<ClientConfig, ProvisionError> {
        self.store
            .get_config(config_id)?
            .filter(|c| c.user_id == user_id)
            .ok_or(ProvisionError::NotFound(config_id))
    }

    /// Permanently remove a config the user owns.
    ///
    /// The freed address is not reclaimed; see the allocation module.
    pub fn delete_config(
        &self,
        user_id: UserId,
        config_id: ConfigId,
    ) -> Result<(), ProvisionError> {
        // Ownership check first so a foreign id reads as NotFound
        self.get_config(user_id, config_id)?;
        self.store.delete_config(config_id)?;

        info!("Deleted config {} for user {}", config_id, user_id);
        Ok(())
    }
}
