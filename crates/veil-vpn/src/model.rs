//! Core Entities
//!
//! Records the provisioning and session subsystems exchange with their
//! storage collaborator, plus the public status payloads returned to
//! callers.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::SystemTime;

pub type UserId = u32;
pub type ServerId = u32;
pub type ConfigId = u64;
pub type SessionId = u64;

/// One VPN endpoint a client can be provisioned for.
///
/// Managed by an operator workflow; `current_users` is only mutated by
/// session transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProfile {
    pub id: ServerId,
    /// Display name
    pub name: String,
    /// Country display name
    pub country: String,
    /// Endpoint host (name or IP)
    pub endpoint: String,
    /// WireGuard UDP port
    pub port: u16,
    /// Server public key, base64
    pub public_key: String,
    /// Operator enable flag
    pub is_active: bool,
    /// Capacity
    pub max_users: u32,
    /// Live session counter
    pub current_users: u32,
    /// Last probed latency, milliseconds (0 while unknown/offline)
    pub latency_ms: f32,
}

/// A provisioned client configuration.
///
/// Created and destroyed together with its key pair; exactly one per
/// (user, server) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub id: ConfigId,
    pub user_id: UserId,
    pub server_id: ServerId,
    /// Client private key, base64. Never exposed through listings.
    pub private_key: String,
    /// Client public key, base64
    pub public_key: String,
    /// Allocated address within the server subnet
    pub address: Ipv4Addr,
    /// Comma-separated DNS servers baked into the profile
    pub dns_servers: String,
    /// Rendered profile text
    pub profile_text: String,
    pub is_active: bool,
    pub created_at: SystemTime,
}

/// One connect span for a user.
///
/// Never deleted: once ended it is an immutable historical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub server_id: ServerId,
    pub config_id: ConfigId,
    pub connected_at: SystemTime,
    pub disconnected_at: Option<SystemTime>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Cached `now - connected_at` for reporting; never authoritative
    pub duration_secs: u64,
    pub is_active: bool,
}

/// Placeholder shown when a config references a server that no longer
/// resolves (defensive; should not occur).
pub const UNKNOWN_SERVER: &str = "Unknown";

/// A config resolved against its server's display fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    pub id: ConfigId,
    pub server_id: ServerId,
    pub server_name: String,
    pub server_country: String,
    pub public_key: String,
    pub address: Ipv4Addr,
    pub dns_servers: String,
    pub profile_text: String,
    pub is_active: bool,
    pub created_at: SystemTime,
}

/// Public session status returned by connect/disconnect/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub server_id: Option<ServerId>,
    pub server_name: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub duration_secs: u64,
    pub connected_at: Option<SystemTime>,
}

impl ConnectionStatus {
    /// Status for a user with no active session
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            server_id: None,
            server_name: None,
            bytes_sent: 0,
            bytes_received: 0,
            duration_secs: 0,
            connected_at: None,
        }
    }
}

/// Real-time server status derived from the live counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_id: ServerId,
    pub is_online: bool,
    /// `current_users / max_users`, percent, capped at 100
    pub load_percentage: f32,
    pub latency_ms: f32,
    pub current_users: u32,
}
