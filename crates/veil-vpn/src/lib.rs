//! Veil VPN - Provisioning and Session Engine
//!
//! Allocates unique client identities and addresses per (user, server)
//! pair, renders WireGuard client profiles, and tracks the single
//! active session per user with server load accounting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                ProvisioningService                  │
//! │                                                     │
//! │  ┌─────────┐   ┌───────────┐   ┌────────────────┐   │
//! │  │ KeyPair │   │ Allocator │   │ ProfileRender  │   │
//! │  │ (X25519)│   │ (10.S/16) │   │ ([Interface])  │   │
//! │  └─────────┘   └───────────┘   └────────────────┘   │
//! └───────────────────────┬─────────────────────────────┘
//!                         │ ClientConfig records
//!                         ▼
//! ┌─────────────────────────────────────────────────────┐
//! │  SessionManager  ──  Store collaborator  ──  Stats  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Transport, authentication, and persistence backends live outside
//! this crate; everything here talks to storage through the [`Store`]
//! trait and is driven one operation at a time.

mod health;
mod keys;
mod model;
mod profile;
mod provision;
mod session;
mod settings;
mod stats;
mod store;
mod subnet;

pub use health::{load_percentage, probe, HealthError, HealthService, Probe, PROBE_TIMEOUT};
pub use keys::{KeyError, KeyPair, PrivateKey, PublicKey};
pub use model::{
    ClientConfig, ConfigId, ConfigView, ConnectionStatus, ServerId, ServerProfile, ServerStatus,
    Session, SessionId, UserId, UNKNOWN_SERVER,
};
pub use profile::{render, ProfileError, ProfileParams, ALLOWED_IPS_ALL};
pub use provision::{ProvisionError, ProvisioningService};
pub use session::{SessionError, SessionManager};
pub use settings::VpnSettings;
pub use stats::{format_bytes, format_duration, DailyUsage, StatsService, UsageSummary};
pub use store::{MemStore, NewConfig, NewSession, Store, StoreError};
pub use subnet::{allocate, capacity, server_subnet, AllocError};
