//! Client Profile Rendering
//!
//! Renders the WireGuard profile text a client imports. The render is a
//! pure function of its inputs and byte-for-byte reproducible, so a lost
//! profile can be regenerated from the stored config fields and tests
//! can assert on exact output.

use std::net::Ipv4Addr;

/// Route-everything default for AllowedIPs
pub const ALLOWED_IPS_ALL: &str = "0.0.0.0/0,::/0";

/// Keepalive interval (seconds) written into every profile
const PERSISTENT_KEEPALIVE: u16 = 25;

/// Profile rendering errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Missing client private key")]
    MissingPrivateKey,

    #[error("Missing server public key")]
    MissingServerKey,

    #[error("Missing server endpoint")]
    MissingEndpoint,
}

/// Inputs for one profile render
#[derive(Debug, Clone)]
pub struct ProfileParams<'a> {
    /// Client private key, base64
    pub private_key: &'a str,
    /// Server public key, base64
    pub server_public_key: &'a str,
    /// Server endpoint host (name or IP)
    pub endpoint: &'a str,
    /// Server UDP port
    pub port: u16,
    /// Allocated client address (written as `/32`)
    pub address: Ipv4Addr,
    /// Comma-separated DNS servers
    pub dns_servers: &'a str,
    /// Comma-separated AllowedIPs CIDRs
    pub allowed_ips: &'a str,
}

/// Render the client profile text.
///
/// Section layout and field order match what WireGuard tooling parses:
/// an `[Interface]` block for the client side followed by one `[Peer]`
/// block for the server.
pub fn render(params: &ProfileParams<'_>) -> Result<String, ProfileError> {
    if params.private_key.trim().is_empty() {
        return Err(ProfileError::MissingPrivateKey);
    }
    if params.server_public_key.trim().is_empty() {
        return Err(ProfileError::MissingServerKey);
    }
    if params.endpoint.trim().is_empty() {
        return Err(ProfileError::MissingEndpoint);
    }

    Ok(format!(
        "[Interface]\n\
         PrivateKey = {private}\n\
         Address = {address}/32\n\
         DNS = {dns}\n\
         \n\
         [Peer]\n\
         PublicKey = {public}\n\
         Endpoint = {endpoint}:{port}\n\
         AllowedIPs = {allowed}\n\
         PersistentKeepalive = {keepalive}",
        private = params.private_key,
        address = params.address,
        dns = params.dns_servers,
        public = params.server_public_key,
        endpoint = params.endpoint,
        port = params.port,
        allowed = params.allowed_ips,
        keepalive = PERSISTENT_KEEPALIVE,
    ))
}
