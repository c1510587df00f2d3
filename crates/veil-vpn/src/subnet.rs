//! Client Address Allocation
//!
//! Every server owns the `10.{server_id}.0.0/16` subnet. A client's
//! address is a pure function of how many configs the server has ever
//! seen: the Nth config gets host offset `N + 2`, skipping the network
//! address (`.0.0`) and the server's own gateway address (`.0.1`).
//!
//! Deleted configs do not return their address to the pool. This trades
//! subnet capacity for O(1) allocation with no free-list to maintain:
//! as long as configs are append-only per server, addresses are
//! monotonically increasing and never reused.

use std::net::Ipv4Addr;

/// Host offset of the first client address within a server subnet
/// (0 = network, 1 = gateway).
const FIRST_CLIENT_OFFSET: u32 = 2;

/// Last usable host offset in a /16 (`.255.254`; `.255.255` is broadcast).
const LAST_HOST_OFFSET: u32 = 0xFFFF - 1;

/// Allocation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("Server {0} has no derivable subnet (id must fit one octet)")]
    SubnetUnavailable(u32),

    #[error("Subnet 10.{server_id}.0.0/16 exhausted at index {index}")]
    CapacityExceeded { server_id: u32, index: u32 },
}

/// Subnet a server hands addresses out of
pub fn server_subnet(server_id: u32) -> Result<Ipv4Addr, AllocError> {
    let octet = u8::try_from(server_id).map_err(|_| AllocError::SubnetUnavailable(server_id))?;
    Ok(Ipv4Addr::new(10, octet, 0, 0))
}

/// Allocate the client address for the given allocation index.
///
/// `index` is the count of configs already provisioned for this server
/// before the call, so the first client on server 7 gets `10.7.0.2`.
pub fn allocate(server_id: u32, index: u32) -> Result<Ipv4Addr, AllocError> {
    let base = server_subnet(server_id)?;

    let offset = index
        .checked_add(FIRST_CLIENT_OFFSET)
        .filter(|o| *o <= LAST_HOST_OFFSET)
        .ok_or(AllocError::CapacityExceeded { server_id, index })?;

    Ok(Ipv4Addr::from(u32::from(base) + offset))
}

/// Number of client addresses a server subnet can ever hand out
pub fn capacity() -> u32 {
    LAST_HOST_OFFSET - FIRST_CLIENT_OFFSET + 1
}
