//! Protocol version management.

/// Current protocol version, advertised in every `Status` reply.
pub const PROTOCOL_VERSION: u32 = 1;

/// Minimum supported protocol version.
pub const MIN_PROTOCOL_VERSION: u32 = 1;

/// Check if a peer's protocol version is compatible.
pub fn is_compatible(peer_version: u32) -> bool {
    (MIN_PROTOCOL_VERSION..=PROTOCOL_VERSION).contains(&peer_version)
}
