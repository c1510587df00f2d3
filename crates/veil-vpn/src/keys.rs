//! Client Identity Keys
//!
//! Generates the X25519 key pair that identifies one client config
//! towards its WireGuard peer. Keys are stored and transported as
//! base64 text; the private key never leaves the owning config.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::rngs::OsRng;
use std::fmt;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

/// Key parsing errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid base64 encoding")]
    InvalidBase64,

    #[error("Invalid key length (expected 32 bytes)")]
    InvalidLength,
}

fn decode32(s: &str) -> Result<[u8; 32], KeyError> {
    let bytes = BASE64.decode(s).map_err(|_| KeyError::InvalidBase64)?;
    let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength)?;
    Ok(arr)
}

/// Client private key (Curve25519)
#[derive(Clone)]
pub struct PrivateKey {
    secret: StaticSecret,
}

impl PrivateKey {
    /// Generate a fresh private key from the OS random source.
    ///
    /// `OsRng` aborts the process if the platform RNG is unavailable;
    /// there is no recoverable failure mode here.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Decode from base64 text
    pub fn from_base64(s: &str) -> Result<Self, KeyError> {
        Ok(Self {
            secret: StaticSecret::from(decode32(s)?),
        })
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: X25519Public::from(&self.secret),
        }
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.secret.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([redacted])")
    }
}

/// Client or server public key (Curve25519)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key: X25519Public,
}

impl PublicKey {
    /// Decode from base64 text
    pub fn from_base64(s: &str) -> Result<Self, KeyError> {
        Ok(Self {
            key: X25519Public::from(decode32(s)?),
        })
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.key.to_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_base64()[..8])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// A freshly generated client identity (private + public key)
#[derive(Clone)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let private = PrivateKey::generate();
        let public = private.public_key();
        Self { private, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish()
    }
}
