//! Anonymous device fingerprinting.
//!
//! A fingerprint is either a durable token the client already carries (the
//! `hf_fp` cookie) or, failing that, a value derived from the user agent and
//! client IP. The raw value is never stored; callers key everything on the
//! SHA-256 hex digest.

use firewatch_schema::DeviceHash;
use sha2::{Digest, Sha256};

/// Name of the cookie carrying the durable client token.
pub const CLIENT_TOKEN_COOKIE: &str = "hf_fp";

/// Placeholder for a missing user agent or client IP.
pub const UNKNOWN: &str = "unknown";

/// Separator between user agent and IP in a derived fingerprint.
pub const DERIVED_SEPARATOR: char = '|';

/// Request-level signals used for admission control and fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub client_token: Option<String>,
}

impl RequestOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set client IP.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Builder: set user agent.
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builder: set durable client token.
    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        self.client_token = Some(token.into());
        self
    }

    /// Client IP, or `"unknown"` when the transport did not expose one.
    pub fn ip(&self) -> &str {
        non_empty(self.client_ip.as_deref()).unwrap_or(UNKNOWN)
    }
}

/// Raw device fingerprint, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Durable token supplied by the client, used verbatim.
    ClientToken(String),
    /// Synthesised from request headers.
    Derived { user_agent: String, client_ip: String },
}

impl Fingerprint {
    /// Pick the client token when present and non-empty, else derive one.
    pub fn resolve(origin: &RequestOrigin) -> Self {
        match non_empty(origin.client_token.as_deref()) {
            Some(token) => Fingerprint::ClientToken(token.to_string()),
            None => Fingerprint::Derived {
                user_agent: non_empty(origin.user_agent.as_deref())
                    .unwrap_or(UNKNOWN)
                    .to_string(),
                client_ip: origin.ip().to_string(),
            },
        }
    }

    /// The raw fingerprint string. Must not be persisted.
    pub fn raw(&self) -> String {
        match self {
            Fingerprint::ClientToken(token) => token.clone(),
            Fingerprint::Derived {
                user_agent,
                client_ip,
            } => format!("{}{}{}", user_agent, DERIVED_SEPARATOR, client_ip),
        }
    }

    /// Hashed identifier safe to store and use as a lookup key.
    pub fn device_hash(&self) -> DeviceHash {
        DeviceHash::from_hex(sha256_hex(&self.raw()))
    }

    pub fn is_client_token(&self) -> bool {
        matches!(self, Fingerprint::ClientToken(_))
    }
}

/// Hash a client IP for storage alongside a verdict.
pub fn hash_ip(ip: &str) -> String {
    sha256_hex(ip)
}

/// Compute SHA256 of a UTF-8 string, returning lowercase hex.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
