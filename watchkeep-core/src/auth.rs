//! Credential records and the read-only authorization gate.

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

/// One configured HTTP user. `password` is plain text or a bcrypt hash (`$2...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub read_only: bool,
}

impl Credential {
    fn verify(&self, password: &str) -> bool {
        if self.password.starts_with("$2") {
            return bcrypt::verify(password, &self.password).unwrap_or_else(|e| {
                warn!(username = %self.username, error = %e, "unusable bcrypt hash");
                false
            });
        }
        self.password.as_bytes().ct_eq(password.as_bytes()).into()
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(String),
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::User(name) => Some(name),
        }
    }
}

/// Credentials plus the host allow list.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    credentials: Vec<Credential>,
    allow: Vec<String>,
}

impl AccessPolicy {
    pub fn new(credentials: Vec<Credential>, allow: Vec<String>) -> Self {
        Self { credentials, allow }
    }

    pub fn credential(&self, username: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.username == username)
    }

    /// Checks a username/password pair.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity> {
        match self.credential(username) {
            Some(cred) if cred.verify(password) => Ok(Identity::User(username.to_string())),
            _ => Err(ControlError::Forbidden(format!(
                "invalid credentials for {username}"
            ))),
        }
    }

    /// Anonymous requests are never read-only; a user without a credential
    /// record always is.
    pub fn is_read_only(&self, identity: &Identity) -> bool {
        match identity {
            Identity::Anonymous => false,
            Identity::User(name) => self.credential(name).map_or(true, |c| c.read_only),
        }
    }

    /// Fails with `Forbidden` for read-only identities.
    pub fn require_write(&self, identity: &Identity) -> Result<()> {
        if self.is_read_only(identity) {
            return Err(ControlError::Forbidden(
                "You do not have sufficient privileges to access this page".into(),
            ));
        }
        Ok(())
    }

    /// An empty allow list admits every client.
    pub fn host_allowed(&self, client: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|a| a == client)
    }

    pub fn auth_style(&self) -> &'static str {
        match (!self.credentials.is_empty(), !self.allow.is_empty()) {
            (true, true) => "Basic Authentication and Host/Net allow list",
            (true, false) => "Basic Authentication",
            (false, true) => "Host/Net allow list",
            (false, false) => "No authentication",
        }
    }
}
