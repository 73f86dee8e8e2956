//! Local authentication for the operator console.
//!
//! Credential checks run against a pluggable store; the default in-memory
//! store carries the two built-in accounts used by local deployments.
//! Failures are deliberately specific (unknown user vs. wrong password vs.
//! role mismatch) because this is an internal tool, not a public login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, Result};

/// Operator role. Controls which console sections are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A login attempt: username, password, and the role tab the user picked.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
}

/// Source of account records.
pub trait CredentialStore {
    /// Look up an account by username.
    fn lookup(&self, username: &str) -> Option<Account>;
}

/// A stored account.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// In-memory store preloaded with the built-in local accounts.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    accounts: Vec<Account>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            accounts: vec![
                Account {
                    username: "admin".to_string(),
                    password: "admin123".to_string(),
                    role: Role::Admin,
                },
                Account {
                    username: "developer".to_string(),
                    password: "dev123".to_string(),
                    role: Role::Developer,
                },
            ],
        }
    }
}

impl MemoryStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }
}

impl CredentialStore for MemoryStore {
    fn lookup(&self, username: &str) -> Option<Account> {
        self.accounts.iter().find(|a| a.username == username).cloned()
    }
}

/// Validate credentials against a store and open a session.
///
/// The selected role must match the account's role; logging into the wrong
/// tab fails even with the right password.
pub fn login(store: &impl CredentialStore, creds: &Credentials) -> Result<Session> {
    let account = store
        .lookup(&creds.username)
        .ok_or_else(|| ClientError::Auth("user not found".to_string()))?;

    if account.password != creds.password {
        return Err(ClientError::Auth("invalid password".to_string()));
    }
    if account.role != creds.role {
        return Err(ClientError::Auth("role mismatch".to_string()));
    }

    Ok(Session {
        username: account.username,
        role: account.role,
        login_time: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str, role: Role) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
            role,
        }
    }

    #[test]
    fn test_login_success() {
        let store = MemoryStore::default();
        let session = login(&store, &creds("admin", "admin123", Role::Admin)).unwrap();
        assert_eq!(session.username, "admin");
        assert_eq!(session.role, Role::Admin);
    }

    #[test]
    fn test_login_unknown_user() {
        let store = MemoryStore::default();
        let err = login(&store, &creds("ghost", "x", Role::Admin)).unwrap_err();
        assert!(matches!(err, ClientError::Auth(ref m) if m == "user not found"));
    }

    #[test]
    fn test_login_wrong_password() {
        let store = MemoryStore::default();
        let err = login(&store, &creds("admin", "wrong", Role::Admin)).unwrap_err();
        assert!(matches!(err, ClientError::Auth(ref m) if m == "invalid password"));
    }

    #[test]
    fn test_login_role_mismatch() {
        let store = MemoryStore::default();
        let err = login(&store, &creds("developer", "dev123", Role::Admin)).unwrap_err();
        assert!(matches!(err, ClientError::Auth(ref m) if m == "role mismatch"));
    }
}
