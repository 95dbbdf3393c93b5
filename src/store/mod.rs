//! User store interface
//!
//! The account table lives outside this crate. The gate and the session
//! service only read through `UserStore`; `InMemoryUserStore` backs tests
//! and local tooling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

use crate::auth::roles::{AccountType, RoleSet};
use crate::types::Result;

/// Account lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    #[serde(alias = "pending_kyc")]
    PendingVerification,
    Suspended,
}

impl AccountStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::PendingVerification => write!(f, "pending_verification"),
            AccountStatus::Suspended => write!(f, "suspended"),
        }
    }
}

/// Live record of an account's status and privileges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub status: AccountStatus,
    pub account_type: AccountType,
    /// Roles assigned in the store (not including the type's implied role)
    #[serde(default)]
    pub roles: RoleSet,
}

/// Account record joined with its login identifiers and password digest
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub account: AccountRecord,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub password_hash: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("account", &self.account)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Read access to accounts (allows mocking in tests)
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load an account by id
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>>;

    /// Load an account and its digest by email or phone number
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<CredentialRecord>>;

    /// Note a successful login
    async fn record_login(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserStore {
    accounts: RwLock<HashMap<String, CredentialRecord>>,
    logins: RwLock<HashMap<String, u32>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: CredentialRecord) {
        self.accounts
            .write()
            .await
            .insert(record.account.id.clone(), record);
    }

    /// Change an account's status. Returns false if the account is unknown.
    pub async fn set_status(&self, id: &str, status: AccountStatus) -> bool {
        match self.accounts.write().await.get_mut(id) {
            Some(record) => {
                record.account.status = status;
                true
            }
            None => false,
        }
    }

    /// Replace an account's assigned roles. Returns false if the account is unknown.
    pub async fn set_roles(&self, id: &str, roles: RoleSet) -> bool {
        match self.accounts.write().await.get_mut(id) {
            Some(record) => {
                record.account.roles = roles;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.accounts.write().await.remove(id).is_some()
    }

    /// Number of recorded logins for an account
    pub async fn login_count(&self, id: &str) -> u32 {
        self.logins.read().await.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>> {
        Ok(self
            .accounts
            .read()
            .await
            .get(id)
            .map(|record| record.account.clone()))
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<CredentialRecord>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|record| {
                record.email == identifier || record.phone_number.as_deref() == Some(identifier)
            })
            .cloned())
    }

    async fn record_login(&self, id: &str) -> Result<()> {
        *self.logins.write().await.entry(id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
