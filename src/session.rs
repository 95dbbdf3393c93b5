//! Login, registration and token refresh
//!
//! - login: identifier + password → access/refresh pair
//! - registration: validate and hash, leaving persistence to the store
//! - refresh: refresh token → new access token built from the live account

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::gate::DEFAULT_LOOKUP_TIMEOUT;
use crate::auth::jwt::{TokenKind, TokenService};
use crate::auth::password::CredentialStore;
use crate::auth::roles::{derive_effective_roles, AccountType, RoleSet};
use crate::logging::AuditLogger;
use crate::store::{AccountRecord, AccountStatus, UserStore};
use crate::types::{AuthError, ForbiddenReason, Result};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Tokens and account summary returned on login or registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub user_id: String,
    pub user_type: AccountType,
    pub roles: RoleSet,
    pub status: AccountStatus,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedAccess {
    pub access_token: String,
    pub access_expires_at: u64,
}

#[derive(Clone, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub password: String,
    pub user_type: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Role ids to assign (admin staff only)
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password", &"<redacted>")
            .field("user_type", &self.user_type)
            .field("username", &self.username)
            .field("role_ids", &self.role_ids)
            .finish()
    }
}

/// Validated registration ready to be inserted by the store
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub account_type: AccountType,
    pub username: Option<String>,
    pub status: AccountStatus,
    pub role_ids: Vec<i64>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password_hash", &"<redacted>")
            .field("account_type", &self.account_type)
            .field("username", &self.username)
            .field("status", &self.status)
            .field("role_ids", &self.role_ids)
            .finish()
    }
}

// =============================================================================
// Session Service
// =============================================================================

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn UserStore>,
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
    lookup_timeout: Duration,
    audit: AuditLogger,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn UserStore>,
        credentials: Arc<CredentialStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            audit: AuditLogger::new(),
        }
    }

    /// Bound every account lookup; a timeout is a `Store` error
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Authenticate with email or phone number and password.
    ///
    /// Unknown identifiers and wrong passwords get the same error and cost
    /// the same hashing work.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<SessionTokens> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::BadRequest(
                "Identifier (email/phone) and password are required.".into(),
            ));
        }

        let record = tokio::time::timeout(
            self.lookup_timeout,
            self.store.find_by_identifier(identifier),
        )
        .await??;
        let Some(record) = record else {
            self.credentials.burn(password);
            warn!("Login failed - unknown identifier");
            self.audit
                .log_login(false, None, "unknown_identifier")
                .await;
            return Err(AuthError::InvalidCredentials);
        };
        let account = record.account;

        if !self.credentials.verify(password, &record.password_hash) {
            warn!(sub = %account.id, "Login failed - invalid password");
            self.audit
                .log_login(false, Some(account.id.as_str()), "invalid_password")
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        if !account.status.is_active() {
            warn!(sub = %account.id, status = %account.status, "Login refused - account not active");
            self.audit
                .log_login(false, Some(account.id.as_str()), &format!("account_{}", account.status))
                .await;
            return Err(AuthError::Forbidden(ForbiddenReason::AccountUnavailable));
        }

        self.store.record_login(&account.id).await?;
        let session = self.issue_session(&account)?;

        info!(sub = %account.id, "Login successful");
        self.audit
            .log_login(true, Some(account.id.as_str()), "password")
            .await;
        Ok(session)
    }

    /// Issue an access + refresh pair for an account as it stands now
    pub fn issue_session(&self, account: &AccountRecord) -> Result<SessionTokens> {
        let roles = derive_effective_roles(account.account_type, &account.roles);
        let access = self
            .tokens
            .issue_access(&account.id, account.account_type, &roles)?;
        let refresh = self.tokens.issue_refresh(&account.id)?;

        Ok(SessionTokens {
            user_id: account.id.clone(),
            user_type: account.account_type,
            roles,
            status: account.status,
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
        })
    }

    /// Validate a registration and hash its password
    pub async fn prepare_registration(&self, request: &RegistrationRequest) -> Result<NewAccount> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() || request.user_type.trim().is_empty() {
            return Err(AuthError::BadRequest(
                "Email, password, and user type are required.".into(),
            ));
        }

        let account_type = match request.user_type.trim().parse::<AccountType>() {
            Ok(t @ (AccountType::Customer | AccountType::Artisan | AccountType::AdminStaff)) => t,
            _ => return Err(AuthError::BadRequest("Invalid user type.".into())),
        };

        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        if account_type == AccountType::AdminStaff
            && (username.is_none() || request.role_ids.is_empty())
        {
            return Err(AuthError::BadRequest(
                "For admin_staff, username and at least one role_id are required.".into(),
            ));
        }

        let phone_number = request
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let mut identifiers = vec![email];
        identifiers.extend(phone_number.as_deref());
        for identifier in identifiers {
            if self.store.find_by_identifier(identifier).await?.is_some() {
                return Err(AuthError::Conflict("identifier already registered".into()));
            }
        }

        Ok(NewAccount {
            email: email.to_string(),
            phone_number,
            password_hash: self.credentials.hash(&request.password)?,
            account_type,
            username,
            status: account_type.initial_status(),
            role_ids: if account_type == AccountType::AdminStaff {
                request.role_ids.clone()
            } else {
                Vec::new()
            },
        })
    }

    /// Mint a new access token from a refresh token.
    ///
    /// Status and roles come from the live account record, so a suspension
    /// or role change takes effect at the next refresh.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess> {
        let claims = match self.tokens.verify_kind(refresh_token, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(rejection) => {
                self.audit.log_token_rejected(rejection.code()).await;
                return Err(rejection.into());
            }
        };

        let account =
            tokio::time::timeout(self.lookup_timeout, self.store.find_by_id(&claims.sub)).await??;
        let account = match account {
            Some(account) if account.status.is_active() => account,
            _ => {
                warn!(sub = %claims.sub, "Refresh refused - account missing or not active");
                self.audit
                    .log_access_denied(&claims.sub, ForbiddenReason::AccountUnavailable.code(), None)
                    .await;
                return Err(AuthError::Forbidden(ForbiddenReason::AccountUnavailable));
            }
        };

        let roles = derive_effective_roles(account.account_type, &account.roles);
        let access = self
            .tokens
            .issue_access(&account.id, account.account_type, &roles)?;

        self.audit.log_refresh(&account.id).await;
        Ok(RefreshedAccess {
            access_token: access.token,
            access_expires_at: access.expires_at,
        })
    }
}
