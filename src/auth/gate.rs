//! Authorization gate for protected operations
//!
//! Two strictly ordered phases:
//!
//! 1. `authenticate` turns an Authorization header into an `Identity`:
//!    bearer token → signature/expiry check → live account lookup. The
//!    account must exist and be active; its current roles, not the ones
//!    frozen into the token, become the identity's roles.
//! 2. `authorize` checks an `Identity` against the roles an operation needs.
//!
//! `Identity` can only be built by phase 1, so phase 2 cannot run on an
//! unauthenticated caller. The gate performs no writes.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::jwt::{extract_token_from_header, TokenKind, TokenService};
use crate::auth::roles::{derive_effective_roles, has_any_role, AccountType, RoleSet};
use crate::logging::AuditLogger;
use crate::store::UserStore;
use crate::types::{AuthError, ForbiddenReason, Result};

/// Default bound on the per-request account lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    subject_id: String,
    account_type: AccountType,
    roles: RoleSet,
    token_expires_at: u64,
}

impl Identity {
    pub(crate) fn new(
        subject_id: String,
        account_type: AccountType,
        roles: RoleSet,
        token_expires_at: u64,
    ) -> Self {
        Self {
            subject_id,
            account_type,
            roles,
            token_expires_at,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn token_expires_at(&self) -> u64 {
        self.token_expires_at
    }
}

/// Outcome of a role check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Allow iff the identity holds at least one of the required roles.
/// An identity without roles, or an empty requirement, is denied.
pub fn authorize(identity: &Identity, required_roles: &RoleSet) -> Decision {
    if has_any_role(&identity.roles, required_roles) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Authenticates requests and enforces role membership
#[derive(Clone)]
pub struct AuthorizationGate {
    tokens: Arc<TokenService>,
    store: Arc<dyn UserStore>,
    lookup_timeout: Duration,
    audit: AuditLogger,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn UserStore>) -> Self {
        Self {
            tokens,
            store,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            audit: AuditLogger::new(),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub(crate) fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Phase 1: establish who is calling from the raw Authorization header.
    ///
    /// - no or malformed header, invalid or expired token → `Unauthenticated`
    /// - account missing or not active → `Forbidden(AccountUnavailable)`
    pub async fn authenticate(&self, raw_header: Option<&str>) -> Result<Identity> {
        let Some(token) = extract_token_from_header(raw_header) else {
            debug!("Authentication failed: no bearer token");
            self.audit.log_token_rejected("missing_token").await;
            return Err(AuthError::Unauthenticated);
        };

        let claims = match self.tokens.verify_kind(token, TokenKind::Access) {
            Ok(claims) => claims,
            Err(rejection) => {
                self.audit.log_token_rejected(rejection.code()).await;
                return Err(rejection.into());
            }
        };

        let account = tokio::time::timeout(self.lookup_timeout, self.store.find_by_id(&claims.sub))
            .await??;

        let account = match account {
            Some(account) if account.status.is_active() => account,
            Some(account) => {
                warn!(sub = %claims.sub, status = %account.status, "Account not active");
                return Err(self.deny(&claims.sub, ForbiddenReason::AccountUnavailable, None).await);
            }
            None => {
                warn!(sub = %claims.sub, "Token subject has no account");
                return Err(self.deny(&claims.sub, ForbiddenReason::AccountUnavailable, None).await);
            }
        };

        let roles = derive_effective_roles(account.account_type, &account.roles);
        if roles != claims.roles {
            debug!(sub = %claims.sub, "Roles changed since token issuance; using live roles");
        }

        Ok(Identity::new(
            account.id,
            account.account_type,
            roles,
            claims.exp,
        ))
    }

    /// Phase 2: pure role check
    pub fn authorize(&self, identity: &Identity, required_roles: &RoleSet) -> Decision {
        authorize(identity, required_roles)
    }

    /// Phase 2 as a `Result`, recording denials in the audit log
    pub async fn require_roles(&self, identity: &Identity, required_roles: &RoleSet) -> Result<()> {
        match self.authorize(identity, required_roles) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                debug!(
                    sub = identity.subject_id(),
                    held = ?identity.roles(),
                    required = ?required_roles,
                    "Role check failed"
                );
                Err(self
                    .deny(identity.subject_id(), ForbiddenReason::InsufficientRole, None)
                    .await)
            }
        }
    }

    /// Both phases in order
    pub async fn authenticate_request(
        &self,
        raw_header: Option<&str>,
        required_roles: &RoleSet,
    ) -> Result<Identity> {
        let identity = self.authenticate(raw_header).await?;
        self.require_roles(&identity, required_roles).await?;
        Ok(identity)
    }

    pub(crate) async fn deny(
        &self,
        subject_id: &str,
        reason: ForbiddenReason,
        target: Option<&str>,
    ) -> AuthError {
        self.audit
            .log_access_denied(subject_id, reason.code(), target)
            .await;
        AuthError::Forbidden(reason)
    }
}
