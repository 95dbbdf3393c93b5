//! Shared service state
//!
//! Built once at startup from a validated `AuthConfig` and an external user
//! store. Cloning is cheap; every component is behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::gate::{AuthorizationGate, Identity};
use crate::auth::jwt::TokenService;
use crate::auth::password::CredentialStore;
use crate::config::AuthConfig;
use crate::crypto::{BankDetailsInput, FieldCipher, SealedBankDetails};
use crate::logging::AuditLogger;
use crate::session::SessionService;
use crate::store::UserStore;
use crate::types::{AuthError, Result};

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<CredentialStore>,
    pub cipher: Arc<FieldCipher>,
    pub gate: AuthorizationGate,
    pub sessions: SessionService,
    pub audit: AuditLogger,
}

impl AuthState {
    pub async fn new(config: AuthConfig, store: Arc<dyn UserStore>) -> Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock)).await
    }

    /// Build with an explicit clock for token timestamps
    pub async fn with_clock(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let audit = AuditLogger::new();
        if let Some(path) = &config.audit_log_path {
            audit.init_file(path.clone()).await.map_err(|e| {
                AuthError::Config(format!(
                    "cannot open audit log {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        let tokens = Arc::new(TokenService::new(&config.tokens)?.with_clock(clock));
        let credentials = Arc::new(CredentialStore::new(&config.hashing)?);
        let cipher = Arc::new(FieldCipher::new(&config.field_key)?);

        let lookup_timeout = Duration::from_millis(config.account_lookup_timeout_ms);
        let gate = AuthorizationGate::new(tokens.clone(), store.clone())
            .with_lookup_timeout(lookup_timeout)
            .with_audit(audit.clone());
        let sessions = SessionService::new(store, credentials.clone(), tokens.clone())
            .with_lookup_timeout(lookup_timeout)
            .with_audit(audit.clone());

        info!(
            access_ttl = tokens.access_ttl(),
            refresh_ttl = tokens.refresh_ttl(),
            "Auth state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            tokens,
            credentials,
            cipher,
            gate,
            sessions,
            audit,
        })
    }

    /// Encrypt an artisan's bank details for storage and record the write
    pub async fn seal_bank_details(
        &self,
        identity: &Identity,
        input: &BankDetailsInput,
    ) -> Result<SealedBankDetails> {
        let sealed = self.cipher.seal_bank_details(input)?;
        self.audit
            .log_field_written(identity.subject_id(), "bank_account_number")
            .await;
        Ok(sealed)
    }
}
