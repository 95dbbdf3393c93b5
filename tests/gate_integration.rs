//! Authorization gate integration tests
//!
//! Exercise the full path from an Authorization header to a decision using
//! the assembled `AuthState`, an in-memory user store and a manual clock.

use std::sync::Arc;
use std::time::Duration;

use artisan_auth::auth::{role_set, AccountType, ManualClock, RoleSet};
use artisan_auth::config::{AuthConfig, HashingConfig, TokenConfig};
use artisan_auth::crypto::{BankDetailsInput, FieldKey};
use artisan_auth::store::{
    AccountRecord, AccountStatus, CredentialRecord, InMemoryUserStore, UserStore,
};
use artisan_auth::types::{ForbiddenReason, Result};
use artisan_auth::{AuthError, AuthState};
use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};

const START: u64 = 1_700_000_000;

fn config(audit_log_path: Option<std::path::PathBuf>) -> AuthConfig {
    AuthConfig {
        tokens: TokenConfig::new("gate-integration-secret-0123456789abcdef", 900, 86_400, 5),
        field_key: FieldKey::generate(),
        hashing: HashingConfig {
            time_cost: 1,
            memory_kib: 8,
            parallelism: 1,
        },
        account_lookup_timeout_ms: 200,
        audit_log_path,
    }
}

async fn seeded_store() -> Arc<InMemoryUserStore> {
    let store = Arc::new(InMemoryUserStore::new());
    for (id, status, account_type) in [
        ("1", AccountStatus::Active, AccountType::Customer),
        ("2", AccountStatus::Active, AccountType::Artisan),
        ("3", AccountStatus::Suspended, AccountType::Customer),
    ] {
        store
            .insert(CredentialRecord {
                account: AccountRecord {
                    id: id.into(),
                    status,
                    account_type,
                    roles: RoleSet::new(),
                },
                email: format!("user{id}@example.com"),
                phone_number: None,
                password_hash: String::new(),
            })
            .await;
    }
    store
}

async fn setup() -> (AuthState, Arc<InMemoryUserStore>, Arc<ManualClock>) {
    let store = seeded_store().await;
    let clock = Arc::new(ManualClock::new(START));
    let state = assert_ok!(AuthState::with_clock(config(None), store.clone(), clock.clone()).await);
    (state, store, clock)
}

fn bearer(state: &AuthState, id: &str, account_type: AccountType) -> String {
    let roles = role_set(account_type.implied_role());
    let issued = state.tokens.issue_access(id, account_type, &roles).unwrap();
    format!("Bearer {}", issued.token)
}

#[tokio::test]
async fn test_missing_header_is_unauthenticated() {
    let (state, _, _) = setup().await;
    let err = assert_err!(state.gate.authenticate(None).await);
    assert!(matches!(err, AuthError::Unauthenticated));
    assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_headers_are_unauthenticated() {
    let (state, _, _) = setup().await;
    let token = bearer(&state, "1", AccountType::Customer);
    let raw = token.trim_start_matches("Bearer ").to_string();

    for header in [raw.as_str(), "Bearer", "Bearer ", "Basic abc", "Bearer not.a.token"] {
        assert!(
            matches!(
                state.gate.authenticate(Some(header)).await,
                Err(AuthError::Unauthenticated)
            ),
            "accepted {header:?}"
        );
    }
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let (state, _, _) = setup().await;
    let header = bearer(&state, "1", AccountType::Customer).replacen("Bearer", "bearer", 1);
    assert_ok!(state.gate.authenticate(Some(&header)).await);
}

#[tokio::test]
async fn test_active_customer_allowed_on_customer_route() {
    let (state, _, _) = setup().await;
    let header = bearer(&state, "1", AccountType::Customer);

    let identity = assert_ok!(
        state
            .gate
            .authenticate_request(Some(&header), &role_set(["customer"]))
            .await
    );
    assert_eq!(identity.subject_id(), "1");
    assert_eq!(identity.roles(), &role_set(["customer"]));
}

#[tokio::test]
async fn test_customer_forbidden_on_artisan_route() {
    let (state, _, _) = setup().await;
    let header = bearer(&state, "1", AccountType::Customer);

    let err = assert_err!(
        state
            .gate
            .authenticate_request(Some(&header), &role_set(["artisan"]))
            .await
    );
    assert!(matches!(
        err,
        AuthError::Forbidden(ForbiddenReason::InsufficientRole)
    ));
}

#[tokio::test]
async fn test_suspended_account_forbidden_despite_valid_token() {
    let (state, _, _) = setup().await;
    let header = bearer(&state, "3", AccountType::Customer);

    let err = assert_err!(state.gate.authenticate(Some(&header)).await);
    assert!(matches!(
        err,
        AuthError::Forbidden(ForbiddenReason::AccountUnavailable)
    ));
}

#[tokio::test]
async fn test_suspension_applies_to_already_issued_token() {
    let (state, store, _) = setup().await;
    let header = bearer(&state, "2", AccountType::Artisan);
    assert_ok!(state.gate.authenticate(Some(&header)).await);

    store.set_status("2", AccountStatus::Suspended).await;
    assert!(matches!(
        state.gate.authenticate(Some(&header)).await,
        Err(AuthError::Forbidden(ForbiddenReason::AccountUnavailable))
    ));
}

#[tokio::test]
async fn test_deleted_account_matches_inactive() {
    let (state, store, _) = setup().await;
    let header = bearer(&state, "1", AccountType::Customer);
    store.remove("1").await;

    let missing = assert_err!(state.gate.authenticate(Some(&header)).await);
    let suspended = assert_err!(
        state
            .gate
            .authenticate(Some(&bearer(&state, "3", AccountType::Customer)))
            .await
    );
    assert_eq!(missing.public_message(), suspended.public_message());
    assert_eq!(missing.code(), suspended.code());
}

#[tokio::test]
async fn test_expired_token_rejected_with_leeway() {
    let (state, _, clock) = setup().await;
    let header = bearer(&state, "1", AccountType::Customer);

    // Within the 5s leeway
    clock.advance(900 + 5);
    assert_ok!(state.gate.authenticate(Some(&header)).await);

    clock.advance(1);
    assert!(matches!(
        state.gate.authenticate(Some(&header)).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_access() {
    let (state, _, _) = setup().await;
    let refresh = state.tokens.issue_refresh("1").unwrap();
    assert!(matches!(
        state
            .gate
            .authenticate(Some(&format!("Bearer {}", refresh.token)))
            .await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_roles_come_from_live_record() {
    let (state, store, _) = setup().await;
    // Token claims only "customer"
    let header = bearer(&state, "1", AccountType::Customer);
    store.set_roles("1", role_set(["support"])).await;

    let identity = assert_ok!(
        state
            .gate
            .authenticate_request(Some(&header), &role_set(["support"]))
            .await
    );
    assert_eq!(identity.roles(), &role_set(["customer", "support"]));
}

struct StalledStore;

#[async_trait]
impl UserStore for StalledStore {
    async fn find_by_id(&self, _id: &str) -> Result<Option<AccountRecord>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn find_by_identifier(
        &self,
        _identifier: &str,
    ) -> Result<Option<CredentialRecord>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_stalled_store_times_out_as_unavailable() {
    let state = assert_ok!(AuthState::new(config(None), Arc::new(StalledStore)).await);
    let header = bearer(&state, "1", AccountType::Customer);

    let err = assert_err!(state.gate.authenticate(Some(&header)).await);
    assert!(matches!(err, AuthError::Store(_)));
    assert_eq!(err.status_code(), hyper::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stalled_store_bounds_refresh() {
    let state = assert_ok!(AuthState::new(config(None), Arc::new(StalledStore)).await);
    let refresh = state.tokens.issue_refresh("1").unwrap();

    let err = assert_err!(state.sessions.refresh(&refresh.token).await);
    assert!(matches!(err, AuthError::Store(_)));
}

#[tokio::test]
async fn test_denials_and_field_writes_are_audited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let store = seeded_store().await;
    let state = assert_ok!(AuthState::new(config(Some(path.clone())), store).await);

    let _ = state.gate.authenticate(None).await;
    let customer = bearer(&state, "1", AccountType::Customer);
    let _ = state
        .gate
        .authenticate_request(Some(&customer), &role_set(["artisan"]))
        .await;

    let artisan = assert_ok!(
        state
            .gate
            .authenticate_request(
                Some(&bearer(&state, "2", AccountType::Artisan)),
                &role_set(["artisan"])
            )
            .await
    );
    let sealed = assert_ok!(
        state
            .seal_bank_details(
                &artisan,
                &BankDetailsInput {
                    bank_name: "State Bank".into(),
                    account_number: "123456789012".into(),
                    ifsc_code: "SBIN0001234".into(),
                    account_holder_name: "Ravi Kumar".into(),
                    pan_card_number: "ABCDE1234F".into(),
                },
            )
            .await
    );
    let view = assert_ok!(state.cipher.bank_details_view(&sealed));
    assert_eq!(
        view.bank_account_number_masked.as_deref(),
        Some("XXXX-XXXX-XXXX-9012")
    );

    let log = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let types: Vec<&str> = events
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        ["token_rejected", "access_denied", "sensitive_field_written"]
    );
    assert!(!log.contains("123456789012"));
}
