//! Identity assertion tokens
//!
//! Access tokens are short-lived and carry the subject's account type and
//! roles as of issuance. Refresh tokens are long-lived, carry only the
//! subject, and are accepted solely for minting new access tokens.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256); any other `alg` is rejected
//! - Expiry is checked against an injectable `Clock` with a configured leeway
//! - Verification never fails loudly: it returns a `TokenRejection` whose
//!   cause is logged here and collapsed to `Unauthenticated` for callers

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::roles::{AccountType, RoleSet};
use crate::config::TokenConfig;
use crate::types::{AuthError, Result};

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Which flow a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Payload stored in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id of the subject
    pub sub: String,
    /// Account type at issuance (access tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    /// Roles at issuance (access tokens only)
    #[serde(default, skip_serializing_if = "RoleSet::is_empty")]
    pub roles: RoleSet,
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed token and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Why a token was not accepted. Logged, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token issued in the future")]
    IssuedInFuture,
    #[error("wrong token kind")]
    WrongKind,
}

impl TokenRejection {
    pub fn code(&self) -> &'static str {
        match self {
            TokenRejection::Malformed => "malformed",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::Expired => "expired",
            TokenRejection::IssuedInFuture => "issued_in_future",
            TokenRejection::WrongKind => "wrong_kind",
        }
    }
}

impl From<TokenRejection> for AuthError {
    fn from(_: TokenRejection) -> Self {
        AuthError::Unauthenticated
    }
}

/// Issues and verifies signed tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: u64,
    refresh_ttl: u64,
    leeway: u64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a token service from validated configuration
    ///
    /// Returns a configuration error if the secret is too short, or a lifetime
    /// or the leeway is out of bounds.
    pub fn new(config: &TokenConfig) -> Result<Self> {
        config.validate()?;

        // Expiry is checked against our own clock after the signature passes
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: config.access_ttl_secs,
            refresh_ttl: config.refresh_ttl_secs,
            leeway: config.leeway_secs,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    /// Sign an access token carrying the roles held right now
    pub fn issue_access(
        &self,
        subject_id: &str,
        account_type: AccountType,
        roles: &RoleSet,
    ) -> Result<IssuedToken> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject_id.to_string(),
            account_type: Some(account_type),
            roles: roles.clone(),
            kind: TokenKind::Access,
            iat: now,
            exp: expiry(now, self.access_ttl)?,
        };
        self.sign(&claims)
    }

    /// Sign a refresh token. Carries no roles.
    pub fn issue_refresh(&self, subject_id: &str) -> Result<IssuedToken> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject_id.to_string(),
            account_type: None,
            roles: RoleSet::new(),
            kind: TokenKind::Refresh,
            iat: now,
            exp: expiry(now, self.refresh_ttl)?,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<IssuedToken> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign {} token: {e}", claims.kind)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature, structure and time bounds of a token of either kind
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenRejection> {
        let claims = match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                let rejection = classify(&err);
                match rejection {
                    TokenRejection::BadSignature => {
                        warn!(cause = rejection.code(), "Token rejected: {}", err)
                    }
                    _ => debug!(cause = rejection.code(), "Token rejected: {}", err),
                }
                return Err(rejection);
            }
        };

        let now = self.clock.now();
        if now > claims.exp.saturating_add(self.leeway) {
            debug!(sub = %claims.sub, cause = "expired", "Token rejected");
            return Err(TokenRejection::Expired);
        }
        if claims.iat > now.saturating_add(self.leeway) {
            warn!(sub = %claims.sub, cause = "issued_in_future", "Token rejected");
            return Err(TokenRejection::IssuedInFuture);
        }

        Ok(claims)
    }

    /// Verify a token and require it to be of the given kind
    pub fn verify_kind(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> std::result::Result<Claims, TokenRejection> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            warn!(
                sub = %claims.sub,
                expected = %kind,
                actual = %claims.kind,
                "Token rejected: wrong kind"
            );
            return Err(TokenRejection::WrongKind);
        }
        Ok(claims)
    }

    /// Seconds until the token expires (negative once expired)
    pub fn seconds_remaining(&self, claims: &Claims) -> i64 {
        let exp = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let now = i64::try_from(self.clock.now()).unwrap_or(i64::MAX);
        exp.saturating_sub(now)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

fn expiry(now: u64, ttl: u64) -> Result<u64> {
    now.checked_add(ttl)
        .ok_or_else(|| AuthError::Internal("token expiry overflows the clock".into()))
}

fn classify(err: &jsonwebtoken::errors::Error) -> TokenRejection {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenRejection::BadSignature,
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        _ => TokenRejection::Malformed,
    }
}

/// Extract the token from an Authorization header.
///
/// Only the `Bearer <token>` form is accepted (scheme is case-insensitive).
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
