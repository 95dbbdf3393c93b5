//! Configuration for artisan-auth
//!
//! CLI arguments and environment variable handling using clap. `Args` is the
//! raw surface; `AuthConfig` is the validated, immutable form built once at
//! startup and handed to every component constructor.

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::crypto::FieldKey;
use crate::types::{AuthError, Result};

/// artisan-auth - identity, authorization and field protection for the marketplace
#[derive(Parser, Debug, Clone)]
#[command(name = "artisan-auth")]
#[command(about = "Operator tooling for marketplace authentication and sensitive-field encryption")]
pub struct Args {
    /// Secret used to sign tokens (at least 32 characters)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime, e.g. "900", "15m", "1h"
    #[arg(long, env = "JWT_ACCESS_TOKEN_EXPIRATION")]
    pub access_token_ttl: Option<String>,

    /// Refresh token lifetime, e.g. "7d"
    #[arg(long, env = "JWT_REFRESH_TOKEN_EXPIRATION")]
    pub refresh_token_ttl: Option<String>,

    /// Clock skew tolerated when checking token timestamps
    #[arg(long, env = "TOKEN_LEEWAY_SECONDS", default_value = "30")]
    pub token_leeway_seconds: u64,

    /// 256-bit field encryption key as 64 hex characters
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Argon2id iteration count for password hashing
    #[arg(long, env = "PASSWORD_HASH_TIME_COST", default_value = "2")]
    pub hash_time_cost: u32,

    /// Argon2id memory cost in KiB
    #[arg(long, env = "PASSWORD_HASH_MEMORY_KIB", default_value = "19456")]
    pub hash_memory_kib: u32,

    /// Argon2id lanes
    #[arg(long, env = "PASSWORD_HASH_PARALLELISM", default_value = "1")]
    pub hash_parallelism: u32,

    /// Upper bound on the account status lookup done per request
    #[arg(long, env = "ACCOUNT_LOOKUP_TIMEOUT_MS", default_value = "5000")]
    pub account_lookup_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Append security audit events (JSONL) to this file
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate configuration and print a summary without secrets
    Check,
    /// Read a password from stdin and print its digest
    HashPassword,
    /// Issue an access + refresh token pair
    IssueTokens {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        account_type: String,
        /// Roles assigned in the store (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Verify a token and print its claims
    VerifyToken { token: String },
    /// Encrypt a sensitive value for storage
    EncryptField { value: String },
    /// Decrypt a stored field and print only its masked view
    MaskField { stored: String },
}

/// Token signing settings
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub leeway_secs: u64,
}

impl TokenConfig {
    pub fn new(
        secret: impl Into<String>,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
        leeway_secs: u64,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
            leeway_secs,
        }
    }
}

/// Longest accepted access token lifetime (1 day)
pub const MAX_ACCESS_TTL_SECS: u64 = 86_400;
/// Longest accepted refresh token lifetime (365 days)
pub const MAX_REFRESH_TTL_SECS: u64 = 365 * 86_400;
/// Largest accepted clock-skew allowance
pub const MAX_LEEWAY_SECS: u64 = 300;

impl TokenConfig {
    /// Check secret length, lifetimes and leeway against their bounds
    pub fn validate(&self) -> Result<()> {
        let min_secret = crate::auth::jwt::MIN_SECRET_LEN;
        if self.secret.len() < min_secret {
            return Err(AuthError::Config(format!(
                "JWT_SECRET must be at least {min_secret} characters"
            )));
        }
        if self.access_ttl_secs == 0 || self.access_ttl_secs > MAX_ACCESS_TTL_SECS {
            return Err(AuthError::Config(format!(
                "JWT_ACCESS_TOKEN_EXPIRATION must be between 1s and {MAX_ACCESS_TTL_SECS}s"
            )));
        }
        if self.refresh_ttl_secs > MAX_REFRESH_TTL_SECS {
            return Err(AuthError::Config(format!(
                "JWT_REFRESH_TOKEN_EXPIRATION must be at most {MAX_REFRESH_TTL_SECS}s"
            )));
        }
        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(AuthError::Config(
                "JWT_REFRESH_TOKEN_EXPIRATION must be longer than JWT_ACCESS_TOKEN_EXPIRATION"
                    .into(),
            ));
        }
        if self.leeway_secs > MAX_LEEWAY_SECS || self.leeway_secs >= self.access_ttl_secs {
            return Err(AuthError::Config(format!(
                "TOKEN_LEEWAY_SECONDS must be at most {MAX_LEEWAY_SECS} and shorter than the access token lifetime"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            time_cost: 2,
            memory_kib: 19456,
            parallelism: 1,
        }
    }
}

/// Validated configuration, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub tokens: TokenConfig,
    pub field_key: FieldKey,
    pub hashing: HashingConfig,
    pub account_lookup_timeout_ms: u64,
    pub audit_log_path: Option<PathBuf>,
}

impl AuthConfig {
    /// Validate every setting at once. Any failure is a `Config` error.
    pub fn from_args(args: &Args) -> Result<Self> {
        let secret = required(&args.jwt_secret, "JWT_SECRET")?;

        let access_ttl_secs = parse_ttl(
            required(&args.access_token_ttl, "JWT_ACCESS_TOKEN_EXPIRATION")?,
            "JWT_ACCESS_TOKEN_EXPIRATION",
        )?;
        let refresh_ttl_secs = parse_ttl(
            required(&args.refresh_token_ttl, "JWT_REFRESH_TOKEN_EXPIRATION")?,
            "JWT_REFRESH_TOKEN_EXPIRATION",
        )?;
        let tokens = TokenConfig::new(
            secret,
            access_ttl_secs,
            refresh_ttl_secs,
            args.token_leeway_seconds,
        );
        tokens.validate()?;

        let field_key = FieldKey::from_hex(required(&args.encryption_key, "ENCRYPTION_KEY")?)?;

        let hashing = HashingConfig {
            time_cost: args.hash_time_cost,
            memory_kib: args.hash_memory_kib,
            parallelism: args.hash_parallelism,
        };
        // Reject bad Argon2 parameters now rather than on the first login
        crate::auth::password::argon2_params(&hashing)?;

        if args.account_lookup_timeout_ms == 0 {
            return Err(AuthError::Config(
                "ACCOUNT_LOOKUP_TIMEOUT_MS must be positive".into(),
            ));
        }

        Ok(Self {
            tokens,
            field_key,
            hashing,
            account_lookup_timeout_ms: args.account_lookup_timeout_ms,
            audit_log_path: args.audit_log_path.clone(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::Config(format!("{name} is required"))),
    }
}

/// Parse a lifetime such as "900", "45s", "15m", "12h" or "7d" into seconds
pub fn parse_ttl(value: &str, name: &str) -> Result<u64> {
    let value = value.trim();
    let invalid = || AuthError::Config(format!("{name} has invalid duration '{value}'"));

    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 's')) => (&value[..idx], 1),
        Some((idx, 'm')) => (&value[..idx], 60),
        Some((idx, 'h')) => (&value[..idx], 3600),
        Some((idx, 'd')) => (&value[..idx], 86_400),
        Some((_, c)) if c.is_ascii_digit() => (value, 1),
        _ => return Err(invalid()),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if seconds == 0 {
        return Err(invalid());
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("900", "T").unwrap(), 900);
        assert_eq!(parse_ttl("45s", "T").unwrap(), 45);
        assert_eq!(parse_ttl("15m", "T").unwrap(), 900);
        assert_eq!(parse_ttl("1h", "T").unwrap(), 3600);
        assert_eq!(parse_ttl("7d", "T").unwrap(), 604_800);
    }

    #[test]
    fn test_parse_ttl_rejects_garbage() {
        for bad in ["", "0", "0m", "m", "-5m", "15 m", "1w", "abc", "1.5h"] {
            assert!(parse_ttl(bad, "T").is_err(), "accepted {bad:?}");
        }
    }

    const SECRET: &str = "bounds-test-signing-secret-0123456789";

    #[test]
    fn test_token_config_bounds() {
        assert!(TokenConfig::new(SECRET, 900, 604_800, 30).validate().is_ok());
        assert!(TokenConfig::new(SECRET, MAX_ACCESS_TTL_SECS, MAX_REFRESH_TTL_SECS, MAX_LEEWAY_SECS)
            .validate()
            .is_ok());

        assert!(TokenConfig::new(SECRET, MAX_ACCESS_TTL_SECS + 1, MAX_REFRESH_TTL_SECS, 0)
            .validate()
            .is_err());
        assert!(TokenConfig::new(SECRET, 900, MAX_REFRESH_TTL_SECS + 1, 0)
            .validate()
            .is_err());
        assert!(TokenConfig::new(SECRET, u64::MAX - 1, u64::MAX, 0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_leeway_bounds() {
        assert!(TokenConfig::new(SECRET, 900, 3600, MAX_LEEWAY_SECS + 1)
            .validate()
            .is_err());
        assert!(TokenConfig::new(SECRET, 900, 3600, u64::MAX).validate().is_err());
        // Leeway must not outlast the access token itself
        assert!(TokenConfig::new(SECRET, 60, 3600, 60).validate().is_err());
        assert!(TokenConfig::new(SECRET, 60, 3600, 59).validate().is_ok());
    }

    #[test]
    fn test_token_config_debug_redacts_secret() {
        let config = TokenConfig::new("super-secret-signing-key-0123456789", 60, 120, 0);
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
