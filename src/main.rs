//! artisan-auth operator CLI

use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{error, info};

use artisan_auth::{
    auth::{AccountType, RoleSet},
    config::{Args, AuthConfig, Command},
    crypto::EncryptedField,
    logging::init_tracing,
    store::{AccountRecord, AccountStatus, InMemoryUserStore},
    AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let config = match AuthConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("======================================");
    info!("  artisan-auth");
    info!("======================================");
    info!("Access token TTL: {}s", config.tokens.access_ttl_secs);
    info!("Refresh token TTL: {}s", config.tokens.refresh_ttl_secs);
    info!("Token leeway: {}s", config.tokens.leeway_secs);
    info!(
        "Password hashing: argon2id t={} m={}KiB p={}",
        config.hashing.time_cost, config.hashing.memory_kib, config.hashing.parallelism
    );
    info!("Account lookup timeout: {}ms", config.account_lookup_timeout_ms);
    if let Some(path) = &config.audit_log_path {
        info!("Audit log: {}", path.display());
    }
    info!("======================================");

    // Operator commands have no account table; tokens are minted from CLI input
    let state = AuthState::new(config, Arc::new(InMemoryUserStore::new())).await?;

    match args.command {
        Command::Check => {
            println!("configuration ok");
        }
        Command::HashPassword => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            let password = line.trim_end_matches(['\r', '\n']);
            anyhow::ensure!(!password.is_empty(), "empty password");
            println!("{}", state.credentials.hash(password)?);
        }
        Command::IssueTokens {
            subject,
            account_type,
            roles,
        } => {
            let account_type: AccountType = account_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let account = AccountRecord {
                id: subject,
                status: AccountStatus::Active,
                account_type,
                roles: roles.into_iter().collect::<RoleSet>(),
            };
            let session = state.sessions.issue_session(&account)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::VerifyToken { token } => match state.tokens.verify(&token) {
            Ok(claims) => {
                println!("{}", serde_json::to_string_pretty(&claims)?);
                println!("expires in {}s", state.tokens.seconds_remaining(&claims));
            }
            Err(rejection) => {
                info!(cause = rejection.code(), "Token did not verify");
                println!("invalid");
                std::process::exit(2);
            }
        },
        Command::EncryptField { value } => {
            println!("{}", state.cipher.encrypt(&value)?);
        }
        Command::MaskField { stored } => {
            println!("{}", state.cipher.reveal_masked(&EncryptedField::from(stored))?);
        }
    }

    Ok(())
}
