//! artisan-auth - security core of the artisan marketplace backend
//!
//! ## Components
//!
//! - **Tokens**: signed, time-limited access and refresh tokens
//! - **Gate**: authenticate a bearer header against the live account, then
//!   authorize by role or ownership
//! - **Credentials**: Argon2id password hashing and verification
//! - **Field cipher**: authenticated encryption and masking of bank account
//!   numbers at rest
//! - **Sessions**: login, registration and refresh built on the above
//!
//! ## Stored data
//!
//! Password digests are Argon2id and encrypted fields are AES-256-GCM.
//! bcrypt digests and AES-256-CBC fields from an earlier store are not read:
//! bcrypt digests never verify, and CBC fields fail with a data-integrity
//! error. Migrate them (password reset, re-encryption from plaintext) before
//! switching over.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod session;
pub mod state;
pub mod store;
pub mod types;

pub use config::{Args, AuthConfig};
pub use state::AuthState;
pub use types::{AuthError, Result};
