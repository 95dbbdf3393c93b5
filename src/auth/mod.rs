//! Authentication and authorization
//!
//! Provides:
//! - Signed access/refresh token issuance and verification
//! - The authorization gate (authenticate, then authorize by role)
//! - Resource ownership checks
//! - Password hashing with Argon2
//! - Account types and effective role derivation

pub mod clock;
pub mod gate;
pub mod jwt;
pub mod ownership;
pub mod password;
pub mod roles;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{authorize, AuthorizationGate, Decision, Identity};
pub use jwt::{extract_token_from_header, Claims, IssuedToken, TokenKind, TokenRejection, TokenService};
pub use ownership::{OwnershipLookup, ResourceKind};
pub use password::CredentialStore;
pub use roles::{derive_effective_roles, role_set, AccountType, RoleSet};
