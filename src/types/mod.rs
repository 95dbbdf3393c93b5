//! Shared types

pub mod error;

pub use error::{AuthError, ErrorResponse, ForbiddenReason, Result};
