//! Account types and role sets
//!
//! Roles are plain lowercase names. The role a user's account type implies is
//! merged with the roles assigned in the store by `derive_effective_roles`,
//! computed once from the live account record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::store::AccountStatus;

/// Set of role names. Ordered so tokens serialize deterministically.
pub type RoleSet = BTreeSet<String>;

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_ARTISAN: &str = "artisan";
pub const ROLE_ARTISAN_HUB: &str = "artisan_hub";

/// Kind of account a user registered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Customer,
    Artisan,
    ArtisanHub,
    /// Staff accounts only hold roles assigned explicitly
    AdminStaff,
}

impl AccountType {
    /// Role implied by the account type, if any
    pub fn implied_role(&self) -> Option<&'static str> {
        match self {
            AccountType::Customer => Some(ROLE_CUSTOMER),
            AccountType::Artisan => Some(ROLE_ARTISAN),
            AccountType::ArtisanHub => Some(ROLE_ARTISAN_HUB),
            AccountType::AdminStaff => None,
        }
    }

    /// Status a newly registered account starts in.
    /// Artisans wait for verification before they can sign in.
    pub fn initial_status(&self) -> AccountStatus {
        match self {
            AccountType::Artisan => AccountStatus::PendingVerification,
            _ => AccountStatus::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Customer => "customer",
            AccountType::Artisan => "artisan",
            AccountType::ArtisanHub => "artisan_hub",
            AccountType::AdminStaff => "admin_staff",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(AccountType::Customer),
            "artisan" => Ok(AccountType::Artisan),
            "artisan_hub" => Ok(AccountType::ArtisanHub),
            "admin_staff" => Ok(AccountType::AdminStaff),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// Compute the roles an account actually holds.
///
/// Stored roles are kept as-is (blank names from empty joins are dropped) and
/// the account type's implied role is added.
pub fn derive_effective_roles<I, S>(account_type: AccountType, stored_roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roles: RoleSet = stored_roles
        .into_iter()
        .map(|r| r.as_ref().trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    if let Some(implied) = account_type.implied_role() {
        roles.insert(implied.to_string());
    }

    roles
}

/// Build a role set from string slices
pub fn role_set<I, S>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    roles.into_iter().map(Into::into).collect()
}

/// True iff the two sets share at least one role
pub fn has_any_role(held: &RoleSet, required: &RoleSet) -> bool {
    held.iter().any(|role| required.contains(role))
}
