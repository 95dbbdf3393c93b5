//! Resource ownership checks
//!
//! Artisans may only act on their own products, orders and return requests.
//! Runs after the role check, on an already authenticated `Identity`.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::auth::gate::{AuthorizationGate, Identity};
use crate::types::{ForbiddenReason, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Product,
    Order,
    ReturnRequest,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Product => write!(f, "product"),
            ResourceKind::Order => write!(f, "order"),
            ResourceKind::ReturnRequest => write!(f, "return_request"),
        }
    }
}

/// Answers whether a resource belongs to an account (allows mocking in tests)
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    async fn is_owner(&self, kind: ResourceKind, resource_id: &str, subject_id: &str) -> Result<bool>;
}

impl AuthorizationGate {
    /// Refuse with `Forbidden(NotOwner)` unless the caller owns the resource
    pub async fn authorize_owner(
        &self,
        identity: &Identity,
        lookup: &dyn OwnershipLookup,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<()> {
        if lookup
            .is_owner(kind, resource_id, identity.subject_id())
            .await?
        {
            return Ok(());
        }

        debug!(
            sub = identity.subject_id(),
            %kind,
            resource_id,
            "Ownership check failed"
        );
        let target = format!("{kind}:{resource_id}");
        Err(self
            .deny(identity.subject_id(), ForbiddenReason::NotOwner, Some(&target))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::{role_set, AccountType};
    use crate::auth::TokenService;
    use crate::config::TokenConfig;
    use crate::store::InMemoryUserStore;
    use crate::types::AuthError;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MapOwnership(HashMap<(ResourceKind, String), String>);

    #[async_trait]
    impl OwnershipLookup for MapOwnership {
        async fn is_owner(
            &self,
            kind: ResourceKind,
            resource_id: &str,
            subject_id: &str,
        ) -> Result<bool> {
            Ok(self
                .0
                .get(&(kind, resource_id.to_string()))
                .is_some_and(|owner| owner == subject_id))
        }
    }

    fn gate() -> AuthorizationGate {
        let tokens = TokenService::new(&TokenConfig::new(
            "ownership-test-secret-at-least-32-chars",
            60,
            3600,
            0,
        ))
        .unwrap();
        AuthorizationGate::new(Arc::new(tokens), Arc::new(InMemoryUserStore::new()))
    }

    #[tokio::test]
    async fn test_owner_allowed_other_denied() {
        let lookup = MapOwnership(HashMap::from([
            ((ResourceKind::Product, "p1".to_string()), "7".to_string()),
            ((ResourceKind::Order, "o1".to_string()), "8".to_string()),
        ]));
        let gate = gate();
        let artisan = Identity::new("7".into(), AccountType::Artisan, role_set(["artisan"]), 0);

        assert!(gate
            .authorize_owner(&artisan, &lookup, ResourceKind::Product, "p1")
            .await
            .is_ok());
        assert!(matches!(
            gate.authorize_owner(&artisan, &lookup, ResourceKind::Order, "o1")
                .await,
            Err(AuthError::Forbidden(ForbiddenReason::NotOwner))
        ));
        // Same id under a different kind is a different resource
        assert!(gate
            .authorize_owner(&artisan, &lookup, ResourceKind::ReturnRequest, "p1")
            .await
            .is_err());
    }
}
