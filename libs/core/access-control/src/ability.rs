//! Per-request ability sets.

use async_trait::async_trait;
use uuid::Uuid;

use crate::rule::{parse_permission, Rule, Scope, SubjectRecord};
use crate::{AccessError, UserPayload};

/// Role → permission-name lookup, implemented by the roles repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RolePermissions: Send + Sync {
    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AccessError>;
}

/// The resolved rule set for one request.
///
/// Lifetime is exactly one HTTP request: built during request initialization,
/// discarded at teardown. It must never be cached or shared across requests,
/// since the rules embed the requester's identity.
#[derive(Debug, Clone)]
pub struct AbilitySet {
    rules: Vec<Rule>,
    requester: Option<Uuid>,
}

impl AbilitySet {
    /// The fixed rule set for anonymous requests: read access to the public
    /// catalog and signup. No database lookup occurs.
    pub fn guest() -> Self {
        let mut rules = Vec::new();
        for subject in ["product", "review", "category", "supplier"] {
            rules.push(Rule::all("read", subject));
        }
        rules.push(Rule::universal("create", "user"));
        rules.push(Rule::universal("create", "supplier"));
        Self {
            rules,
            requester: None,
        }
    }

    /// Resolve the full rule set for one request.
    ///
    /// Anonymous requests get the guest rules. Authenticated requests derive
    /// rules from the role's permission rows; malformed or unmappable
    /// permission names are skipped with a warning (deny-safe). A requester
    /// with an embedded supplier profile additionally gets the fixed
    /// supplier-scoped rule set.
    pub async fn for_request(
        payload: Option<&UserPayload>,
        lookup: &dyn RolePermissions,
    ) -> Result<Self, AccessError> {
        let Some(payload) = payload else {
            return Ok(Self::guest());
        };

        let names = lookup.permissions_for_role(payload.role_id).await?;
        let mut rules = Vec::with_capacity(names.len());
        for name in &names {
            match parse_permission(name, payload.id) {
                Ok(rule) => rules.push(rule),
                Err(err) => {
                    tracing::warn!(permission = name.as_str(), %err, "skipping permission");
                }
            }
        }

        if let Some(supplier) = &payload.supplier {
            for action in ["create", "update", "delete"] {
                rules.push(Rule::own(action, "product", "supplier_id", supplier.id));
            }
            rules.push(Rule::own("update", "supplier", "id", supplier.id));
            rules.push(Rule::own("read", "sale", "supplier_id", supplier.id));
        }

        Ok(Self {
            rules,
            requester: Some(payload.id),
        })
    }

    pub fn requester(&self) -> Option<Uuid> {
        self.requester
    }

    /// Type-level check: does any rule grant `action` on the subject type,
    /// regardless of scope? Ownership conditions are not evaluated here; use
    /// [`AbilitySet::can_record`] when a concrete record is at hand.
    pub fn can(&self, action: &str, subject: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.action == action && r.subject == subject)
    }

    /// Elevated check: does an `:all`-scoped rule grant `action` on every
    /// record of the subject type?
    pub fn can_all(&self, action: &str, subject: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.action == action && r.subject == subject && r.scope == Scope::All)
    }

    /// Record-level check, enforcing ownership conditions of `:own` rules.
    pub fn can_record(&self, action: &str, record: &SubjectRecord) -> bool {
        self.rules.iter().any(|rule| {
            if rule.action != action || rule.subject != record.subject() {
                return false;
            }
            match rule.scope {
                Scope::None | Scope::All => true,
                Scope::Own => match rule.ownership {
                    Some((field, owner)) => record.owner(field) == Some(owner),
                    None => false,
                },
            }
        })
    }

    /// The single authorization gate: evaluates a predicate over the rule set
    /// and fails the request with `Forbidden` when it does not hold.
    pub fn authorize<F>(&self, predicate: F) -> Result<(), AccessError>
    where
        F: FnOnce(&AbilitySet) -> bool,
    {
        if predicate(self) {
            Ok(())
        } else {
            tracing::warn!(requester = ?self.requester, "authorization denied");
            Err(AccessError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupplierProfile;
    use mockall::predicate::eq;

    fn payload(id: Uuid, role_id: Uuid, supplier: Option<Uuid>) -> UserPayload {
        UserPayload {
            id,
            role_id,
            supplier: supplier.map(|id| SupplierProfile { id }),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn guest_reads_catalog_but_cannot_order() {
        let ability = AbilitySet::guest();
        assert!(ability.can_all("read", "product"));
        assert!(ability.can("create", "user"));
        assert!(!ability.can("create", "order"));
        assert!(!ability.can("update", "product"));
    }

    #[tokio::test]
    async fn role_permissions_become_rules() {
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let mut lookup = MockRolePermissions::new();
        lookup
            .expect_permissions_for_role()
            .with(eq(role_id))
            .returning(|_| {
                Ok(vec![
                    "read:order:own".to_string(),
                    "create:order".to_string(),
                    "read:product:all".to_string(),
                    "bogus".to_string(),
                ])
            });

        let payload = payload(user_id, role_id, None);
        let ability = AbilitySet::for_request(Some(&payload), &lookup)
            .await
            .unwrap();

        assert!(ability.can("create", "order"));
        assert!(ability.can_all("read", "product"));
        // Own-scoped read matches only the requester's records.
        let own = SubjectRecord::new("order").owned_by("user_id", user_id);
        let other = SubjectRecord::new("order").owned_by("user_id", Uuid::new_v4());
        assert!(ability.can_record("read", &own));
        assert!(!ability.can_record("read", &other));
        // The malformed name was skipped without failing the request.
        assert!(!ability.can("bogus", ""));
    }

    #[tokio::test]
    async fn own_scope_checks_ownership_field() {
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let mut lookup = MockRolePermissions::new();
        lookup
            .expect_permissions_for_role()
            .returning(|_| Ok(vec!["update:product:own".to_string()]));

        let payload = payload(user_id, role_id, None);
        let ability = AbilitySet::for_request(Some(&payload), &lookup)
            .await
            .unwrap();

        let owned = SubjectRecord::new("product").owned_by("supplier_id", user_id);
        let foreign = SubjectRecord::new("product").owned_by("supplier_id", Uuid::new_v4());
        assert!(ability.can_record("update", &owned));
        assert!(!ability.can_record("update", &foreign));
    }

    #[tokio::test]
    async fn supplier_profile_appends_supplier_rules() {
        let user_id = Uuid::new_v4();
        let supplier_id = Uuid::new_v4();
        let mut lookup = MockRolePermissions::new();
        lookup.expect_permissions_for_role().returning(|_| Ok(vec![]));

        let payload = payload(user_id, Uuid::new_v4(), Some(supplier_id));
        let ability = AbilitySet::for_request(Some(&payload), &lookup)
            .await
            .unwrap();

        let own_product = SubjectRecord::new("product").owned_by("supplier_id", supplier_id);
        let foreign_product =
            SubjectRecord::new("product").owned_by("supplier_id", Uuid::new_v4());
        assert!(ability.can_record("update", &own_product));
        assert!(ability.can_record("delete", &own_product));
        assert!(!ability.can_record("update", &foreign_product));

        let own_profile = SubjectRecord::new("supplier").owned_by("id", supplier_id);
        assert!(ability.can_record("update", &own_profile));
        assert!(ability.can_record(
            "read",
            &SubjectRecord::new("sale").owned_by("supplier_id", supplier_id)
        ));
    }

    #[test]
    fn authorize_maps_false_to_forbidden() {
        let ability = AbilitySet::guest();
        assert!(ability.authorize(|a| a.can("read", "product")).is_ok());
        assert!(matches!(
            ability.authorize(|a| a.can("delete", "product")),
            Err(AccessError::Forbidden)
        ));
    }
}
