use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::role::ScopeKind;

/// The filter a request is allowed to see through.
///
/// Serialized as `{"kind": "office", "id": "..."}` so the storage layer and
/// API consumers can carry it around without knowing how it was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccessScope {
    All,
    Office(Uuid),
    OwnedBy(Uuid),
}

/// Ownership columns shared by every scoped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub owner_office_id: Option<Uuid>,
    pub owner_id: Uuid,
}

impl AccessScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            AccessScope::All => ScopeKind::All,
            AccessScope::Office(_) => ScopeKind::Office,
            AccessScope::OwnedBy(_) => ScopeKind::OwnedBy,
        }
    }

    /// In-memory form of the SQL predicate pushed by [`AccessScope::push_predicate`].
    /// Records without an office are only visible through `All` or ownership.
    pub fn permits(&self, ownership: &Ownership) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Office(office_id) => ownership.owner_office_id == Some(*office_id),
            AccessScope::OwnedBy(actor_id) => ownership.owner_id == *actor_id,
        }
    }

    /// Append ` AND <predicate>` to a query whose WHERE clause is already open.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match *self {
            AccessScope::All => {}
            AccessScope::Office(office_id) => {
                qb.push(" AND owner_office_id = ").push_bind(office_id);
            }
            AccessScope::OwnedBy(actor_id) => {
                qb.push(" AND owner_id = ").push_bind(actor_id);
            }
        }
    }
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessScope::All => write!(f, "ALL"),
            AccessScope::Office(id) => write!(f, "OFFICE({id})"),
            AccessScope::OwnedBy(id) => write!(f, "OWNED_BY({id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(office: Option<Uuid>, owner: Uuid) -> Ownership {
        Ownership {
            owner_office_id: office,
            owner_id: owner,
        }
    }

    #[test]
    fn all_permits_everything() {
        let record = owned(None, Uuid::new_v4());
        assert!(AccessScope::All.permits(&record));
    }

    #[test]
    fn office_scope_matches_office_only() {
        let office = Uuid::new_v4();
        let scope = AccessScope::Office(office);

        assert!(scope.permits(&owned(Some(office), Uuid::new_v4())));
        assert!(!scope.permits(&owned(Some(Uuid::new_v4()), Uuid::new_v4())));
        assert!(!scope.permits(&owned(None, Uuid::new_v4())));
    }

    #[test]
    fn owned_by_ignores_office() {
        let me = Uuid::new_v4();
        let scope = AccessScope::OwnedBy(me);

        assert!(scope.permits(&owned(None, me)));
        assert!(scope.permits(&owned(Some(Uuid::new_v4()), me)));
        assert!(!scope.permits(&owned(None, Uuid::new_v4())));
    }

    #[test]
    fn serialized_shape() {
        let id = Uuid::nil();
        assert_eq!(serde_json::to_value(AccessScope::All).unwrap(), serde_json::json!({"kind": "all"}));
        assert_eq!(
            serde_json::to_value(AccessScope::Office(id)).unwrap(),
            serde_json::json!({"kind": "office", "id": id.to_string()})
        );
        assert_eq!(
            serde_json::to_value(AccessScope::OwnedBy(id)).unwrap(),
            serde_json::json!({"kind": "owned_by", "id": id.to_string()})
        );
    }

    #[test]
    fn predicate_sql() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM people WHERE deleted_at IS NULL");
        AccessScope::All.push_predicate(&mut qb);
        assert_eq!(qb.sql(), "SELECT id FROM people WHERE deleted_at IS NULL");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM people WHERE deleted_at IS NULL");
        AccessScope::Office(Uuid::new_v4()).push_predicate(&mut qb);
        assert_eq!(qb.sql(), "SELECT id FROM people WHERE deleted_at IS NULL AND owner_office_id = ?");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM people WHERE deleted_at IS NULL");
        AccessScope::OwnedBy(Uuid::new_v4()).push_predicate(&mut qb);
        assert_eq!(qb.sql(), "SELECT id FROM people WHERE deleted_at IS NULL AND owner_id = ?");
    }
}
