use serde::Serialize;
use uuid::Uuid;

use super::role::Role;

/// Access conditions raised by the engine.
///
/// Only `UnknownActor` ends a request. The others are recoverable and always
/// resolve towards the narrower outcome: a denied toggle keeps the current
/// mode, an ambiguous office narrows to the actor's own records, and a scope
/// violation rejects just the offending ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessError {
    #[error("unknown actor {actor_id}")]
    UnknownActor { actor_id: Uuid },
    #[error("role {role} may not toggle view mode")]
    ToggleDenied { role: Role },
    #[error("{} record(s) outside the resolved scope", .rejected.len())]
    ScopeViolation { rejected: Vec<Uuid> },
    #[error("role {role} requires a home office")]
    AmbiguousOffice { role: Role },
}

impl AccessError {
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::UnknownActor { .. } => "unknown_actor",
            AccessError::ToggleDenied { .. } => "toggle_denied",
            AccessError::ScopeViolation { .. } => "scope_violation",
            AccessError::AmbiguousOffice { .. } => "ambiguous_office",
        }
    }
}
