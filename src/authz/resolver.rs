use serde::Serialize;

use super::actor::Actor;
use super::error::AccessError;
use super::role::ScopeRule;
use super::scope::AccessScope;
use super::view_mode::ViewMode;

/// Outcome of scope resolution, with the recoverable conditions hit on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub scope: AccessScope,
    /// Mode actually applied after clamping.
    pub mode: ViewMode,
    pub field_restricted: bool,
    pub notices: Vec<AccessError>,
}

/// Maps an actor and a view mode onto an [`AccessScope`].
///
/// Implementations must be pure: the result may depend on the actor's role,
/// id and home office and on the mode, and on nothing else.
pub trait ScopeResolver: Send + Sync {
    fn explain(&self, actor: &Actor, mode: ViewMode) -> Resolution;

    fn resolve(&self, actor: &Actor, mode: ViewMode) -> AccessScope {
        self.explain(actor, mode).scope
    }
}

/// Resolver backed by the static role table.
///
/// 1. clamp `broad` to `scoped` for roles that cannot toggle
/// 2. pick the role's rule for the effective mode
/// 3. substitute home office / actor id, narrowing to the actor's own
///    records when an office is required but missing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScopeResolver;

impl DefaultScopeResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ScopeResolver for DefaultScopeResolver {
    fn explain(&self, actor: &Actor, requested: ViewMode) -> Resolution {
        let caps = actor.role.capabilities();
        let mut notices = Vec::new();

        let mode = if requested == ViewMode::Broad && !caps.can_toggle {
            notices.push(AccessError::ToggleDenied { role: actor.role });
            ViewMode::Scoped
        } else {
            requested
        };

        let rule = match mode {
            ViewMode::Broad => caps.broad,
            ViewMode::Scoped => caps.scoped,
        };

        let scope = match rule {
            ScopeRule::All => AccessScope::All,
            ScopeRule::Own => AccessScope::OwnedBy(actor.id),
            ScopeRule::HomeOfficeOrAll => match actor.home_office_id {
                Some(office_id) => AccessScope::Office(office_id),
                None => AccessScope::All,
            },
            ScopeRule::HomeOfficeOrOwn => match actor.home_office_id {
                Some(office_id) => AccessScope::Office(office_id),
                None => {
                    tracing::warn!(
                        actor_id = %actor.id,
                        role = %actor.role,
                        "no home office for office-scoped role, narrowing to own records"
                    );
                    notices.push(AccessError::AmbiguousOffice { role: actor.role });
                    AccessScope::OwnedBy(actor.id)
                }
            },
        };

        tracing::debug!(
            actor_id = %actor.id,
            role = %actor.role,
            requested = %requested,
            mode = %mode,
            scope = %scope,
            "scope resolved"
        );

        Resolution {
            scope,
            mode,
            field_restricted: caps.field_restricted,
            notices,
        }
    }
}
