//! Office-scoped access control.
//!
//! Decides which records an actor may see or mutate:
//! - role registry with a fail-closed default role
//! - actor resolution against the user store
//! - per-collection view mode toggle, gated by role
//! - pure scope resolution and a query facade that applies it everywhere

mod actor;
mod collection;
mod error;
mod facade;
mod gate;
mod resolver;
mod role;
mod scope;
mod view_mode;

pub use actor::{Actor, ActorDirectory, SqliteActorDirectory};
pub use collection::{Collection, UnknownCollection};
pub use error::AccessError;
pub use facade::{BulkMutation, BulkOutcome, ScopedQuery, ScopedRecord};
pub use gate::{AccessGate, GateDecision};
pub use resolver::{DefaultScopeResolver, Resolution, ScopeResolver};
pub use role::{Role, RoleCapabilities, ScopeKind, ScopeRule, UnknownRole};
pub use scope::{AccessScope, Ownership};
pub use view_mode::{
    MemoryViewModeStore, SqliteViewModeStore, ToggleOutcome, UnknownViewMode, ViewMode, ViewModeState, ViewModeStore,
};
