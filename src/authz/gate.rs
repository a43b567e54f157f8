use std::sync::Arc;

use super::actor::Actor;
use super::collection::Collection;
use super::resolver::{Resolution, ScopeResolver};
use super::view_mode::{ToggleOutcome, ViewMode, ViewModeState};
use crate::errors::AppResult;

/// The single entry point every read and write path goes through to learn
/// its scope: apply an optional toggle, read the stored mode, resolve.
#[derive(Clone)]
pub struct AccessGate {
    view_modes: ViewModeState,
    resolver: Arc<dyn ScopeResolver>,
}

#[derive(Debug, Clone)]
pub struct GateDecision {
    pub collection: Collection,
    pub resolution: Resolution,
    /// Present when the request carried a toggle.
    pub toggle: Option<ToggleOutcome>,
}

impl AccessGate {
    pub fn new(view_modes: ViewModeState, resolver: Arc<dyn ScopeResolver>) -> Self {
        Self { view_modes, resolver }
    }

    pub fn view_modes(&self) -> &ViewModeState {
        &self.view_modes
    }

    pub async fn decide(
        &self,
        actor: &Actor,
        collection: Collection,
        toggle: Option<ViewMode>,
    ) -> AppResult<GateDecision> {
        let toggle = match toggle {
            Some(requested) => Some(self.view_modes.set(actor, collection, requested).await?),
            None => None,
        };

        let stored = self.view_modes.get(actor.id, collection).await?;
        let mut resolution = self.resolver.explain(actor, stored);

        if let Some(ToggleOutcome::Denied { reason, .. }) = &toggle {
            if !resolution.notices.contains(reason) {
                resolution.notices.push(reason.clone());
            }
        }

        Ok(GateDecision {
            collection,
            resolution,
            toggle,
        })
    }
}
