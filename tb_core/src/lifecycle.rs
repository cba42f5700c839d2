//! Per-infrastructure bookkeeping embedded by implementations.

use crate::types::ContextId;

/// Where an infrastructure is in its lifecycle.
///
/// `Unstarted -> Initialized -> Destroyed`; resets keep it `Initialized`.
/// There is no way back from `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfrastructureState {
    Unstarted,
    Initialized,
    Destroyed,
}

impl std::fmt::Display for InfrastructureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unstarted => "unstarted",
            Self::Initialized => "initialized",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Identity, reset policy and lifecycle state of one infrastructure.
///
/// Implementations hold one of these and hand it out through
/// [`Infrastructure::context`](crate::Infrastructure::context).
#[derive(Debug, Clone)]
pub struct InfrastructureContext {
    context_id: ContextId,
    auto_reset: bool,
    state: InfrastructureState,
}

impl InfrastructureContext {
    /// Standalone context with a freshly generated id and auto reset enabled.
    pub fn new() -> Self {
        Self {
            context_id: ContextId::new(),
            auto_reset: true,
            state: InfrastructureState::Unstarted,
        }
    }

    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn set_context_id(&mut self, context_id: ContextId) {
        self.context_id = context_id;
    }

    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    pub fn set_auto_reset(&mut self, auto_reset: bool) {
        self.auto_reset = auto_reset;
    }

    pub fn state(&self) -> InfrastructureState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == InfrastructureState::Initialized
    }

    pub fn mark_initialized(&mut self) {
        if self.state == InfrastructureState::Unstarted {
            self.state = InfrastructureState::Initialized;
        }
    }

    /// Moves to `Destroyed` and returns the previous state.
    ///
    /// Only a previous state of `Initialized` means there is something left
    /// to release, which keeps a second destroy a no-op.
    pub fn mark_destroyed(&mut self) -> InfrastructureState {
        std::mem::replace(&mut self.state, InfrastructureState::Destroyed)
    }
}

impl Default for InfrastructureContext {
    fn default() -> Self {
        Self::new()
    }
}
