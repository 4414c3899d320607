use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("illegal lifecycle transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },
}

// ---------------------------------------------------------------------------
// LifecyclePhase
// ---------------------------------------------------------------------------

/// Where a controller is in the life of its task.
///
/// `Terminal` is reached at most once per started task; reaching it is what
/// authorises the single terminal chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    #[default]
    Uninitialized,
    Polling,
    Terminal,
}

impl LifecyclePhase {
    /// Returns `true` when a transition from `self` to `target` is valid.
    /// Resetting to `Uninitialized` is always allowed (a new `start`).
    pub fn can_transition_to(&self, target: &LifecyclePhase) -> bool {
        matches!(
            (self, target),
            (_, LifecyclePhase::Uninitialized)
                | (LifecyclePhase::Uninitialized, LifecyclePhase::Polling)
                | (LifecyclePhase::Polling, LifecyclePhase::Terminal)
        )
    }

    pub fn transition(&mut self, target: LifecyclePhase) -> Result<(), LifecycleError> {
        if !self.can_transition_to(&target) {
            return Err(LifecycleError::IllegalTransition {
                from: *self,
                to: target,
            });
        }
        *self = target;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        *self == LifecyclePhase::Terminal
    }
}
