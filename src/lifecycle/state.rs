//! Application lifecycle state machine.
//!
//! ```text
//! Bootstrapping -> ModulesInitialized -> Bootstrapped -> Listening
//!                                             |              |
//!                                             +---- close ---+
//!                                                    |
//!                   Destroying -> BeforeShutdown -> Shutdown -> Terminal
//! ```
//!
//! `Listening` is skipped when an application is built and closed without
//! ever serving (the common case in tests).

use super::LifecycleError;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Bootstrapping,
    ModulesInitialized,
    Bootstrapped,
    Listening,
    Destroying,
    BeforeShutdown,
    Shutdown,
    Terminal,
}

impl AppState {
    fn can_transition_to(self, next: AppState) -> bool {
        use AppState::*;
        matches!(
            (self, next),
            (Bootstrapping, ModulesInitialized)
                | (ModulesInitialized, Bootstrapped)
                | (Bootstrapped, Listening)
                | (Bootstrapped, Destroying)
                | (Listening, Destroying)
                | (Destroying, BeforeShutdown)
                | (BeforeShutdown, Shutdown)
                | (Shutdown, Terminal)
        )
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Tracks the application state and rejects illegal transitions.
pub struct StateMachine {
    current: Mutex<AppState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(AppState::Bootstrapping),
        }
    }

    pub fn current(&self) -> AppState {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Advance to `next`, failing on a transition the diagram forbids.
    pub fn advance(&self, next: AppState) -> Result<(), LifecycleError> {
        let mut current = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !current.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(from = %*current, to = %next, "lifecycle transition");
        *current = next;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let machine = StateMachine::new();
        for next in [
            AppState::ModulesInitialized,
            AppState::Bootstrapped,
            AppState::Listening,
            AppState::Destroying,
            AppState::BeforeShutdown,
            AppState::Shutdown,
            AppState::Terminal,
        ] {
            machine.advance(next).unwrap();
            assert_eq!(machine.current(), next);
        }
    }

    #[test]
    fn close_without_listening_is_legal() {
        let machine = StateMachine::new();
        machine.advance(AppState::ModulesInitialized).unwrap();
        machine.advance(AppState::Bootstrapped).unwrap();
        machine.advance(AppState::Destroying).unwrap();
    }

    #[test]
    fn skipping_phases_is_rejected() {
        let machine = StateMachine::new();
        let err = machine.advance(AppState::Listening).unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition { .. }));
        assert_eq!(machine.current(), AppState::Bootstrapping);
    }
}
