//! Worker lifecycle states and the transitions between them.
//!
//! ```text
//! Uninstalled -> Installing -> Installed -> Activating -> Active
//!      ^             |            ^             |
//!      +-------------+            |             v
//!   (manifest fetch failed)       |         Installed (store listing failed)
//!                                 |
//! Uninstalled --------------------+ (resumed from a complete store)
//!
//! any state -> Terminated (superseded)
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed and waiting for the activate event.
    Installed,
    Activating,
    Active,
    Terminated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninstalled => "uninstalled",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Terminated => "terminated",
        }
    }

    /// Only an active worker intercepts fetches.
    pub fn can_intercept(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Uninstalled, Installing)
                | (Uninstalled, Installed)
                | (Installing, Installed)
                | (Installing, Uninstalled)
                | (Installed, Activating)
                | (Activating, Active)
                | (Activating, Installed)
                | (Uninstalled | Installing | Installed | Activating | Active, Terminated)
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkerState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [Uninstalled, Installing, Installed, Activating, Active, Terminated];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_install_can_retry() {
        assert!(Installing.can_transition_to(Uninstalled));
        assert!(Uninstalled.can_transition_to(Installing));
    }

    #[test]
    fn test_no_skipping_install() {
        assert!(!Uninstalled.can_transition_to(Activating));
        assert!(!Uninstalled.can_transition_to(Active));
        assert!(!Installing.can_transition_to(Active));
        assert!(!Installed.can_transition_to(Active));
    }

    #[test]
    fn test_no_reinstall() {
        assert!(!Installed.can_transition_to(Installing));
        assert!(!Active.can_transition_to(Installing));
        assert!(!Active.can_transition_to(Activating));
    }

    #[test]
    fn test_terminated_is_final() {
        for next in [Uninstalled, Installing, Installed, Activating, Active, Terminated] {
            assert!(!Terminated.can_transition_to(next));
        }
    }

    #[test]
    fn test_only_active_intercepts() {
        assert!(Active.can_intercept());
        for state in [Uninstalled, Installing, Installed, Activating, Terminated] {
            assert!(!state.can_intercept());
        }
    }

    #[test]
    fn test_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Active).unwrap(), "\"active\"");
    }
}
