use serde::{Deserialize, Serialize};

/// Parser lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParserState {
    /// Constructed, schema not yet resolved, no worker running
    #[default]
    Created,
    /// Schema resolved and worker thread running
    Started,
    /// Terminal; the worker has been asked to exit
    Stopped,
}

impl ParserState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &ParserState) -> bool {
        use ParserState::*;

        matches!(
            (self, target),
            // From Created
            (Created, Started) |
            (Created, Stopped) |

            // From Started
            (Started, Stopped)
        )
    }

    /// Get human-readable state name
    pub fn name(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        }
    }
}
