//! Engine error types

use thiserror::Error;

use crate::round::Phase;
use crate::AgentId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Cannot {operation} while in {phase} phase")]
    InvalidTransition { operation: &'static str, phase: Phase },

    #[error("Agent {agent} already decided in round {round}")]
    DuplicateDecision { agent: AgentId, round: u32 },

    #[error("Illegal action from agent {agent}: {reason}")]
    IllegalAction { agent: AgentId, reason: String },

    #[error("Unknown agent: {agent}")]
    UnknownAgent { agent: AgentId },

    #[error("Agent {agent} is synthetic and decides on its own")]
    NotHuman { agent: AgentId },
}

impl EngineError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        EngineError::Configuration { reason: reason.into() }
    }

    pub(crate) fn illegal(agent: AgentId, reason: impl Into<String>) -> Self {
        EngineError::IllegalAction { agent, reason: reason.into() }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::config(format!("malformed JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let error = EngineError::config("agent count 7 outside 2..=4");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: agent count 7 outside 2..=4"
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let error = EngineError::InvalidTransition {
            operation: "submit a decision",
            phase: Phase::Analysis,
        };
        assert_eq!(
            error.to_string(),
            "Cannot submit a decision while in analysis phase"
        );
    }

    #[test]
    fn test_duplicate_decision_message() {
        let error = EngineError::DuplicateDecision { agent: 1, round: 3 };
        assert_eq!(error.to_string(), "Agent 1 already decided in round 3");
    }

    #[test]
    fn test_json_error_is_configuration() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(EngineError::from(err), EngineError::Configuration { .. }));
    }
}
