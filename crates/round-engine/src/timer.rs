//! Round-stamped timer tickets
//!
//! The presentation layer owns the actual clock. The engine only issues
//! tickets and checks them when they come back, so a callback scheduled for
//! a round that has since closed, or for a session that has since been
//! reset, is recognised and dropped.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// Identifies one round of one session lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundId {
    /// Bumped on every reset
    pub epoch: u32,
    pub round: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerKind {
    /// Cosmetic pause before a synthetic agent's decision is applied
    Think { agent: AgentId },
    /// Round deadline; whatever has been collected gets resolved
    Countdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTicket {
    pub id: RoundId,
    pub kind: TimerKind,
    /// How long the caller should wait before firing
    pub delay_ms: u32,
}

/// What happened when a ticket was fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerOutcome {
    Applied,
    /// The ticket's round is no longer current; nothing changed
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_serialization() {
        let ticket = TimerTicket {
            id: RoundId { epoch: 0, round: 3 },
            kind: TimerKind::Think { agent: 2 },
            delay_ms: 1000,
        };
        let json = serde_json::to_string(&ticket).unwrap();
        let back: TimerTicket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticket);
    }

    #[test]
    fn test_round_ids_differ_across_epochs() {
        let a = RoundId { epoch: 0, round: 1 };
        let b = RoundId { epoch: 1, round: 1 };
        assert_ne!(a, b);
    }
}
