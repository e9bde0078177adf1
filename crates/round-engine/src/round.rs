//! Round controller: phases, decision collection and history records

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::AgentId;

/// Session phase
///
/// `Event` and `Resolution` are passed through synchronously once the last
/// decision of a round arrives; callers observe them only in logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    Setup,
    DecisionCollection,
    Event,
    Resolution,
    Analysis,
    Terminal,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::DecisionCollection => "decision-collection",
            Phase::Event => "event",
            Phase::Resolution => "resolution",
            Phase::Analysis => "analysis",
            Phase::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// An immutable entry in session history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord<A, O> {
    pub round: u32,
    pub decisions: BTreeMap<AgentId, A>,
    pub payoffs: BTreeMap<AgentId, f64>,
    /// Score of each agent after this round
    pub cumulative: BTreeMap<AgentId, f64>,
    pub outcome: O,
    pub analysis: String,
}

impl<A, O> RoundRecord<A, O> {
    pub fn decision(&self, agent: AgentId) -> Option<&A> {
        self.decisions.get(&agent)
    }

    pub fn payoff(&self, agent: AgentId) -> f64 {
        self.payoffs.get(&agent).copied().unwrap_or(0.0)
    }
}

/// The one round currently being played
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveRound<A> {
    pub index: u32,
    decisions: BTreeMap<AgentId, A>,
}

impl<A> ActiveRound<A> {
    pub fn new(index: u32) -> Self {
        Self { index, decisions: BTreeMap::new() }
    }

    pub fn decisions(&self) -> &BTreeMap<AgentId, A> {
        &self.decisions
    }

    pub fn has_decided(&self, agent: AgentId) -> bool {
        self.decisions.contains_key(&agent)
    }

    /// Fill the agent's slot; a filled slot is never overwritten
    pub fn record(&mut self, agent: AgentId, action: A) -> Result<(), EngineError> {
        if self.has_decided(agent) {
            return Err(EngineError::DuplicateDecision { agent, round: self.index });
        }
        self.decisions.insert(agent, action);
        Ok(())
    }

    pub fn into_decisions(self) -> BTreeMap<AgentId, A> {
        self.decisions
    }
}

/// Phase bookkeeping for a session
///
/// Holds the current phase and the active round; it knows nothing about a
/// game's rules, only which operations each phase permits.
#[derive(Clone, Debug)]
pub struct RoundController<A> {
    phase: Phase,
    active: ActiveRound<A>,
}

impl<A> Default for RoundController<A> {
    fn default() -> Self {
        Self { phase: Phase::Setup, active: ActiveRound::new(0) }
    }
}

impl<A> RoundController<A> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.active.index
    }

    pub fn active(&self) -> &ActiveRound<A> {
        &self.active
    }

    /// Fail with `InvalidTransition` unless the controller is in `phase`
    pub fn require(&self, phase: Phase, operation: &'static str) -> Result<(), EngineError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition { operation, phase: self.phase })
        }
    }

    /// Open the next round; index grows by exactly one
    pub fn open_round(&mut self) -> u32 {
        let next = self.active.index + 1;
        self.active = ActiveRound::new(next);
        self.phase = Phase::DecisionCollection;
        next
    }

    pub fn record(&mut self, agent: AgentId, action: A) -> Result<(), EngineError> {
        self.require(Phase::DecisionCollection, "submit a decision")?;
        self.active.record(agent, action)
    }

    /// Move through the internal phases after collection ends
    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Hand the collected decisions to resolution, leaving the slots empty
    pub(crate) fn take_decisions(&mut self) -> BTreeMap<AgentId, A> {
        let index = self.active.index;
        std::mem::replace(&mut self.active, ActiveRound::new(index)).into_decisions()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
