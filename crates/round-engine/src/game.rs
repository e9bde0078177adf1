//! The seam between the generic engine and each concrete mini-game

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::GameConfig;
use crate::error::EngineError;
use crate::random::RandomSource;
use crate::round::RoundRecord;
use crate::AgentId;

/// Read-only view of a round in progress
pub struct RoundView<'a, G: Game + ?Sized> {
    /// 1-based round index
    pub round: u32,
    pub agents: &'a [Agent<G::Archetype>],
    /// Decisions collected so far this round
    pub decisions: &'a BTreeMap<AgentId, G::Action>,
    /// Completed rounds, oldest first
    pub history: &'a [RoundRecord<G::Action, G::Outcome>],
    pub shared: &'a G::Shared,
}

impl<G: Game + ?Sized> RoundView<'_, G> {
    pub fn agent(&self, id: AgentId) -> Option<&Agent<G::Archetype>> {
        self.agents.get(id)
    }

    pub fn last_round(&self) -> Option<&RoundRecord<G::Action, G::Outcome>> {
        self.history.last()
    }

    /// Agents without a decision yet, in id order
    pub fn undecided(&self) -> Vec<AgentId> {
        self.agents
            .iter()
            .map(|a| a.id)
            .filter(|id| !self.decisions.contains_key(id))
            .collect()
    }
}

/// What the payoff resolver hands back for one round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution<O> {
    /// Score change per agent; agents without an entry receive nothing
    pub payoffs: BTreeMap<AgentId, f64>,
    pub outcome: O,
}

/// A round-based strategy game
///
/// The engine owns phases, agents, scores and history; an implementation
/// only supplies the rules: who must act, which actions are legal, how
/// synthetic agents choose, and how joint actions turn into payoffs.
pub trait Game {
    type Action: Clone + Debug + PartialEq + Serialize + DeserializeOwned;
    type Archetype: Archetype;
    /// Per-session state the rules carry between rounds (pool, pizza, map)
    type Shared: Clone + Debug + Serialize;
    /// Per-round details recorded alongside payoffs
    type Outcome: Clone + Debug + Serialize;

    fn name(&self) -> &'static str;

    fn config(&self) -> &GameConfig;

    /// Archetypes synthetic agents may be assigned in this game
    fn archetypes(&self) -> &[Self::Archetype];

    fn initial_shared(&self, agents: &[Agent<Self::Archetype>]) -> Self::Shared;

    /// Per-round setup, run as each round opens
    fn begin_round(
        &self,
        _shared: &mut Self::Shared,
        _round: u32,
        _agents: &[Agent<Self::Archetype>],
        _rng: &mut dyn RandomSource,
    ) {
    }

    /// Agents whose decision is still required; empty means the round is complete
    fn pending(&self, view: &RoundView<'_, Self>) -> Vec<AgentId> {
        view.undecided()
    }

    /// Legality of `action` for `agent` given the round so far
    fn check(
        &self,
        _view: &RoundView<'_, Self>,
        _agent: AgentId,
        _action: &Self::Action,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Decision policy for a synthetic agent
    fn decide(
        &self,
        archetype: Self::Archetype,
        agent: AgentId,
        view: &RoundView<'_, Self>,
        rng: &mut dyn RandomSource,
    ) -> Self::Action;

    /// Random event between collection and resolution; only called when
    /// the configuration enables events
    fn perturb(&self, _shared: &mut Self::Shared, _rng: &mut dyn RandomSource) {}

    /// Payoff resolver
    fn resolve(
        &self,
        view: &RoundView<'_, Self>,
        rng: &mut dyn RandomSource,
    ) -> Resolution<Self::Outcome>;

    /// Human-readable summary of a resolved round
    fn analyze(&self, view: &RoundView<'_, Self>, resolution: &Resolution<Self::Outcome>) -> String;

    /// Hook run once a round has been recorded
    fn end_round(&self, _shared: &mut Self::Shared, _round: u32) {}
}
