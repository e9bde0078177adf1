//! Community Chest: a public goods game
//!
//! Everyone pays into a shared pool, the pool is multiplied and split
//! evenly, so each token kept is worth more to its owner than a token given,
//! while the group does best when everybody gives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit};
use crate::error::EngineError;
use crate::game::{Game, Resolution, RoundView};
use crate::random::RandomSource;
use crate::AgentId;

/// Whole tokens paid into the pool
pub type Tokens = u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChestEvent {
    #[default]
    Normal,
    Disaster,
    Windfall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChestArchetype {
    Cooperative,
    Freerider,
    Conditional,
}

impl Archetype for ChestArchetype {
    fn id(&self) -> &'static str {
        match self {
            ChestArchetype::Cooperative => "cooperative",
            ChestArchetype::Freerider => "freerider",
            ChestArchetype::Conditional => "conditional",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ChestArchetype::Cooperative => "Gives most of what it holds.",
            ChestArchetype::Freerider => "Gives a token amount and lives off the others.",
            ChestArchetype::Conditional => "Gives what the others have been giving.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChestParams {
    pub starting_tokens: f64,
    pub base_multiplier: f64,
    pub disaster_chance: f64,
    pub disaster_pool_factor: f64,
    pub disaster_multiplier: f64,
    pub windfall_chance: f64,
    pub windfall_pool_factor: f64,
    pub windfall_multiplier: f64,
    /// Share of holdings a cooperative agent gives
    pub cooperative_fraction: f64,
    /// Share of holdings a freerider gives
    pub freerider_fraction: f64,
}

impl Default for ChestParams {
    fn default() -> Self {
        Self {
            starting_tokens: 100.0,
            base_multiplier: 1.5,
            disaster_chance: 0.2,
            disaster_pool_factor: 0.5,
            disaster_multiplier: 1.2,
            windfall_chance: 0.2,
            windfall_pool_factor: 1.5,
            windfall_multiplier: 1.8,
            cooperative_fraction: 0.7,
            freerider_fraction: 0.1,
        }
    }
}

impl ChestParams {
    /// Map a unit draw to an event: low tail is a disaster, high tail a windfall
    pub fn event_for(&self, draw: f64) -> ChestEvent {
        if draw < self.disaster_chance {
            ChestEvent::Disaster
        } else if draw > 1.0 - self.windfall_chance {
            ChestEvent::Windfall
        } else {
            ChestEvent::Normal
        }
    }

    pub fn chest(&self, event: ChestEvent) -> Chest {
        let (pool_factor, multiplier) = match event {
            ChestEvent::Normal => (1.0, self.base_multiplier),
            ChestEvent::Disaster => (self.disaster_pool_factor, self.disaster_multiplier),
            ChestEvent::Windfall => (self.windfall_pool_factor, self.windfall_multiplier),
        };
        Chest { event, pool_factor, multiplier }
    }
}

/// Rules in force for the current round
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chest {
    pub event: ChestEvent,
    /// Applied to the collected tokens before multiplication
    pub pool_factor: f64,
    pub multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChestOutcome {
    pub event: ChestEvent,
    pub contributed: Tokens,
    /// Pool after the event, before multiplication
    pub pool: f64,
    pub multiplier: f64,
    /// What every agent receives back
    pub share: f64,
}

/// Split the multiplied pool evenly across all `agent_count` agents
///
/// Agents without a contribution still receive a share and pay nothing.
pub fn distribute(
    contributions: &BTreeMap<AgentId, Tokens>,
    agent_count: usize,
    chest: &Chest,
) -> (BTreeMap<AgentId, f64>, ChestOutcome) {
    let contributed: Tokens = contributions.values().sum();
    let pool = f64::from(contributed) * chest.pool_factor;
    let share = if agent_count == 0 {
        0.0
    } else {
        pool * chest.multiplier / agent_count as f64
    };

    let payoffs = (0..agent_count)
        .map(|id| {
            let paid = contributions.get(&id).copied().unwrap_or(0);
            (id, share - f64::from(paid))
        })
        .collect();

    let outcome = ChestOutcome {
        event: chest.event,
        contributed,
        pool,
        multiplier: chest.multiplier,
        share,
    };
    (payoffs, outcome)
}

fn holdings<A>(agent: &Agent<A>) -> Tokens {
    agent.score.max(0.0).floor() as Tokens
}

#[derive(Clone, Debug)]
pub struct CommunityChest {
    config: GameConfig,
    params: ChestParams,
    archetypes: Vec<ChestArchetype>,
}

impl CommunityChest {
    pub fn new(params: ChestParams) -> Self {
        let config = GameConfig::new(PlayerCount::new(2, 5), RoundLimit::Unbounded)
            .with_starting_score(params.starting_tokens)
            .with_random_events(true);
        Self {
            config,
            params,
            archetypes: vec![
                ChestArchetype::Cooperative,
                ChestArchetype::Freerider,
                ChestArchetype::Conditional,
            ],
        }
    }

    pub fn with_archetypes(mut self, archetypes: Vec<ChestArchetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn params(&self) -> &ChestParams {
        &self.params
    }
}

impl Default for CommunityChest {
    fn default() -> Self {
        Self::new(ChestParams::default())
    }
}

type View<'a> = RoundView<'a, CommunityChest>;

fn average(values: impl Iterator<Item = Tokens>) -> Option<f64> {
    let (sum, count) = values.fold((0u64, 0u64), |(s, c), v| (s + u64::from(v), c + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

impl Game for CommunityChest {
    type Action = Tokens;
    type Archetype = ChestArchetype;
    type Shared = Chest;
    type Outcome = ChestOutcome;

    fn name(&self) -> &'static str {
        "community-chest"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[ChestArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, _agents: &[Agent<ChestArchetype>]) -> Chest {
        self.params.chest(ChestEvent::Normal)
    }

    fn begin_round(
        &self,
        shared: &mut Chest,
        _round: u32,
        _agents: &[Agent<ChestArchetype>],
        _rng: &mut dyn RandomSource,
    ) {
        *shared = self.params.chest(ChestEvent::Normal);
    }

    fn check(&self, view: &View<'_>, agent: AgentId, action: &Tokens) -> Result<(), EngineError> {
        let held = view.agent(agent).map_or(0, holdings);
        if *action > held {
            return Err(EngineError::illegal(
                agent,
                format!("cannot contribute {action} tokens while holding {held}"),
            ));
        }
        Ok(())
    }

    fn decide(
        &self,
        archetype: ChestArchetype,
        agent: AgentId,
        view: &View<'_>,
        _rng: &mut dyn RandomSource,
    ) -> Tokens {
        let held = view.agent(agent).map_or(0, holdings);
        let fraction = |f: f64| (f64::from(held) * f).floor() as Tokens;
        match archetype {
            ChestArchetype::Cooperative => fraction(self.params.cooperative_fraction),
            ChestArchetype::Freerider => fraction(self.params.freerider_fraction),
            ChestArchetype::Conditional => {
                let others = average(
                    view.decisions
                        .iter()
                        .filter(|(id, _)| **id != agent)
                        .map(|(_, t)| *t),
                );
                let previous =
                    || view.last_round().and_then(|r| average(r.decisions.values().copied()));
                match others.or_else(previous) {
                    Some(avg) => (avg.floor() as Tokens).min(held),
                    None => fraction(self.params.cooperative_fraction),
                }
            }
        }
    }

    fn perturb(&self, shared: &mut Chest, rng: &mut dyn RandomSource) {
        *shared = self.params.chest(self.params.event_for(rng.next_unit()));
    }

    fn resolve(&self, view: &View<'_>, _rng: &mut dyn RandomSource) -> Resolution<ChestOutcome> {
        let (payoffs, outcome) = distribute(view.decisions, view.agents.len(), view.shared);
        Resolution { payoffs, outcome }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<ChestOutcome>) -> String {
        let outcome = &resolution.outcome;
        let mut text = format!(
            "Round {}: {} tokens contributed, pool multiplied by {:.1}, everyone receives {:.2}.\n",
            view.round, outcome.contributed, outcome.multiplier, outcome.share
        );
        match outcome.event {
            ChestEvent::Disaster => {
                text.push_str("A disaster halved the pool before it was shared.\n")
            }
            ChestEvent::Windfall => {
                text.push_str("A windfall grew the pool before it was shared.\n")
            }
            ChestEvent::Normal => {}
        }

        let freeriders = view.decisions.values().filter(|t| **t == 0).count();
        text.push('\n');
        if freeriders > 0 {
            text.push_str(&format!(
                "{freeriders} agent(s) gave nothing and still collected a full share. Free riding \
                 pays for the individual only while others keep contributing."
            ));
        } else {
            text.push_str(
                "Everybody contributed. The more the group gives, the larger every share grows.",
            );
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Seat;
    use crate::random::tests::ScriptedRng;
    use crate::random::SeededRng;
    use crate::session::Session;

    #[test]
    fn test_distribute_normal_round() {
        let params = ChestParams::default();
        let contributions = BTreeMap::from([(0, 10), (1, 0), (2, 5)]);
        let (payoffs, outcome) = distribute(&contributions, 3, &params.chest(ChestEvent::Normal));
        assert_eq!(outcome.pool, 15.0);
        assert_eq!(outcome.share, 7.5);
        assert_eq!(payoffs[&0], -2.5);
        assert_eq!(payoffs[&1], 7.5);
        assert_eq!(payoffs[&2], 2.5);
    }

    #[test]
    fn test_distribute_events() {
        let params = ChestParams::default();
        let contributions = BTreeMap::from([(0, 10), (1, 10)]);

        let (_, disaster) = distribute(&contributions, 2, &params.chest(ChestEvent::Disaster));
        assert_eq!(disaster.pool, 10.0);
        assert_eq!(disaster.share, 6.0);

        let (_, windfall) = distribute(&contributions, 2, &params.chest(ChestEvent::Windfall));
        assert_eq!(windfall.pool, 30.0);
        assert_eq!(windfall.share, 27.0);
    }

    #[test]
    fn test_event_draw_bands() {
        let params = ChestParams::default();
        assert_eq!(params.event_for(0.1), ChestEvent::Disaster);
        assert_eq!(params.event_for(0.5), ChestEvent::Normal);
        assert_eq!(params.event_for(0.9), ChestEvent::Windfall);
    }

    #[test]
    fn test_archetype_contributions() {
        let seats = vec![
            Seat::Synthetic(ChestArchetype::Cooperative),
            Seat::Synthetic(ChestArchetype::Freerider),
            Seat::Synthetic(ChestArchetype::Conditional),
        ];
        let game = CommunityChest::default();
        let config = game.config().clone().with_random_events(false);
        let mut s =
            Session::create(game.with_config(config), seats, SeededRng::from_u64(1)).unwrap();
        s.play_synthetic().unwrap();

        let record = &s.history()[0];
        assert_eq!(record.decision(0), Some(&70));
        assert_eq!(record.decision(1), Some(&10));
        // average of 70 and 10
        assert_eq!(record.decision(2), Some(&40));
        assert_eq!(record.outcome.share, 60.0);
        assert_eq!(s.agents()[1].score, 150.0);
    }

    #[test]
    fn test_contribution_above_holdings_rejected() {
        let seats = vec![Seat::Human, Seat::Synthetic(ChestArchetype::Cooperative)];
        let mut s =
            Session::create(CommunityChest::default(), seats, SeededRng::from_u64(1)).unwrap();
        let err = s.submit_decision(0, 101).unwrap_err();
        assert!(matches!(err, EngineError::IllegalAction { agent: 0, .. }));
        assert!(s.history().is_empty());
        s.submit_decision(0, 100).unwrap();
    }

    #[test]
    fn test_event_applied_before_resolution() {
        let seats = vec![Seat::Synthetic(ChestArchetype::Cooperative); 2];
        // first draw picks the event
        let mut s =
            Session::create(CommunityChest::default(), seats, ScriptedRng::new(&[0.05])).unwrap();
        s.play_synthetic().unwrap();
        let record = &s.history()[0];
        assert_eq!(record.outcome.event, ChestEvent::Disaster);
        assert_eq!(record.outcome.pool, 70.0);
        assert!(record.analysis.contains("disaster"));
    }

    #[test]
    fn test_event_resets_each_round() {
        let seats = vec![Seat::Synthetic(ChestArchetype::Cooperative); 2];
        let mut s =
            Session::create(CommunityChest::default(), seats, ScriptedRng::new(&[0.95])).unwrap();
        s.play_synthetic().unwrap();
        assert_eq!(s.shared().event, ChestEvent::Windfall);
        s.advance_round().unwrap();
        assert_eq!(s.shared().event, ChestEvent::Normal);
    }
}
