//! Prisoner's Network: a many-player dilemma played inside cell blocks
//!
//! Prisoners start with a sentence and try to shorten it. How much a choice
//! is worth depends on how many block mates cooperated in the same round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit, ScoreOrder};
use crate::game::{Game, Resolution, RoundView};
use crate::games::prisoners_dilemma::Move;
use crate::random::RandomSource;
use crate::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellBlock {
    A,
    B,
    C,
    D,
}

impl CellBlock {
    pub const ALL: [CellBlock; 4] = [CellBlock::A, CellBlock::B, CellBlock::C, CellBlock::D];
}

/// Contiguous block assignment: pairs while there are enough blocks,
/// larger groups once all four are in use
pub fn assign_blocks(count: usize) -> Vec<CellBlock> {
    if count == 0 {
        return Vec::new();
    }
    let blocks = count.div_ceil(2).min(CellBlock::ALL.len());
    (0..count).map(|i| CellBlock::ALL[i * blocks / count]).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkArchetype {
    Loyal,
    Selfish,
    Adaptive,
    Random,
}

impl Archetype for NetworkArchetype {
    fn id(&self) -> &'static str {
        match self {
            NetworkArchetype::Loyal => "loyal",
            NetworkArchetype::Selfish => "selfish",
            NetworkArchetype::Adaptive => "adaptive",
            NetworkArchetype::Random => "random",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            NetworkArchetype::Loyal => "Always cooperates with the block.",
            NetworkArchetype::Selfish => "Always defects.",
            NetworkArchetype::Adaptive => "Cooperates as often as its block mates do.",
            NetworkArchetype::Random => "Flips a coin each round.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub starting_sentence: f64,
    /// Sentence cut for a cooperator in a fully cooperative block
    pub cooperate_weight: f64,
    /// Sentence cut for a defector in a fully cooperative block
    pub defect_weight: f64,
    /// Sentence added to a defector when nobody in the block cooperated
    pub isolation_penalty: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            starting_sentence: 10.0,
            cooperate_weight: 2.0,
            defect_weight: 1.0,
            isolation_penalty: 1.0,
        }
    }
}

impl NetworkParams {
    /// Raw sentence change for one prisoner, before the floor at zero
    pub fn sentence_change(&self, action: Move, cooperators: usize, block_size: usize) -> f64 {
        let rate = if block_size == 0 { 0.0 } else { cooperators as f64 / block_size as f64 };
        match action {
            Move::Cooperate => -self.cooperate_weight * rate,
            Move::Defect if cooperators == 0 => self.isolation_penalty,
            Move::Defect => -self.defect_weight * rate,
        }
    }
}

/// Which block every prisoner sits in, by agent id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMap {
    pub blocks: Vec<CellBlock>,
}

impl NetworkMap {
    pub fn block_of(&self, agent: AgentId) -> Option<CellBlock> {
        self.blocks.get(agent).copied()
    }

    pub fn members(&self, block: CellBlock) -> impl Iterator<Item = AgentId> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| **b == block)
            .map(|(id, _)| id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub block: CellBlock,
    pub cooperation_rate: f64,
    pub average_change: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkOutcome {
    /// Unfloored change per prisoner
    pub sentence_change: BTreeMap<AgentId, f64>,
    pub blocks: Vec<BlockSummary>,
}

#[derive(Clone, Debug)]
pub struct PrisonersNetwork {
    config: GameConfig,
    params: NetworkParams,
    archetypes: Vec<NetworkArchetype>,
}

impl PrisonersNetwork {
    pub fn new(params: NetworkParams) -> Self {
        let config = GameConfig::new(PlayerCount::new(4, 12), RoundLimit::Unbounded)
            .with_starting_score(params.starting_sentence)
            .with_score_order(ScoreOrder::LowerIsBetter);
        Self {
            config,
            params,
            archetypes: vec![
                NetworkArchetype::Loyal,
                NetworkArchetype::Selfish,
                NetworkArchetype::Adaptive,
                NetworkArchetype::Random,
            ],
        }
    }

    pub fn with_archetypes(mut self, archetypes: Vec<NetworkArchetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for PrisonersNetwork {
    fn default() -> Self {
        Self::new(NetworkParams::default())
    }
}

type View<'a> = RoundView<'a, PrisonersNetwork>;

fn cooperation_rate<'a>(moves: impl Iterator<Item = &'a Move>) -> Option<f64> {
    let (cooperated, total) = moves.fold((0usize, 0usize), |(c, t), m| {
        (c + usize::from(*m == Move::Cooperate), t + 1)
    });
    (total > 0).then(|| cooperated as f64 / total as f64)
}

fn adaptive(view: &View<'_>, me: AgentId, rng: &mut dyn RandomSource) -> Move {
    let Some(block) = view.shared.block_of(me) else {
        return Move::Cooperate;
    };
    let mates: Vec<AgentId> = view.shared.members(block).filter(|id| *id != me).collect();

    let current = cooperation_rate(mates.iter().filter_map(|id| view.decisions.get(id)));
    let previous = || {
        view.last_round().and_then(|last| {
            cooperation_rate(view.shared.members(block).filter_map(|id| last.decision(id)))
        })
    };

    match current.or_else(previous) {
        None => Move::Cooperate,
        Some(rate) if rng.chance(rate) => Move::Cooperate,
        Some(_) => Move::Defect,
    }
}

impl Game for PrisonersNetwork {
    type Action = Move;
    type Archetype = NetworkArchetype;
    type Shared = NetworkMap;
    type Outcome = NetworkOutcome;

    fn name(&self) -> &'static str {
        "prisoners-network"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[NetworkArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, agents: &[Agent<NetworkArchetype>]) -> NetworkMap {
        NetworkMap { blocks: assign_blocks(agents.len()) }
    }

    fn decide(
        &self,
        archetype: NetworkArchetype,
        agent: AgentId,
        view: &View<'_>,
        rng: &mut dyn RandomSource,
    ) -> Move {
        match archetype {
            NetworkArchetype::Loyal => Move::Cooperate,
            NetworkArchetype::Selfish => Move::Defect,
            NetworkArchetype::Adaptive => adaptive(view, agent, rng),
            NetworkArchetype::Random => {
                if rng.chance(0.5) {
                    Move::Cooperate
                } else {
                    Move::Defect
                }
            }
        }
    }

    fn resolve(&self, view: &View<'_>, _rng: &mut dyn RandomSource) -> Resolution<NetworkOutcome> {
        let mut sentence_change = BTreeMap::new();
        let mut payoffs = BTreeMap::new();
        let mut blocks = Vec::new();

        for block in CellBlock::ALL {
            let members: Vec<AgentId> = view.shared.members(block).collect();
            if members.is_empty() {
                continue;
            }
            let cooperators = members
                .iter()
                .filter(|id| view.decisions.get(*id) == Some(&Move::Cooperate))
                .count();

            let mut applied_total = 0.0;
            for id in &members {
                let Some(action) = view.decisions.get(id) else {
                    continue;
                };
                let raw = self.params.sentence_change(*action, cooperators, members.len());
                let current = view.agent(*id).map_or(0.0, |a| a.score);
                let applied = (current + raw).max(0.0) - current;
                sentence_change.insert(*id, raw);
                payoffs.insert(*id, applied);
                applied_total += applied;
            }

            blocks.push(BlockSummary {
                block,
                cooperation_rate: cooperators as f64 / members.len() as f64,
                average_change: applied_total / members.len() as f64,
            });
        }

        Resolution { payoffs, outcome: NetworkOutcome { sentence_change, blocks } }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<NetworkOutcome>) -> String {
        let mut text = format!("Round {} results:\n\n", view.round);
        for summary in &resolution.outcome.blocks {
            text.push_str(&format!(
                "Cell Block {:?}:\nCooperation rate: {:.2}%\nAverage sentence change: {:.2}\n\n",
                summary.block,
                summary.cooperation_rate * 100.0,
                summary.average_change
            ));
        }
        text.push_str(
            "Each block is its own small network: one prisoner's choice changes what \
             cooperation is worth to everyone sharing the block, and short-term gain from \
             defecting is paid for by the group.",
        );
        text
    }
}
