//! Rock-Paper-Scissors-Lizard-Spock, played head to head

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit};
use crate::game::{Game, Resolution, RoundView};
use crate::random::RandomSource;
use crate::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
    Lizard,
    Spock,
}

impl Hand {
    pub const ALL: [Hand; 5] = [Hand::Rock, Hand::Paper, Hand::Scissors, Hand::Lizard, Hand::Spock];

    /// The two hands this one defeats
    pub fn beats(&self) -> [Hand; 2] {
        match self {
            Hand::Rock => [Hand::Scissors, Hand::Lizard],
            Hand::Paper => [Hand::Rock, Hand::Spock],
            Hand::Scissors => [Hand::Paper, Hand::Lizard],
            Hand::Lizard => [Hand::Paper, Hand::Spock],
            Hand::Spock => [Hand::Rock, Hand::Scissors],
        }
    }

    pub fn defeats(&self, other: Hand) -> bool {
        self.beats().contains(&other)
    }

    /// Hands that defeat this one
    pub fn counters(&self) -> Vec<Hand> {
        Hand::ALL.into_iter().filter(|h| h.defeats(*self)).collect()
    }

    fn random(rng: &mut dyn RandomSource) -> Hand {
        Hand::ALL[rng.next_range(Hand::ALL.len() as u32) as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandArchetype {
    Random,
    Cyclic,
    Adaptive,
}

impl Archetype for HandArchetype {
    fn id(&self) -> &'static str {
        match self {
            HandArchetype::Random => "random",
            HandArchetype::Cyclic => "cyclic",
            HandArchetype::Adaptive => "adaptive",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            HandArchetype::Random => "Throws any hand with equal odds.",
            HandArchetype::Cyclic => "Walks through the five hands in a fixed order.",
            HandArchetype::Adaptive => "Counters whatever the opponent threw last.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Showdown {
    /// `None` on a tie
    pub winner: Option<AgentId>,
}

#[derive(Clone, Debug)]
pub struct Rpsls {
    config: GameConfig,
    archetypes: Vec<HandArchetype>,
}

impl Rpsls {
    pub fn new() -> Self {
        Self {
            config: GameConfig::new(PlayerCount::new(2, 2), RoundLimit::Unbounded),
            archetypes: vec![HandArchetype::Random, HandArchetype::Cyclic, HandArchetype::Adaptive],
        }
    }

    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.config = self.config.with_round_limit(limit);
        self
    }
}

impl Default for Rpsls {
    fn default() -> Self {
        Self::new()
    }
}

type View<'a> = RoundView<'a, Rpsls>;

impl Game for Rpsls {
    type Action = Hand;
    type Archetype = HandArchetype;
    type Shared = ();
    type Outcome = Showdown;

    fn name(&self) -> &'static str {
        "rpsls"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[HandArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, _agents: &[Agent<HandArchetype>]) {}

    fn decide(
        &self,
        archetype: HandArchetype,
        agent: AgentId,
        view: &View<'_>,
        rng: &mut dyn RandomSource,
    ) -> Hand {
        match archetype {
            HandArchetype::Random => Hand::random(rng),
            HandArchetype::Cyclic => Hand::ALL[view.history.len() % Hand::ALL.len()],
            HandArchetype::Adaptive => {
                let last = view.last_round().and_then(|r| {
                    r.decisions.iter().find(|(id, _)| **id != agent).map(|(_, h)| *h)
                });
                match last {
                    Some(hand) => {
                        let counters = hand.counters();
                        counters[rng.next_range(counters.len() as u32) as usize]
                    }
                    None => Hand::random(rng),
                }
            }
        }
    }

    fn resolve(&self, view: &View<'_>, _rng: &mut dyn RandomSource) -> Resolution<Showdown> {
        let hands: Vec<(AgentId, Hand)> = view.decisions.iter().map(|(id, h)| (*id, *h)).collect();
        let winner = match hands.as_slice() {
            [(a, ha), (_, hb)] if ha.defeats(*hb) => Some(*a),
            [(_, ha), (b, hb)] if hb.defeats(*ha) => Some(*b),
            _ => None,
        };

        let payoffs: BTreeMap<AgentId, f64> = hands
            .iter()
            .map(|(id, _)| (*id, if winner == Some(*id) { 1.0 } else { 0.0 }))
            .collect();

        Resolution { payoffs, outcome: Showdown { winner } }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<Showdown>) -> String {
        let thrown: Vec<String> = view
            .decisions
            .iter()
            .map(|(id, hand)| format!("agent {id} threw {hand:?}"))
            .collect();
        let verdict = match resolution.outcome.winner {
            Some(id) => format!("agent {id} wins the round"),
            None => "the round is a tie".to_string(),
        };
        format!(
            "Round {}: {}; {verdict}. Every hand beats two others and loses to two, so no \
             single throw is safe and a predictable opponent is an exploitable one.",
            view.round,
            thrown.join(", ")
        )
    }
}
