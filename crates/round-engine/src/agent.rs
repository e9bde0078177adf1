//! Agents and the seats they occupy

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::random::RandomSource;
use crate::AgentId;

/// A named synthetic decision strategy
///
/// Implemented by each game's archetype enum, so the legal set is closed at
/// compile time and dispatch is a `match` rather than a string lookup.
pub trait Archetype: Copy + Eq + Debug + Serialize + DeserializeOwned {
    /// Stable kebab-case identifier, e.g. `tit-for-tat`
    fn id(&self) -> &'static str;

    /// One-line human-readable description
    fn describe(&self) -> &'static str;
}

/// Who makes an agent's decisions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seat<A> {
    /// Decisions arrive from outside (the player)
    Human,
    /// Decisions come from the archetype's policy
    Synthetic(A),
}

impl<A: Archetype> Seat<A> {
    pub fn is_human(&self) -> bool {
        matches!(self, Seat::Human)
    }

    pub fn archetype(&self) -> Option<A> {
        match self {
            Seat::Human => None,
            Seat::Synthetic(a) => Some(*a),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Seat::Human => "human",
            Seat::Synthetic(a) => a.id(),
        }
    }

    /// Pick a synthetic seat uniformly from `archetypes`
    pub fn random(archetypes: &[A], rng: &mut dyn RandomSource) -> Option<Self> {
        if archetypes.is_empty() {
            return None;
        }
        let index = rng.next_range(archetypes.len() as u32) as usize;
        Some(Seat::Synthetic(archetypes[index]))
    }
}

/// Standard table: one human in seat 0, everyone else drawn at random
pub fn human_versus_random<A: Archetype>(
    count: usize,
    archetypes: &[A],
    rng: &mut dyn RandomSource,
) -> Result<Vec<Seat<A>>, EngineError> {
    if count == 0 {
        return Err(EngineError::config("a table needs at least one seat"));
    }
    let mut seats = Vec::with_capacity(count);
    seats.push(Seat::Human);
    for _ in 1..count {
        let seat = Seat::random(archetypes, rng)
            .ok_or_else(|| EngineError::config("no archetypes to draw synthetic seats from"))?;
        seats.push(seat);
    }
    Ok(seats)
}

/// A participant in a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent<A> {
    pub id: AgentId,
    pub seat: Seat<A>,
    /// Running score: starting score plus every payoff attributed so far
    pub score: f64,
}

impl<A: Archetype> Agent<A> {
    pub fn new(id: AgentId, seat: Seat<A>, starting_score: f64) -> Self {
        Self { id, seat, score: starting_score }
    }

    pub fn is_human(&self) -> bool {
        self.seat.is_human()
    }
}
