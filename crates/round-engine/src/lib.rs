//! Round Engine for the Game Theory Arcade
//!
//! A generic engine for small round-based strategy games played between a
//! human and synthetic agents. Each game supplies its rules through the
//! [`Game`] trait; a [`Session`] runs the phases, collects decisions, applies
//! payoffs and keeps history.
//!
//! This crate is compiled to:
//! - Native (for tests and tooling)
//! - WASM (for the browser front end, behind the `wasm` feature)

mod agent;
mod challenge;
mod config;
mod error;
mod favorites;
mod game;
mod random;
mod round;
mod session;
mod timer;

/// The concrete mini-games, one module each
pub mod games;

#[cfg(feature = "wasm")]
mod wasm;

/// Agents are numbered by seat, starting at 0
pub type AgentId = usize;

pub use agent::{human_versus_random, Agent, Archetype, Seat};
pub use challenge::{scenarios, ChallengeRun, Feedback, Scenario};
pub use config::{GameConfig, PlayerCount, RoundLimit, ScoreOrder};
pub use error::EngineError;
pub use favorites::{Favorites, FavoritesError, KeyValueStore, MemoryStore, FAVORITES_KEY};
pub use game::{Game, Resolution, RoundView};
pub use random::{RandomSource, SeededRng};
pub use round::{ActiveRound, Phase, RoundController, RoundRecord};
pub use session::{Session, SessionSnapshot, Snapshot, Standing};
pub use timer::{RoundId, TimerKind, TimerOutcome, TimerTicket};
