//! WASM bindings for the browser front end

#![cfg(feature = "wasm")]

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::agent::{Archetype, Seat};
use crate::challenge::scenarios;
use crate::game::Game;
use crate::games::community_chest::CommunityChest;
use crate::games::fair_feast::FairFeast;
use crate::games::prisoners_dilemma::{
    DilemmaArchetype, DilemmaParams, PayoffTable, PrisonersDilemma,
};
use crate::games::prisoners_network::PrisonersNetwork;
use crate::games::rpsls::Rpsls;
use crate::games::stag_hunt::StagHunt;
use crate::random::SeededRng;
use crate::session::Session;

#[derive(Serialize)]
struct ArchetypeInfo {
    id: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct GameInfo {
    id: &'static str,
    min_agents: usize,
    max_agents: usize,
    archetypes: Vec<ArchetypeInfo>,
}

fn game_info<G: Game>(game: &G) -> GameInfo {
    let count = game.config().agent_count;
    GameInfo {
        id: game.name(),
        min_agents: count.min,
        max_agents: count.max,
        archetypes: game
            .archetypes()
            .iter()
            .map(|a| ArchetypeInfo { id: a.id(), description: a.describe() })
            .collect(),
    }
}

fn all_games() -> Vec<GameInfo> {
    vec![
        game_info(&PrisonersDilemma::default()),
        game_info(&PrisonersNetwork::default()),
        game_info(&StagHunt::default()),
        game_info(&CommunityChest::default()),
        game_info(&FairFeast::default()),
        game_info(&Rpsls::default()),
    ]
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Every game with its agent bounds and synthetic archetypes
#[wasm_bindgen]
pub fn list_games() -> Result<JsValue, JsError> {
    to_js(&all_games())
}

/// Get human-readable description of an archetype within a game
#[wasm_bindgen]
pub fn describe_archetype(game: &str, archetype: &str) -> Result<String, JsError> {
    let info = all_games()
        .into_iter()
        .find(|g| g.id == game)
        .ok_or_else(|| JsError::new(&format!("Unknown game: {}", game)))?;
    info.archetypes
        .iter()
        .find(|a| a.id == archetype)
        .map(|a| a.description.to_string())
        .ok_or_else(|| JsError::new(&format!("Unknown archetype for {}: {}", game, archetype)))
}

#[derive(Deserialize)]
struct DilemmaRequest {
    seats: Vec<Seat<DilemmaArchetype>>,
    #[serde(default = "default_rounds")]
    rounds: u32,
    #[serde(default)]
    params: DilemmaParams,
}

fn default_rounds() -> u32 {
    PrisonersDilemma::DEFAULT_ROUNDS
}

/// Play a Prisoner's Dilemma between synthetic agents and return its snapshot
///
/// # Arguments
/// * `config_json` - `{"seats": [{"synthetic": "tit-for-tat"}, ...], "rounds": 10,
///   "params": {...}}`
/// * `seed` - 32-byte randomness seed
#[wasm_bindgen]
pub fn play_prisoners_dilemma(config_json: &str, seed: &[u8]) -> Result<JsValue, JsError> {
    let request: DilemmaRequest = serde_json::from_str(config_json)
        .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?;
    if request.seats.iter().any(Seat::is_human) {
        return Err(JsError::new("Replays only accept synthetic seats"));
    }

    let seed_arr: [u8; 32] = seed
        .try_into()
        .map_err(|_| JsError::new("Seed must be exactly 32 bytes"))?;

    let game = PrisonersDilemma::new(request.rounds, request.params);
    let mut session = Session::create(game, request.seats, SeededRng::new(&seed_arr, 0))
        .map_err(|e| JsError::new(&e.to_string()))?;

    while !session.phase().is_terminal() {
        session.play_synthetic().map_err(|e| JsError::new(&e.to_string()))?;
        if !session.phase().is_terminal() {
            session.advance_round().map_err(|e| JsError::new(&e.to_string()))?;
        }
    }

    to_js(&session.snapshot())
}

#[derive(Serialize)]
struct PayoffTables {
    points: PayoffTable,
    sentence_years: PayoffTable,
}

/// The two Prisoner's Dilemma payoff tables
#[wasm_bindgen]
pub fn payoff_table() -> Result<JsValue, JsError> {
    to_js(&PayoffTables {
        points: PayoffTable::points(),
        sentence_years: PayoffTable::sentence_years(),
    })
}

/// The challenge quiz catalogue
#[wasm_bindgen]
pub fn challenge_scenarios() -> Result<JsValue, JsError> {
    to_js(&scenarios())
}
