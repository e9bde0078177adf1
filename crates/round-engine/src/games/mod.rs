//! The six round-based games built on the engine

pub mod community_chest;
pub mod fair_feast;
pub mod prisoners_dilemma;
pub mod prisoners_network;
pub mod rpsls;
pub mod stag_hunt;
