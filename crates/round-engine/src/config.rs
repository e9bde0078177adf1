//! Per-game configuration shared by every mini-game

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Inclusive bounds on the number of agents a game accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub min: usize,
    pub max: usize,
}

impl PlayerCount {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// How long a session runs before it becomes terminal on its own
///
/// Serialized as a plain round count or the string `"until-exhausted"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoundLimitRepr", into = "RoundLimitRepr")]
pub enum RoundLimit {
    Rounds(u32),
    /// Runs until stopped from outside via `end_session`
    Unbounded,
}

impl RoundLimit {
    /// Whether `round` is the last round this limit allows
    pub fn is_last(&self, round: u32) -> bool {
        match self {
            RoundLimit::Rounds(max) => round >= *max,
            RoundLimit::Unbounded => false,
        }
    }
}

const UNTIL_EXHAUSTED: &str = "until-exhausted";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RoundLimitRepr {
    Rounds(u32),
    Keyword(String),
}

impl TryFrom<RoundLimitRepr> for RoundLimit {
    type Error = String;

    fn try_from(repr: RoundLimitRepr) -> Result<Self, Self::Error> {
        match repr {
            RoundLimitRepr::Rounds(n) => Ok(RoundLimit::Rounds(n)),
            RoundLimitRepr::Keyword(k) if k == UNTIL_EXHAUSTED => Ok(RoundLimit::Unbounded),
            RoundLimitRepr::Keyword(k) => Err(format!("unknown round limit `{}`", k)),
        }
    }
}

impl From<RoundLimit> for RoundLimitRepr {
    fn from(limit: RoundLimit) -> Self {
        match limit {
            RoundLimit::Rounds(n) => RoundLimitRepr::Rounds(n),
            RoundLimit::Unbounded => RoundLimitRepr::Keyword(UNTIL_EXHAUSTED.to_string()),
        }
    }
}

/// Direction in which scores are ranked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreOrder {
    #[default]
    HigherIsBetter,
    /// Prison sentences: the shortest wins
    LowerIsBetter,
}

/// Configuration common to every round-based game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub agent_count: PlayerCount,
    pub round_limit: RoundLimit,
    #[serde(default)]
    pub random_event_enabled: bool,
    #[serde(default)]
    pub starting_score: f64,
    #[serde(default)]
    pub score_order: ScoreOrder,
    /// Cosmetic pause before a synthetic decision is shown
    #[serde(default = "default_think_delay")]
    pub think_delay_ms: u32,
    /// Round countdown, if the game plays against the clock
    #[serde(default)]
    pub countdown_secs: Option<u32>,
}

fn default_think_delay() -> u32 {
    1000
}

impl GameConfig {
    /// Baseline: bounded player count, open-ended rounds, no events
    pub fn new(agent_count: PlayerCount, round_limit: RoundLimit) -> Self {
        Self {
            agent_count,
            round_limit,
            random_event_enabled: false,
            starting_score: 0.0,
            score_order: ScoreOrder::HigherIsBetter,
            think_delay_ms: default_think_delay(),
            countdown_secs: None,
        }
    }

    pub fn with_starting_score(mut self, score: f64) -> Self {
        self.starting_score = score;
        self
    }

    pub fn with_score_order(mut self, order: ScoreOrder) -> Self {
        self.score_order = order;
        self
    }

    pub fn with_random_events(mut self, enabled: bool) -> Self {
        self.random_event_enabled = enabled;
        self
    }

    pub fn with_countdown(mut self, secs: u32) -> Self {
        self.countdown_secs = Some(secs);
        self
    }

    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.round_limit = limit;
        self
    }

    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let PlayerCount { min, max } = self.agent_count;
        if min == 0 || min > max {
            return Err(EngineError::config(format!(
                "agent count range {}..={} is empty",
                min, max
            )));
        }
        if self.round_limit == RoundLimit::Rounds(0) {
            return Err(EngineError::config("round limit must be at least 1"));
        }
        if !self.starting_score.is_finite() {
            return Err(EngineError::config("starting score must be finite"));
        }
        Ok(())
    }

    /// Reject agent rosters outside the declared bounds
    pub fn check_agent_count(&self, count: usize) -> Result<(), EngineError> {
        if self.agent_count.contains(count) {
            Ok(())
        } else {
            Err(EngineError::config(format!(
                "agent count {} outside {}..={}",
                count, self.agent_count.min, self.agent_count.max
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_count_bounds() {
        let range = PlayerCount::new(2, 4);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_round_limit_is_last() {
        assert!(!RoundLimit::Rounds(3).is_last(2));
        assert!(RoundLimit::Rounds(3).is_last(3));
        assert!(!RoundLimit::Unbounded.is_last(u32::MAX));
    }

    #[test]
    fn test_round_limit_json_forms() {
        let limit: RoundLimit = serde_json::from_str("10").unwrap();
        assert_eq!(limit, RoundLimit::Rounds(10));

        let limit: RoundLimit = serde_json::from_str("\"until-exhausted\"").unwrap();
        assert_eq!(limit, RoundLimit::Unbounded);

        assert_eq!(serde_json::to_string(&RoundLimit::Unbounded).unwrap(), "\"until-exhausted\"");
        assert!(serde_json::from_str::<RoundLimit>("\"forever\"").is_err());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let json = r#"{"agent_count": {"min": 2, "max": 4}, "round_limit": 5}"#;
        let config = GameConfig::from_json(json).unwrap();
        assert_eq!(config.round_limit, RoundLimit::Rounds(5));
        assert_eq!(config.think_delay_ms, 1000);
        assert_eq!(config.score_order, ScoreOrder::HigherIsBetter);
        assert!(!config.random_event_enabled);
        assert_eq!(config.countdown_secs, None);
    }

    #[test]
    fn test_from_json_rejects_empty_range() {
        let json = r#"{"agent_count": {"min": 5, "max": 2}, "round_limit": 5}"#;
        assert!(matches!(
            GameConfig::from_json(json),
            Err(EngineError::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let config = GameConfig::new(PlayerCount::new(2, 2), RoundLimit::Rounds(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_agent_count() {
        let config = GameConfig::new(PlayerCount::new(3, 5), RoundLimit::Unbounded);
        assert!(config.check_agent_count(3).is_ok());
        assert!(config.check_agent_count(6).is_err());
    }
}
