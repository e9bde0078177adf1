//! Fair Feast: an ultimatum game over a growing pizza
//!
//! Each round one proposer offers part of the pizza to a recipient. If the
//! recipient accepts, both keep their slices; if not, nobody eats. The
//! proposer role rotates and the pizza grows every round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit};
use crate::error::EngineError;
use crate::game::{Game, Resolution, RoundView};
use crate::random::RandomSource;
use crate::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeastAction {
    Offer { to: AgentId, amount: u32 },
    Accept,
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeastArchetype {
    Fair,
    Greedy,
    Random,
}

impl Archetype for FeastArchetype {
    fn id(&self) -> &'static str {
        match self {
            FeastArchetype::Fair => "fair",
            FeastArchetype::Greedy => "greedy",
            FeastArchetype::Random => "random",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FeastArchetype::Fair => "Offers half and turns down insulting offers.",
            FeastArchetype::Greedy => "Offers a single slice and takes whatever it is given.",
            FeastArchetype::Random => "Offers any amount and usually accepts.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeastParams {
    pub initial_slices: u32,
    /// Smallest share, in percent of the pizza, a fair agent accepts
    pub fair_accept_percent: u32,
    pub random_accept_chance: f64,
}

impl Default for FeastParams {
    fn default() -> Self {
        Self { initial_slices: 10, fair_accept_percent: 30, random_accept_chance: 0.8 }
    }
}

impl FeastParams {
    pub const SLICE_RANGE: std::ops::RangeInclusive<u32> = 5..=20;

    pub fn validate(&self) -> Result<(), EngineError> {
        if !Self::SLICE_RANGE.contains(&self.initial_slices) {
            return Err(EngineError::config(format!(
                "pizza must start with 5 to 20 slices, got {}",
                self.initial_slices
            )));
        }
        if self.fair_accept_percent > 100 {
            return Err(EngineError::config("fair acceptance threshold above 100%"));
        }
        Ok(())
    }
}

/// The pizza on the table and whose turn it is to share it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feast {
    pub slices: u32,
    pub proposer: AgentId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeastOutcome {
    pub slices: u32,
    pub proposer: AgentId,
    pub responder: Option<AgentId>,
    pub offer: Option<u32>,
    pub accepted: bool,
}

impl FeastOutcome {
    pub fn offer_percent(&self) -> f64 {
        match self.offer {
            Some(offer) if self.slices > 0 => f64::from(offer) * 100.0 / f64::from(self.slices),
            _ => 0.0,
        }
    }
}

/// Slices for (proposer, responder); a rejection leaves both with nothing
pub fn split(slices: u32, offer: u32, accepted: bool) -> (u32, u32) {
    if accepted {
        (slices.saturating_sub(offer), offer)
    } else {
        (0, 0)
    }
}

#[derive(Clone, Debug)]
pub struct FairFeast {
    config: GameConfig,
    params: FeastParams,
    archetypes: Vec<FeastArchetype>,
}

impl FairFeast {
    pub fn new(params: FeastParams) -> Result<Self, EngineError> {
        params.validate()?;
        Ok(Self::unchecked(params))
    }

    fn unchecked(params: FeastParams) -> Self {
        Self {
            config: GameConfig::new(PlayerCount::new(3, 5), RoundLimit::Unbounded),
            params,
            archetypes: vec![FeastArchetype::Fair, FeastArchetype::Greedy, FeastArchetype::Random],
        }
    }

    pub fn with_archetypes(mut self, archetypes: Vec<FeastArchetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn params(&self) -> &FeastParams {
        &self.params
    }
}

impl Default for FairFeast {
    fn default() -> Self {
        Self::unchecked(FeastParams::default())
    }
}

type View<'a> = RoundView<'a, FairFeast>;

fn offer_in(view: &View<'_>) -> Option<(AgentId, u32)> {
    match view.decisions.get(&view.shared.proposer) {
        Some(FeastAction::Offer { to, amount }) => Some((*to, *amount)),
        _ => None,
    }
}

impl Game for FairFeast {
    type Action = FeastAction;
    type Archetype = FeastArchetype;
    type Shared = Feast;
    type Outcome = FeastOutcome;

    fn name(&self) -> &'static str {
        "fair-feast"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[FeastArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, _agents: &[Agent<FeastArchetype>]) -> Feast {
        Feast { slices: self.params.initial_slices, proposer: 0 }
    }

    fn begin_round(
        &self,
        shared: &mut Feast,
        round: u32,
        agents: &[Agent<FeastArchetype>],
        _rng: &mut dyn RandomSource,
    ) {
        if agents.is_empty() {
            return;
        }
        if round > 1 {
            shared.slices += agents.len() as u32;
        }
        shared.proposer = (round.saturating_sub(1) as usize) % agents.len();
    }

    /// The proposer acts first, then only the recipient of the offer
    fn pending(&self, view: &View<'_>) -> Vec<AgentId> {
        let proposer = view.shared.proposer;
        if !view.decisions.contains_key(&proposer) {
            return vec![proposer];
        }
        match offer_in(view) {
            Some((to, _)) if !view.decisions.contains_key(&to) => vec![to],
            _ => Vec::new(),
        }
    }

    fn check(
        &self,
        view: &View<'_>,
        agent: AgentId,
        action: &FeastAction,
    ) -> Result<(), EngineError> {
        let Feast { slices, proposer } = *view.shared;
        match action {
            FeastAction::Offer { to, amount } => {
                if agent != proposer {
                    return Err(EngineError::illegal(agent, "only the proposer makes an offer"));
                }
                if *to == proposer || view.agent(*to).is_none() {
                    let reason = format!("agent {to} cannot receive the offer");
                    return Err(EngineError::illegal(agent, reason));
                }
                if !(1..slices).contains(amount) {
                    let most = slices.saturating_sub(1);
                    let reason = format!("offer must be between 1 and {most} slices, got {amount}");
                    return Err(EngineError::illegal(agent, reason));
                }
            }
            FeastAction::Accept | FeastAction::Reject => {
                if agent == proposer || offer_in(view).is_none() {
                    return Err(EngineError::illegal(agent, "there is no offer to respond to"));
                }
            }
        }
        Ok(())
    }

    fn decide(
        &self,
        archetype: FeastArchetype,
        agent: AgentId,
        view: &View<'_>,
        rng: &mut dyn RandomSource,
    ) -> FeastAction {
        let Feast { slices, proposer } = *view.shared;

        if agent == proposer {
            let amount = match archetype {
                FeastArchetype::Fair => (slices / 2).max(1),
                FeastArchetype::Greedy => 1,
                FeastArchetype::Random => 1 + rng.next_range(slices.saturating_sub(1)),
            };
            let to = (proposer + 1) % view.agents.len().max(1);
            return FeastAction::Offer { to, amount };
        }

        let Some((_, amount)) = offer_in(view) else {
            return FeastAction::Reject;
        };
        let accept = match archetype {
            FeastArchetype::Fair => amount * 100 >= self.params.fair_accept_percent * slices,
            FeastArchetype::Greedy => amount > 0,
            FeastArchetype::Random => rng.chance(self.params.random_accept_chance),
        };
        if accept {
            FeastAction::Accept
        } else {
            FeastAction::Reject
        }
    }

    fn resolve(&self, view: &View<'_>, _rng: &mut dyn RandomSource) -> Resolution<FeastOutcome> {
        let Feast { slices, proposer } = *view.shared;
        let mut payoffs = BTreeMap::new();

        let outcome = match offer_in(view) {
            Some((to, amount)) => {
                let accepted = view.decisions.get(&to) == Some(&FeastAction::Accept);
                let (kept, given) = split(slices, amount, accepted);
                payoffs.insert(proposer, f64::from(kept));
                payoffs.insert(to, f64::from(given));
                FeastOutcome {
                    slices,
                    proposer,
                    responder: Some(to),
                    offer: Some(amount),
                    accepted,
                }
            }
            None => FeastOutcome {
                slices,
                proposer,
                responder: None,
                offer: None,
                accepted: false,
            },
        };

        Resolution { payoffs, outcome }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<FeastOutcome>) -> String {
        let outcome = &resolution.outcome;
        let (Some(offer), Some(responder)) = (outcome.offer, outcome.responder) else {
            return format!("Round {}: no offer was made, so the pizza went uneaten.", view.round);
        };

        let percent = outcome.offer_percent();
        let mut text = format!(
            "Round {}: agent {} offered {offer} of {} slices ({percent:.1}%) to agent {responder}, who {}.\n\n",
            view.round,
            outcome.proposer,
            outcome.slices,
            if outcome.accepted { "accepted" } else { "rejected" },
        );

        let band = if percent < 30.0 {
            "A very low offer. Many people reject offers like this to punish unfairness, even though it costs them."
        } else if percent < 40.0 {
            "A low offer. It may be accepted, but it risks being seen as unfair."
        } else if percent <= 60.0 {
            "A fair offer. Splits near the middle are the ones most people accept."
        } else {
            "A generous offer. It gives away more than fairness requires."
        };
        text.push_str(band);

        if !outcome.accepted {
            text.push_str(" The rejection left both sides with nothing.");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Seat;
    use crate::random::SeededRng;
    use crate::round::Phase;
    use crate::session::Session;

    fn fair_table() -> Session<FairFeast> {
        let seats = vec![Seat::Synthetic(FeastArchetype::Fair); 3];
        Session::create(FairFeast::default(), seats, SeededRng::from_u64(11)).unwrap()
    }

    #[test]
    fn test_split() {
        assert_eq!(split(10, 3, true), (7, 3));
        assert_eq!(split(10, 3, false), (0, 0));
    }

    #[test]
    fn test_fair_agents_split_evenly() {
        let mut s = fair_table();
        s.play_synthetic().unwrap();
        let record = &s.history()[0];
        assert_eq!(record.decision(0), Some(&FeastAction::Offer { to: 1, amount: 5 }));
        assert_eq!(record.decision(1), Some(&FeastAction::Accept));
        assert_eq!(record.payoff(0), 5.0);
        assert_eq!(record.payoff(1), 5.0);
        assert!(record.decision(2).is_none());
        assert!(record.analysis.contains("fair offer"));
    }

    #[test]
    fn test_pizza_grows_and_proposer_rotates() {
        let mut s = fair_table();
        s.play_synthetic().unwrap();
        s.advance_round().unwrap();
        assert_eq!(*s.shared(), Feast { slices: 13, proposer: 1 });
        s.play_synthetic().unwrap();
        s.advance_round().unwrap();
        assert_eq!(*s.shared(), Feast { slices: 16, proposer: 2 });
        s.play_synthetic().unwrap();
        assert_eq!(s.history()[2].decision(2), Some(&FeastAction::Offer { to: 0, amount: 8 }));
    }

    #[test]
    fn test_fair_responder_rejects_greedy_offer() {
        let seats = vec![
            Seat::Synthetic(FeastArchetype::Greedy),
            Seat::Synthetic(FeastArchetype::Fair),
            Seat::Synthetic(FeastArchetype::Fair),
        ];
        let mut s = Session::create(FairFeast::default(), seats, SeededRng::from_u64(2)).unwrap();
        s.play_synthetic().unwrap();
        let record = &s.history()[0];
        assert_eq!(record.decision(1), Some(&FeastAction::Reject));
        assert_eq!(record.payoff(0), 0.0);
        assert_eq!(record.payoff(1), 0.0);
        assert!(record.analysis.contains("very low"));
    }

    #[test]
    fn test_sequential_pending() {
        let seats = vec![Seat::Human, Seat::Human, Seat::Synthetic(FeastArchetype::Fair)];
        let mut s = Session::create(FairFeast::default(), seats, SeededRng::from_u64(2)).unwrap();
        assert_eq!(s.pending(), vec![0]);

        // responding before an offer exists is out of turn
        let err = s.submit_decision(1, FeastAction::Accept).unwrap_err();
        assert!(matches!(err, EngineError::IllegalAction { agent: 1, .. }));

        s.submit_decision(0, FeastAction::Offer { to: 1, amount: 4 }).unwrap();
        assert_eq!(s.pending(), vec![1]);
        s.submit_decision(1, FeastAction::Accept).unwrap();
        assert_eq!(s.phase(), Phase::Analysis);
        assert_eq!(s.agents()[0].score, 6.0);
        assert_eq!(s.agents()[1].score, 4.0);
    }

    #[test]
    fn test_illegal_offers() {
        let seats = vec![Seat::Human, Seat::Human, Seat::Human];
        let mut s = Session::create(FairFeast::default(), seats, SeededRng::from_u64(2)).unwrap();
        for bad in [
            FeastAction::Offer { to: 1, amount: 0 },
            FeastAction::Offer { to: 1, amount: 10 },
            FeastAction::Offer { to: 0, amount: 3 },
            FeastAction::Offer { to: 7, amount: 3 },
            FeastAction::Accept,
        ] {
            let err = s.submit_decision(0, bad).unwrap_err();
            assert!(matches!(err, EngineError::IllegalAction { agent: 0, .. }), "{bad:?}");
        }
        assert_eq!(s.pending(), vec![0]);
    }

    #[test]
    fn test_initial_slices_validated() {
        let params = FeastParams { initial_slices: 4, ..FeastParams::default() };
        assert!(FairFeast::new(params).is_err());
        let params = FeastParams { initial_slices: 20, ..FeastParams::default() };
        assert!(FairFeast::new(params).is_ok());
    }

    #[test]
    fn test_end_session_stops_unbounded_feast() {
        let mut s = fair_table();
        s.play_synthetic().unwrap();
        s.end_session().unwrap();
        assert_eq!(s.phase(), Phase::Terminal);
        assert!(s.advance_round().is_err());
    }

    #[test]
    fn test_round_limit_from_config() {
        let base = FairFeast::default();
        let config = base.config().clone().with_round_limit(RoundLimit::Rounds(2));
        let seats = vec![Seat::Synthetic(FeastArchetype::Fair); 3];
        let game = base.with_config(config);
        let mut s = Session::create(game, seats, SeededRng::from_u64(4)).unwrap();

        s.play_synthetic().unwrap();
        assert_eq!(s.phase(), Phase::Analysis);
        s.advance_round().unwrap();
        s.play_synthetic().unwrap();
        assert_eq!(s.phase(), Phase::Terminal);
        assert_eq!(s.history().len(), 2);
    }
}
