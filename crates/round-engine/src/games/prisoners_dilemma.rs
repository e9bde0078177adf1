//! Iterated Prisoner's Dilemma for two to four agents
//!
//! Every agent plays the 2×2 game against every other agent each round and
//! collects the sum of those pairwise payoffs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit};
use crate::game::{Game, Resolution, RoundView};
use crate::random::RandomSource;
use crate::AgentId;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    pub fn flipped(self) -> Self {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }
}

/// Symmetric 2×2 payoff table
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoffTable {
    /// Both cooperate
    pub reward: f64,
    /// Cooperated against a defector
    pub sucker: f64,
    /// Defected against a cooperator
    pub temptation: f64,
    /// Both defect
    pub punishment: f64,
}

impl PayoffTable {
    /// Classic points scoring: 3 / 0 / 5 / 1
    pub const fn points() -> Self {
        Self { reward: 3.0, sucker: 0.0, temptation: 5.0, punishment: 1.0 }
    }

    /// Years in prison, as negative scores: -1 / -3 / 0 / -2
    pub const fn sentence_years() -> Self {
        Self { reward: -1.0, sucker: -3.0, temptation: 0.0, punishment: -2.0 }
    }

    /// Returns (score_a, score_b)
    pub fn payoff(&self, a: Move, b: Move) -> (f64, f64) {
        match (a, b) {
            (Move::Cooperate, Move::Cooperate) => (self.reward, self.reward),
            (Move::Cooperate, Move::Defect) => (self.sucker, self.temptation),
            (Move::Defect, Move::Cooperate) => (self.temptation, self.sucker),
            (Move::Defect, Move::Defect) => (self.punishment, self.punishment),
        }
    }
}

impl Default for PayoffTable {
    fn default() -> Self {
        Self::points()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DilemmaArchetype {
    /// Always defect: the single-round dominant move.
    Rational,
    /// Random choice each round.
    Random,
    /// Cooperate as often as the others have.
    Adaptive,
    /// Copy the opponents' last move. Start with cooperate.
    TitForTat,
    /// Cooperate until any opponent defects once, then always defect.
    GrimTrigger,
    /// Win-stay, lose-switch.
    Pavlov,
    /// Defect only if an opponent defected twice in a row.
    TitForTwoTats,
}

impl Archetype for DilemmaArchetype {
    fn id(&self) -> &'static str {
        match self {
            DilemmaArchetype::Rational => "rational",
            DilemmaArchetype::Random => "random",
            DilemmaArchetype::Adaptive => "adaptive",
            DilemmaArchetype::TitForTat => "tit-for-tat",
            DilemmaArchetype::GrimTrigger => "grim-trigger",
            DilemmaArchetype::Pavlov => "pavlov",
            DilemmaArchetype::TitForTwoTats => "tit-for-two-tats",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            DilemmaArchetype::Rational => "Never cooperates. Defection wins any single round.",
            DilemmaArchetype::Random => "Randomly cooperates or defects each round.",
            DilemmaArchetype::Adaptive => "Cooperates about as often as everyone else has so far.",
            DilemmaArchetype::TitForTat => {
                "Copies the opponents' last move. Starts by cooperating."
            }
            DilemmaArchetype::GrimTrigger => "Cooperates until betrayed, then always defects.",
            DilemmaArchetype::Pavlov => {
                "Repeats its move if the outcome was good, switches if bad."
            }
            DilemmaArchetype::TitForTwoTats => "Only retaliates after two consecutive defections.",
        }
    }
}

/// Tunable constants
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DilemmaParams {
    pub table: PayoffTable,
    /// Percentage chance the `random` archetype cooperates (0-100)
    pub cooperate_bias: u8,
}

impl Default for DilemmaParams {
    fn default() -> Self {
        Self { table: PayoffTable::points(), cooperate_bias: 50 }
    }
}

/// Per-round summary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DilemmaOutcome {
    pub cooperators: Vec<AgentId>,
    pub defectors: Vec<AgentId>,
    /// Highest earners this round
    pub leaders: Vec<AgentId>,
}

#[derive(Clone, Debug)]
pub struct PrisonersDilemma {
    config: GameConfig,
    params: DilemmaParams,
    archetypes: Vec<DilemmaArchetype>,
}

impl PrisonersDilemma {
    pub const DEFAULT_ROUNDS: u32 = 10;

    pub fn new(rounds: u32, params: DilemmaParams) -> Self {
        Self {
            config: GameConfig::new(PlayerCount::new(2, 4), RoundLimit::Rounds(rounds)),
            params,
            archetypes: vec![
                DilemmaArchetype::Rational,
                DilemmaArchetype::Random,
                DilemmaArchetype::Adaptive,
                DilemmaArchetype::TitForTat,
                DilemmaArchetype::GrimTrigger,
                DilemmaArchetype::Pavlov,
                DilemmaArchetype::TitForTwoTats,
            ],
        }
    }

    pub fn with_rounds(rounds: u32) -> Self {
        Self::new(rounds, DilemmaParams::default())
    }

    /// Restrict which archetypes may be seated
    pub fn with_archetypes(mut self, archetypes: Vec<DilemmaArchetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    /// Replace the engine configuration (e.g. loaded from JSON)
    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn params(&self) -> &DilemmaParams {
        &self.params
    }
}

impl Default for PrisonersDilemma {
    fn default() -> Self {
        Self::with_rounds(Self::DEFAULT_ROUNDS)
    }
}

type View<'a> = RoundView<'a, PrisonersDilemma>;

/// Moves the other agents made in a past round
fn opponent_moves(view: &View<'_>, me: AgentId, rounds_back: usize) -> Option<Vec<Move>> {
    let len = view.history.len();
    if rounds_back == 0 || rounds_back > len {
        return None;
    }
    let record = &view.history[len - rounds_back];
    Some(
        record
            .decisions
            .iter()
            .filter(|(id, _)| **id != me)
            .map(|(_, m)| *m)
            .collect(),
    )
}

fn tit_for_tat(view: &View<'_>, me: AgentId) -> Move {
    match opponent_moves(view, me, 1) {
        None => Move::Cooperate,
        Some(moves) if moves.iter().all(|m| *m == Move::Cooperate) => Move::Cooperate,
        Some(_) => Move::Defect,
    }
}

fn adaptive(view: &View<'_>, me: AgentId, rng: &mut dyn RandomSource) -> Move {
    let (cooperated, total) = view
        .history
        .iter()
        .flat_map(|r| r.decisions.iter())
        .filter(|(id, _)| **id != me)
        .fold((0usize, 0usize), |(c, t), (_, m)| {
            (c + usize::from(*m == Move::Cooperate), t + 1)
        });
    if total == 0 {
        return Move::Cooperate;
    }
    if rng.chance(cooperated as f64 / total as f64) {
        Move::Cooperate
    } else {
        Move::Defect
    }
}

fn grim_trigger(view: &View<'_>, me: AgentId) -> Move {
    let betrayed = view
        .history
        .iter()
        .flat_map(|r| r.decisions.iter())
        .any(|(id, m)| *id != me && *m == Move::Defect);
    if betrayed {
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Win-stay, lose-switch
/// - a round at least as good as mutual cooperation: repeat
/// - anything worse: switch
fn pavlov(view: &View<'_>, me: AgentId, table: &PayoffTable) -> Move {
    let Some(last) = view.last_round() else {
        return Move::Cooperate;
    };
    let Some(my_last) = last.decision(me).copied() else {
        return Move::Cooperate;
    };
    let opponents = last.decisions.len().saturating_sub(1).max(1) as f64;
    if last.payoff(me) >= table.reward * opponents {
        my_last
    } else {
        my_last.flipped()
    }
}

fn tit_for_two_tats(view: &View<'_>, me: AgentId) -> Move {
    let (Some(last), Some(before)) = (view.history.last(), view.history.iter().rev().nth(1)) else {
        return Move::Cooperate;
    };
    let twice = last.decisions.iter().any(|(id, m)| {
        *id != me && *m == Move::Defect && before.decision(*id) == Some(&Move::Defect)
    });
    if twice {
        Move::Defect
    } else {
        Move::Cooperate
    }
}

impl Game for PrisonersDilemma {
    type Action = Move;
    type Archetype = DilemmaArchetype;
    type Shared = ();
    type Outcome = DilemmaOutcome;

    fn name(&self) -> &'static str {
        "prisoners-dilemma"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[DilemmaArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, _agents: &[Agent<DilemmaArchetype>]) {}

    fn decide(
        &self,
        archetype: DilemmaArchetype,
        agent: AgentId,
        view: &View<'_>,
        rng: &mut dyn RandomSource,
    ) -> Move {
        match archetype {
            DilemmaArchetype::Rational => Move::Defect,
            DilemmaArchetype::Random => {
                if rng.next_percent() < self.params.cooperate_bias {
                    Move::Cooperate
                } else {
                    Move::Defect
                }
            }
            DilemmaArchetype::Adaptive => adaptive(view, agent, rng),
            DilemmaArchetype::TitForTat => tit_for_tat(view, agent),
            DilemmaArchetype::GrimTrigger => grim_trigger(view, agent),
            DilemmaArchetype::Pavlov => pavlov(view, agent, &self.params.table),
            DilemmaArchetype::TitForTwoTats => tit_for_two_tats(view, agent),
        }
    }

    fn resolve(&self, view: &View<'_>, _rng: &mut dyn RandomSource) -> Resolution<DilemmaOutcome> {
        let payoffs = resolve_pairwise(view.decisions, &self.params.table);

        let best = payoffs.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let leaders = payoffs
            .iter()
            .filter(|(_, p)| **p == best)
            .map(|(id, _)| *id)
            .collect();
        let (cooperators, defectors) = view
            .decisions
            .iter()
            .partition::<Vec<_>, _>(|(_, m)| **m == Move::Cooperate);

        Resolution {
            payoffs,
            outcome: DilemmaOutcome {
                cooperators: cooperators.into_iter().map(|(id, _)| *id).collect(),
                defectors: defectors.into_iter().map(|(id, _)| *id).collect(),
                leaders,
            },
        }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<DilemmaOutcome>) -> String {
        let outcome = &resolution.outcome;
        let mut text = if outcome.defectors.is_empty() {
            "Everyone cooperated and everyone came out ahead. Mutual cooperation is what \
             repeated play can sustain."
                .to_string()
        } else if outcome.cooperators.is_empty() {
            "Everyone defected and everyone did worse than they could have. Individually \
             rational choices added up to a collectively poor result."
                .to_string()
        } else {
            let leaders: Vec<String> =
                outcome.leaders.iter().map(|id| format!("Player {}", id + 1)).collect();
            format!(
                "{} defected while others cooperated. Top of the round: {}. Defection pays now, \
                 but think about what it does to the rounds that follow.",
                if outcome.defectors.len() > 1 { "Some players" } else { "One player" },
                leaders.join(", ")
            )
        };

        text.push_str(&format!("\n\nWith {} players, ", view.agents.len()));
        text.push_str(match view.agents.len() {
            2 => "each decision lands directly on the other player; the dilemma is at its purest.",
            3 => "coalitions become possible: two players can cooperate against the third.",
            _ => "group dynamics take over and any single decision is felt less directly.",
        });
        text
    }
}

/// Sum of pairwise payoffs against every other decided agent
pub fn resolve_pairwise(
    decisions: &BTreeMap<AgentId, Move>,
    table: &PayoffTable,
) -> BTreeMap<AgentId, f64> {
    decisions
        .iter()
        .map(|(me, mine)| {
            let total = decisions
                .iter()
                .filter(|(other, _)| *other != me)
                .map(|(_, theirs)| table.payoff(*mine, *theirs).0)
                .sum();
            (*me, total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Seat;
    use crate::random::SeededRng;
    use crate::round::Phase;
    use crate::session::Session;

    fn session(seats: Vec<Seat<DilemmaArchetype>>, rounds: u32) -> Session<PrisonersDilemma> {
        let game = PrisonersDilemma::with_rounds(rounds);
        Session::create(game, seats, SeededRng::from_u64(42)).unwrap()
    }

    fn bots(a: DilemmaArchetype, b: DilemmaArchetype) -> Vec<Seat<DilemmaArchetype>> {
        vec![Seat::Synthetic(a), Seat::Synthetic(b)]
    }

    fn play_out(session: &mut Session<PrisonersDilemma>) {
        loop {
            session.play_synthetic().unwrap();
            if session.phase() != Phase::Analysis {
                break;
            }
            session.advance_round().unwrap();
        }
    }

    #[test]
    fn test_payoff_matrix() {
        let t = PayoffTable::points();
        assert_eq!(t.payoff(Move::Cooperate, Move::Cooperate), (3.0, 3.0));
        assert_eq!(t.payoff(Move::Cooperate, Move::Defect), (0.0, 5.0));
        assert_eq!(t.payoff(Move::Defect, Move::Cooperate), (5.0, 0.0));
        assert_eq!(t.payoff(Move::Defect, Move::Defect), (1.0, 1.0));
    }

    #[test]
    fn test_sentence_table() {
        let t = PayoffTable::sentence_years();
        assert_eq!(t.payoff(Move::Cooperate, Move::Defect), (-3.0, 0.0));
        assert_eq!(t.payoff(Move::Defect, Move::Defect), (-2.0, -2.0));
    }

    #[test]
    fn test_pairwise_three_players() {
        let decisions =
            BTreeMap::from([(0, Move::Cooperate), (1, Move::Cooperate), (2, Move::Defect)]);
        let payoffs = resolve_pairwise(&decisions, &PayoffTable::points());
        assert_eq!(payoffs[&0], 3.0);
        assert_eq!(payoffs[&1], 3.0);
        assert_eq!(payoffs[&2], 10.0);
    }

    #[test]
    fn test_tft_vs_tft_three_rounds() {
        let mut s = session(bots(DilemmaArchetype::TitForTat, DilemmaArchetype::TitForTat), 3);
        play_out(&mut s);
        assert_eq!(s.phase(), Phase::Terminal);
        assert_eq!(s.history().len(), 3);
        for record in s.history() {
            assert_eq!(record.decision(0), Some(&Move::Cooperate));
            assert_eq!(record.decision(1), Some(&Move::Cooperate));
        }
        assert_eq!(s.agents()[0].score, 9.0);
        assert_eq!(s.agents()[1].score, 9.0);
    }

    #[test]
    fn test_tft_vs_rational() {
        let mut s = session(bots(DilemmaArchetype::TitForTat, DilemmaArchetype::Rational), 5);
        play_out(&mut s);

        let first = &s.history()[0];
        assert_eq!(first.decision(0), Some(&Move::Cooperate));
        assert_eq!(first.decision(1), Some(&Move::Defect));
        for record in s.history().iter().skip(1) {
            assert_eq!(record.decision(0), Some(&Move::Defect));
        }
        assert_eq!(s.agents()[0].score, 0.0 + 4.0);
        assert_eq!(s.agents()[1].score, 5.0 + 4.0);
    }

    #[test]
    fn test_grim_trigger_never_forgives() {
        let mut s = session(
            vec![Seat::Synthetic(DilemmaArchetype::GrimTrigger), Seat::Human],
            4,
        );
        s.submit_decision(1, Move::Defect).unwrap();
        s.play_synthetic().unwrap();
        for _ in 0..3 {
            s.advance_round().unwrap();
            s.submit_decision(1, Move::Cooperate).unwrap();
            s.play_synthetic().unwrap();
        }
        assert_eq!(s.history()[0].decision(0), Some(&Move::Cooperate));
        for record in &s.history()[1..] {
            assert_eq!(record.decision(0), Some(&Move::Defect));
        }
    }

    #[test]
    fn test_pavlov_win_stay_lose_switch() {
        let mut s = session(vec![Seat::Synthetic(DilemmaArchetype::Pavlov), Seat::Human], 4);
        // C vs D: sucker payoff, switch to D
        s.submit_decision(1, Move::Defect).unwrap();
        s.play_synthetic().unwrap();
        s.advance_round().unwrap();
        // D vs C: temptation, stay on D
        s.submit_decision(1, Move::Cooperate).unwrap();
        s.play_synthetic().unwrap();
        s.advance_round().unwrap();
        // D vs D: punishment, switch to C
        s.submit_decision(1, Move::Defect).unwrap();
        s.play_synthetic().unwrap();
        s.advance_round().unwrap();
        s.submit_decision(1, Move::Cooperate).unwrap();
        s.play_synthetic().unwrap();

        let moves: Vec<_> = s.history().iter().map(|r| *r.decision(0).unwrap()).collect();
        assert_eq!(moves, vec![Move::Cooperate, Move::Defect, Move::Defect, Move::Cooperate]);
    }

    #[test]
    fn test_tit_for_two_tats_waits() {
        let mut s = session(vec![Seat::Synthetic(DilemmaArchetype::TitForTwoTats), Seat::Human], 4);
        for _ in 0..3 {
            s.submit_decision(1, Move::Defect).unwrap();
            s.play_synthetic().unwrap();
            s.advance_round().unwrap();
        }
        s.submit_decision(1, Move::Defect).unwrap();
        s.play_synthetic().unwrap();
        let moves: Vec<_> = s.history().iter().map(|r| *r.decision(0).unwrap()).collect();
        assert_eq!(moves, vec![Move::Cooperate, Move::Cooperate, Move::Defect, Move::Defect]);
    }

    #[test]
    fn test_random_bias_extremes() {
        let always =
            PrisonersDilemma::new(20, DilemmaParams { cooperate_bias: 100, ..Default::default() });
        let seats = bots(DilemmaArchetype::Random, DilemmaArchetype::Random);
        let mut s = Session::create(always, seats, SeededRng::from_u64(1)).unwrap();
        play_out(&mut s);
        assert!(s.history().iter().all(|r| r.decisions.values().all(|m| *m == Move::Cooperate)));

        let never =
            PrisonersDilemma::new(20, DilemmaParams { cooperate_bias: 0, ..Default::default() });
        let seats = bots(DilemmaArchetype::Random, DilemmaArchetype::Random);
        let mut s = Session::create(never, seats, SeededRng::from_u64(1)).unwrap();
        play_out(&mut s);
        assert!(s.history().iter().all(|r| r.decisions.values().all(|m| *m == Move::Defect)));
    }

    #[test]
    fn test_adaptive_starts_cooperating_and_follows_defectors() {
        let mut s = session(bots(DilemmaArchetype::Adaptive, DilemmaArchetype::Rational), 10);
        play_out(&mut s);
        assert_eq!(s.history()[0].decision(0), Some(&Move::Cooperate));
        // opponent never cooperates, so the rate is zero from round 2 on
        for record in &s.history()[1..] {
            assert_eq!(record.decision(0), Some(&Move::Defect));
        }
    }

    #[test]
    fn test_same_seed_same_match() {
        let mut a = session(bots(DilemmaArchetype::Random, DilemmaArchetype::Adaptive), 10);
        let mut b = session(bots(DilemmaArchetype::Random, DilemmaArchetype::Adaptive), 10);
        play_out(&mut a);
        play_out(&mut b);
        assert_eq!(a.history(), b.history());
    }

    #[test]
    fn test_analysis_mentions_outcome() {
        let mut s = session(bots(DilemmaArchetype::Rational, DilemmaArchetype::Rational), 1);
        s.play_synthetic().unwrap();
        let analysis = &s.history()[0].analysis;
        assert!(analysis.contains("Everyone defected"));
        assert!(analysis.contains("With 2 players"));
    }

    #[test]
    fn test_archetype_descriptions() {
        assert_eq!(DilemmaArchetype::TitForTat.id(), "tit-for-tat");
        assert!(DilemmaArchetype::GrimTrigger.describe().contains("betrayed"));
    }
}
