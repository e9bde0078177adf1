//! Session orchestrator
//!
//! A [`Session`] owns one isolated play-through of a game: its agents,
//! scores, history, shared game state and random source. Presentation code
//! drives it through a handful of synchronous operations and reads it back
//! through [`Session::snapshot`].

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::{Agent, Archetype, Seat};
use crate::config::ScoreOrder;
use crate::error::EngineError;
use crate::game::{Game, RoundView};
use crate::random::{RandomSource, SeededRng};
use crate::round::{Phase, RoundController, RoundRecord};
use crate::timer::{RoundId, TimerKind, TimerOutcome, TimerTicket};
use crate::AgentId;

/// Read-only copy of a session's observable state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot<Arch, A, S, O> {
    pub game: &'static str,
    pub phase: Phase,
    pub round: u32,
    pub agents: Vec<Agent<Arch>>,
    pub history: Vec<RoundRecord<A, O>>,
    /// Decisions already made in the active round
    pub decisions: BTreeMap<AgentId, A>,
    /// Agents the active round is still waiting on
    pub pending: Vec<AgentId>,
    pub shared: S,
}

pub type SessionSnapshot<G> = Snapshot<
    <G as Game>::Archetype,
    <G as Game>::Action,
    <G as Game>::Shared,
    <G as Game>::Outcome,
>;

/// One line of the end-of-session ranking
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Standing {
    /// 1-based; tied agents get consecutive ranks in id order
    pub rank: usize,
    pub agent: AgentId,
    pub score: f64,
}

pub struct Session<G: Game, R = SeededRng> {
    game: G,
    agents: Vec<Agent<G::Archetype>>,
    shared: G::Shared,
    history: Vec<RoundRecord<G::Action, G::Outcome>>,
    controller: RoundController<G::Action>,
    epoch: u32,
    rng: R,
}

fn round_view<'a, G: Game>(
    controller: &'a RoundController<G::Action>,
    agents: &'a [Agent<G::Archetype>],
    history: &'a [RoundRecord<G::Action, G::Outcome>],
    shared: &'a G::Shared,
) -> RoundView<'a, G> {
    RoundView {
        round: controller.round(),
        agents,
        decisions: controller.active().decisions(),
        history,
        shared,
    }
}

impl<G: Game, R: RandomSource> Session<G, R> {
    /// Empty session in `setup`; the game's configuration is validated here
    pub fn new(game: G, rng: R) -> Result<Self, EngineError> {
        game.config().validate()?;
        let shared = game.initial_shared(&[]);
        Ok(Self {
            game,
            agents: Vec::new(),
            shared,
            history: Vec::new(),
            controller: RoundController::default(),
            epoch: 0,
            rng,
        })
    }

    /// Create a session and seat its agents; round 1 opens immediately
    pub fn create(game: G, seats: Vec<Seat<G::Archetype>>, rng: R) -> Result<Self, EngineError> {
        let mut session = Self::new(game, rng)?;
        session.setup(seats)?;
        Ok(session)
    }

    /// Seat agents (ids follow `seats` order) and open round 1
    pub fn setup(&mut self, seats: Vec<Seat<G::Archetype>>) -> Result<(), EngineError> {
        self.controller.require(Phase::Setup, "seat agents")?;
        self.game.config().check_agent_count(seats.len())?;
        for seat in &seats {
            if let Seat::Synthetic(archetype) = seat {
                if !self.game.archetypes().contains(archetype) {
                    return Err(EngineError::config(format!(
                        "archetype `{}` is not available in {}",
                        archetype.id(),
                        self.game.name()
                    )));
                }
            }
        }

        let starting = self.game.config().starting_score;
        self.agents = seats
            .into_iter()
            .enumerate()
            .map(|(id, seat)| Agent::new(id, seat, starting))
            .collect();
        self.shared = self.game.initial_shared(&self.agents);

        info!(
            game = self.game.name(),
            agents = self.agents.len(),
            humans = self.agents.iter().filter(|a| a.is_human()).count(),
            "session created"
        );

        self.open_round();
        Ok(())
    }

    fn open_round(&mut self) {
        let round = self.controller.open_round();
        self.game.begin_round(&mut self.shared, round, &self.agents, &mut self.rng);
        info!(game = self.game.name(), round, "round opened");
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn round(&self) -> u32 {
        self.controller.round()
    }

    pub fn round_id(&self) -> RoundId {
        RoundId { epoch: self.epoch, round: self.controller.round() }
    }

    pub fn agents(&self) -> &[Agent<G::Archetype>] {
        &self.agents
    }

    pub fn history(&self) -> &[RoundRecord<G::Action, G::Outcome>] {
        &self.history
    }

    pub fn shared(&self) -> &G::Shared {
        &self.shared
    }

    /// Agents the active round still waits on; empty outside collection
    pub fn pending(&self) -> Vec<AgentId> {
        if self.controller.phase() != Phase::DecisionCollection {
            return Vec::new();
        }
        let view = round_view::<G>(&self.controller, &self.agents, &self.history, &self.shared);
        self.game.pending(&view)
    }

    fn pending_synthetic(&self) -> Vec<AgentId> {
        self.pending()
            .into_iter()
            .filter(|id| self.agents.get(*id).is_some_and(|a| !a.is_human()))
            .collect()
    }

    /// Apply a human agent's decision
    pub fn submit_decision(
        &mut self,
        agent: AgentId,
        action: G::Action,
    ) -> Result<(), EngineError> {
        self.controller.require(Phase::DecisionCollection, "submit a decision")?;
        let seat = self
            .agents
            .get(agent)
            .ok_or(EngineError::UnknownAgent { agent })?
            .seat;
        if !seat.is_human() {
            return Err(EngineError::NotHuman { agent });
        }
        self.accept(agent, action)?;
        self.settle_if_complete();
        Ok(())
    }

    fn accept(&mut self, agent: AgentId, action: G::Action) -> Result<(), EngineError> {
        let round = self.controller.round();
        if self.controller.active().has_decided(agent) {
            return Err(EngineError::DuplicateDecision { agent, round });
        }
        {
            let view = round_view::<G>(&self.controller, &self.agents, &self.history, &self.shared);
            if !self.game.pending(&view).contains(&agent) {
                let reason = "not expected to act at this point of the round";
                return Err(EngineError::illegal(agent, reason));
            }
            self.game.check(&view, agent, &action)?;
        }
        debug!(game = self.game.name(), round, agent, action = ?action, "decision accepted");
        self.controller.record(agent, action)
    }

    fn decide_for(&mut self, agent: AgentId) -> Result<(), EngineError> {
        let archetype = self
            .agents
            .get(agent)
            .ok_or(EngineError::UnknownAgent { agent })?
            .seat
            .archetype()
            .ok_or(EngineError::illegal(agent, "human agents are not driven by a policy"))?;
        let action = {
            let view = round_view::<G>(&self.controller, &self.agents, &self.history, &self.shared);
            self.game.decide(archetype, agent, &view, &mut self.rng)
        };
        self.accept(agent, action)
    }

    fn settle_if_complete(&mut self) -> bool {
        if self.controller.phase() == Phase::DecisionCollection && self.pending().is_empty() {
            self.settle();
            true
        } else {
            false
        }
    }

    /// Event, resolution and scoring for the active round
    fn settle(&mut self) {
        let round = self.controller.round();

        if self.game.config().random_event_enabled {
            self.controller.enter(Phase::Event);
            self.game.perturb(&mut self.shared, &mut self.rng);
            debug!(game = self.game.name(), round, shared = ?self.shared, "event drawn");
        }

        self.controller.enter(Phase::Resolution);
        let decisions = self.controller.take_decisions();
        let (resolution, analysis) = {
            let view = RoundView::<G> {
                round,
                agents: &self.agents,
                decisions: &decisions,
                history: &self.history,
                shared: &self.shared,
            };
            let resolution = self.game.resolve(&view, &mut self.rng);
            let analysis = self.game.analyze(&view, &resolution);
            (resolution, analysis)
        };

        for (id, payoff) in &resolution.payoffs {
            if let Some(agent) = self.agents.get_mut(*id) {
                agent.score += payoff;
            }
        }
        let cumulative = self.agents.iter().map(|a| (a.id, a.score)).collect();

        self.history.push(RoundRecord {
            round,
            decisions,
            payoffs: resolution.payoffs,
            cumulative,
            outcome: resolution.outcome,
            analysis,
        });
        self.game.end_round(&mut self.shared, round);

        if self.game.config().round_limit.is_last(round) {
            self.controller.enter(Phase::Terminal);
            info!(game = self.game.name(), round, "round resolved, session finished");
        } else {
            self.controller.enter(Phase::Analysis);
            info!(game = self.game.name(), round, "round resolved");
        }
    }

    /// Let every waiting synthetic agent decide right away
    ///
    /// Returns how many decisions were applied. Stops early once the round
    /// resolves or only human agents remain.
    pub fn play_synthetic(&mut self) -> Result<usize, EngineError> {
        self.controller.require(Phase::DecisionCollection, "play synthetic agents")?;
        let mut applied = 0;
        while self.controller.phase() == Phase::DecisionCollection {
            let Some(agent) = self.pending_synthetic().first().copied() else {
                break;
            };
            self.decide_for(agent)?;
            applied += 1;
            self.settle_if_complete();
        }
        Ok(applied)
    }

    /// Tickets for each synthetic agent the round currently waits on
    ///
    /// Call again after every state change: sequential games only expose
    /// the next actor once the previous one has acted.
    pub fn schedule_thinking(&self) -> Result<Vec<TimerTicket>, EngineError> {
        self.controller.require(Phase::DecisionCollection, "schedule synthetic decisions")?;
        let id = self.round_id();
        let delay_ms = self.game.config().think_delay_ms;
        Ok(self
            .pending_synthetic()
            .into_iter()
            .map(|agent| TimerTicket { id, kind: TimerKind::Think { agent }, delay_ms })
            .collect())
    }

    /// Ticket for the round deadline, for games played against the clock
    pub fn start_countdown(&self) -> Result<TimerTicket, EngineError> {
        self.controller.require(Phase::DecisionCollection, "start a countdown")?;
        let secs = self.game.config().countdown_secs.ok_or_else(|| {
            EngineError::config(format!("{} has no round countdown", self.game.name()))
        })?;
        Ok(TimerTicket {
            id: self.round_id(),
            kind: TimerKind::Countdown,
            delay_ms: secs.saturating_mul(1000),
        })
    }

    /// Deliver a timer callback
    ///
    /// Tickets issued for any other round, or for a round that is no longer
    /// collecting decisions, are stale and change nothing.
    pub fn fire(&mut self, ticket: TimerTicket) -> Result<TimerOutcome, EngineError> {
        if ticket.id != self.round_id() || self.controller.phase() != Phase::DecisionCollection {
            warn!(
                game = self.game.name(),
                ticket = ?ticket.id,
                current = ?self.round_id(),
                phase = %self.controller.phase(),
                "stale timer ignored"
            );
            return Ok(TimerOutcome::Stale);
        }

        match ticket.kind {
            TimerKind::Think { agent } => {
                if !self.pending_synthetic().contains(&agent) {
                    return Ok(TimerOutcome::Stale);
                }
                self.decide_for(agent)?;
                self.settle_if_complete();
            }
            TimerKind::Countdown => {
                info!(game = self.game.name(), round = ticket.id.round, "countdown expired");
                self.settle();
            }
        }
        Ok(TimerOutcome::Applied)
    }

    /// Leave `analysis` for the next round
    pub fn advance_round(&mut self) -> Result<u32, EngineError> {
        self.controller.require(Phase::Analysis, "advance to the next round")?;
        self.open_round();
        Ok(self.controller.round())
    }

    /// Stop from `analysis`; only `reset` is valid afterwards
    pub fn end_session(&mut self) -> Result<(), EngineError> {
        self.controller.require(Phase::Analysis, "end the session")?;
        self.controller.enter(Phase::Terminal);
        info!(game = self.game.name(), rounds = self.history.len(), "session ended");
        Ok(())
    }

    /// Discard agents, scores and history and return to `setup`
    pub fn reset(&mut self) {
        self.agents.clear();
        self.history.clear();
        self.shared = self.game.initial_shared(&[]);
        self.controller.reset();
        self.epoch = self.epoch.wrapping_add(1);
        info!(game = self.game.name(), epoch = self.epoch, "session reset");
    }

    pub fn snapshot(&self) -> SessionSnapshot<G> {
        Snapshot {
            game: self.game.name(),
            phase: self.controller.phase(),
            round: self.controller.round(),
            agents: self.agents.clone(),
            history: self.history.clone(),
            decisions: self.controller.active().decisions().clone(),
            pending: self.pending(),
            shared: self.shared.clone(),
        }
    }

    /// Agents ranked best first; ties go to the lower id
    pub fn standings(&self) -> Vec<Standing> {
        let order = self.game.config().score_order;
        let mut ranked: Vec<_> = self.agents.iter().map(|a| (a.id, a.score)).collect();
        ranked.sort_by(|(id_a, a), (id_b, b)| {
            let by_score = match order {
                ScoreOrder::HigherIsBetter => b.total_cmp(a),
                ScoreOrder::LowerIsBetter => a.total_cmp(b),
            };
            by_score.then(id_a.cmp(id_b))
        });
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (agent, score))| Standing { rank: i + 1, agent, score })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::prisoners_dilemma::{DilemmaArchetype, Move, PrisonersDilemma};
    use crate::games::prisoners_network::{NetworkArchetype, PrisonersNetwork};

    fn pd(seats: Vec<Seat<DilemmaArchetype>>) -> Session<PrisonersDilemma> {
        Session::create(PrisonersDilemma::with_rounds(3), seats, SeededRng::from_u64(7)).unwrap()
    }

    #[test]
    fn test_new_session_waits_in_setup() {
        let mut s = Session::new(PrisonersDilemma::default(), SeededRng::from_u64(1)).unwrap();
        assert_eq!(s.phase(), Phase::Setup);
        assert_eq!(s.round(), 0);
        assert!(s.pending().is_empty());
        assert!(matches!(
            s.submit_decision(0, Move::Cooperate),
            Err(EngineError::InvalidTransition { phase: Phase::Setup, .. })
        ));
        s.setup(vec![Seat::Human, Seat::Human]).unwrap();
        assert_eq!(s.phase(), Phase::DecisionCollection);
        assert!(s.setup(vec![Seat::Human, Seat::Human]).is_err());
    }

    #[test]
    fn test_round_waits_for_every_agent() {
        let mut s = pd(vec![Seat::Human, Seat::Human]);
        s.submit_decision(1, Move::Defect).unwrap();
        assert_eq!(s.phase(), Phase::DecisionCollection);
        assert_eq!(s.pending(), vec![0]);
        assert!(s.history().is_empty());
        s.submit_decision(0, Move::Cooperate).unwrap();
        assert_eq!(s.phase(), Phase::Analysis);
        assert_eq!(s.history()[0].payoffs[&1], 5.0);
    }

    #[test]
    fn test_play_synthetic_leaves_humans_pending() {
        let mut s = pd(vec![Seat::Human, Seat::Synthetic(DilemmaArchetype::TitForTat)]);
        assert_eq!(s.play_synthetic().unwrap(), 1);
        assert_eq!(s.play_synthetic().unwrap(), 0);
        assert_eq!(s.pending(), vec![0]);
    }

    #[test]
    fn test_countdown_requires_configuration() {
        let s = pd(vec![Seat::Human, Seat::Human]);
        assert!(matches!(s.start_countdown(), Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn test_end_session_only_from_analysis() {
        let mut s = pd(vec![Seat::Human, Seat::Human]);
        assert!(s.end_session().is_err());
        s.submit_decision(0, Move::Cooperate).unwrap();
        s.submit_decision(1, Move::Cooperate).unwrap();
        s.end_session().unwrap();
        assert_eq!(s.phase(), Phase::Terminal);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_reset_bumps_epoch() {
        let mut s = pd(vec![Seat::Human, Seat::Human]);
        let before = s.round_id();
        s.reset();
        assert_eq!(s.round_id().epoch, before.epoch + 1);
        assert_eq!(s.round(), 0);
    }

    #[test]
    fn test_standings_lower_is_better() {
        let seats = vec![
            Seat::Synthetic(NetworkArchetype::Selfish),
            Seat::Synthetic(NetworkArchetype::Selfish),
            Seat::Synthetic(NetworkArchetype::Loyal),
            Seat::Synthetic(NetworkArchetype::Loyal),
        ];
        let mut s =
            Session::create(PrisonersNetwork::default(), seats, SeededRng::from_u64(1)).unwrap();
        s.play_synthetic().unwrap();
        let standings = s.standings();
        assert_eq!(standings.iter().map(|st| st.agent).collect::<Vec<_>>(), vec![2, 3, 0, 1]);
        assert_eq!(standings[0].score, 8.0);
        assert_eq!(standings[3].rank, 4);
    }

    #[test]
    fn test_snapshot_reports_pending() {
        let mut s = pd(vec![Seat::Human, Seat::Human]);
        s.submit_decision(0, Move::Defect).unwrap();
        let snapshot = s.snapshot();
        assert_eq!(snapshot.game, "prisoners-dilemma");
        assert_eq!(snapshot.pending, vec![1]);
        assert_eq!(snapshot.decisions.get(&0), Some(&Move::Defect));
    }
}
