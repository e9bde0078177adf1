//! Stag Hunt: coordinate on big game or settle for safe small prey
//!
//! Large prey only pays off reliably when enough hunters commit to it; a
//! short-handed hunt falls back on a risky roll. Rounds run against a
//! countdown, and hunters who never chose go home empty-handed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Archetype};
use crate::config::{GameConfig, PlayerCount, RoundLimit};
use crate::game::{Game, Resolution, RoundView};
use crate::random::RandomSource;
use crate::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Prey {
    Stag,
    Deer,
    Rabbit,
    Squirrel,
}

impl Prey {
    pub const ALL: [Prey; 4] = [Prey::Stag, Prey::Deer, Prey::Rabbit, Prey::Squirrel];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    Forest,
    Plains,
    Mountains,
}

impl Environment {
    pub const ALL: [Environment; 3] =
        [Environment::Forest, Environment::Plains, Environment::Mountains];

    /// The prey this terrain favours
    pub fn boosted(&self) -> Prey {
        match self {
            Environment::Forest => Prey::Squirrel,
            Environment::Plains => Prey::Deer,
            Environment::Mountains => Prey::Stag,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreySpec {
    pub prey: Prey,
    pub value: u32,
    /// Chance a short-handed hunt fails
    pub risk_factor: f64,
    /// Hunters needed for a guaranteed catch
    pub min_hunters: usize,
}

impl PreySpec {
    pub fn base(prey: Prey) -> Self {
        let (value, risk_factor, min_hunters) = match prey {
            Prey::Stag => (100, 0.7, 3),
            Prey::Deer => (60, 0.5, 2),
            Prey::Rabbit => (20, 0.2, 1),
            Prey::Squirrel => (10, 0.1, 1),
        };
        Self { prey, value, risk_factor, min_hunters }
    }

    /// Prey table for one environment; the favoured prey is worth 20% more
    pub fn table(environment: Environment) -> Vec<PreySpec> {
        Prey::ALL
            .iter()
            .map(|prey| {
                let mut spec = Self::base(*prey);
                if *prey == environment.boosted() {
                    spec.value = (f64::from(spec.value) * 1.2).round() as u32;
                }
                spec
            })
            .collect()
    }

    /// A hunt succeeds outright with enough hunters, otherwise on a draw above the risk
    ///
    /// A full party never consumes a draw.
    pub fn succeeds(&self, hunters: usize, rng: &mut dyn RandomSource) -> bool {
        hunters >= self.min_hunters || rng.next_unit() > self.risk_factor
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HuntGround {
    pub environment: Environment,
    pub prey: Vec<PreySpec>,
}

impl HuntGround {
    pub fn new(environment: Environment) -> Self {
        Self { environment, prey: PreySpec::table(environment) }
    }

    pub fn spec(&self, prey: Prey) -> PreySpec {
        self.prey
            .iter()
            .copied()
            .find(|s| s.prey == prey)
            .unwrap_or_else(|| PreySpec::base(prey))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HunterArchetype {
    Cooperative,
    Selfish,
    Adaptive,
    Random,
}

impl Archetype for HunterArchetype {
    fn id(&self) -> &'static str {
        match self {
            HunterArchetype::Cooperative => "cooperative",
            HunterArchetype::Selfish => "selfish",
            HunterArchetype::Adaptive => "adaptive",
            HunterArchetype::Random => "random",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            HunterArchetype::Cooperative => "Always joins the stag hunt.",
            HunterArchetype::Selfish => "Always goes for the safe rabbit.",
            HunterArchetype::Adaptive => {
                "Hunts stag while the group managed a full stag party last round, rabbit otherwise."
            }
            HunterArchetype::Random => "Picks any prey at random.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HuntOutcome {
    pub environment: Environment,
    pub hunters: BTreeMap<Prey, usize>,
    pub caught: BTreeMap<AgentId, bool>,
}

impl HuntOutcome {
    pub fn hunters_on(&self, prey: Prey) -> usize {
        self.hunters.get(&prey).copied().unwrap_or(0)
    }
}

/// Count hunters per prey, then settle each hunter's catch
///
/// Draws are taken in agent id order and only for short-handed hunts.
pub fn resolve_hunt(
    choices: &BTreeMap<AgentId, Prey>,
    ground: &HuntGround,
    rng: &mut dyn RandomSource,
) -> (BTreeMap<AgentId, f64>, HuntOutcome) {
    let mut hunters = BTreeMap::new();
    for prey in choices.values() {
        *hunters.entry(*prey).or_insert(0) += 1;
    }

    let mut payoffs = BTreeMap::new();
    let mut caught = BTreeMap::new();
    for (agent, prey) in choices {
        let spec = ground.spec(*prey);
        let count = hunters.get(prey).copied().unwrap_or(0);
        let success = spec.succeeds(count, rng);
        caught.insert(*agent, success);
        payoffs.insert(*agent, if success { f64::from(spec.value) } else { 0.0 });
    }

    let outcome = HuntOutcome { environment: ground.environment, hunters, caught };
    (payoffs, outcome)
}

#[derive(Clone, Debug)]
pub struct StagHunt {
    config: GameConfig,
    archetypes: Vec<HunterArchetype>,
}

impl StagHunt {
    pub fn new() -> Self {
        let config =
            GameConfig::new(PlayerCount::new(3, 5), RoundLimit::Unbounded).with_countdown(20);
        Self {
            config,
            archetypes: vec![
                HunterArchetype::Cooperative,
                HunterArchetype::Selfish,
                HunterArchetype::Adaptive,
                HunterArchetype::Random,
            ],
        }
    }

    pub fn with_archetypes(mut self, archetypes: Vec<HunterArchetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for StagHunt {
    fn default() -> Self {
        Self::new()
    }
}

type View<'a> = RoundView<'a, StagHunt>;

fn adaptive(view: &View<'_>) -> Prey {
    match view.last_round() {
        None => Prey::Stag,
        Some(last) => {
            if last.outcome.hunters_on(Prey::Stag) >= PreySpec::base(Prey::Stag).min_hunters {
                Prey::Stag
            } else {
                Prey::Rabbit
            }
        }
    }
}

impl Game for StagHunt {
    type Action = Prey;
    type Archetype = HunterArchetype;
    type Shared = HuntGround;
    type Outcome = HuntOutcome;

    fn name(&self) -> &'static str {
        "stag-hunt"
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn archetypes(&self) -> &[HunterArchetype] {
        &self.archetypes
    }

    fn initial_shared(&self, _agents: &[Agent<HunterArchetype>]) -> HuntGround {
        HuntGround::new(Environment::Forest)
    }

    fn begin_round(
        &self,
        shared: &mut HuntGround,
        _round: u32,
        _agents: &[Agent<HunterArchetype>],
        rng: &mut dyn RandomSource,
    ) {
        let pick = rng.next_range(Environment::ALL.len() as u32) as usize;
        *shared = HuntGround::new(Environment::ALL[pick]);
    }

    fn decide(
        &self,
        archetype: HunterArchetype,
        _agent: AgentId,
        view: &View<'_>,
        rng: &mut dyn RandomSource,
    ) -> Prey {
        match archetype {
            HunterArchetype::Cooperative => Prey::Stag,
            HunterArchetype::Selfish => Prey::Rabbit,
            HunterArchetype::Adaptive => adaptive(view),
            HunterArchetype::Random => Prey::ALL[rng.next_range(Prey::ALL.len() as u32) as usize],
        }
    }

    fn resolve(&self, view: &View<'_>, rng: &mut dyn RandomSource) -> Resolution<HuntOutcome> {
        let (payoffs, outcome) = resolve_hunt(view.decisions, view.shared, rng);
        Resolution { payoffs, outcome }
    }

    fn analyze(&self, view: &View<'_>, resolution: &Resolution<HuntOutcome>) -> String {
        let outcome = &resolution.outcome;
        let mut text = format!("Round {} in the {:?}:\n", view.round, outcome.environment);
        for prey in Prey::ALL {
            let count = outcome.hunters_on(prey);
            if count == 0 {
                continue;
            }
            let successes = view
                .decisions
                .iter()
                .filter(|(id, p)| **p == prey && outcome.caught.get(*id) == Some(&true))
                .count();
            text.push_str(&format!("{prey:?}: {count} hunter(s), {successes} successful\n"));
        }

        let missing = view.agents.len() - view.decisions.len();
        if missing > 0 {
            text.push_str(&format!("{missing} hunter(s) ran out of time and caught nothing.\n"));
        }

        let stag = view.shared.spec(Prey::Stag);
        text.push('\n');
        if outcome.hunters_on(Prey::Stag) >= stag.min_hunters {
            text.push_str(
                "Enough hunters trusted each other to bring down the stag: coordination \
                 paid better than playing it safe.",
            );
        } else if outcome.hunters_on(Prey::Stag) > 0 {
            text.push_str(
                "Some hunters went after the stag without enough support. Trust without \
                 coordination is a gamble.",
            );
        } else {
            text.push_str(
                "Nobody risked the stag. Safe choices protect each hunter but leave the \
                 biggest reward on the table.",
            );
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Seat;
    use crate::random::tests::ScriptedRng;
    use crate::random::SeededRng;
    use crate::round::Phase;
    use crate::session::Session;
    use crate::timer::TimerOutcome;

    #[test]
    fn test_prey_table_boosts_by_environment() {
        let mountains = HuntGround::new(Environment::Mountains);
        assert_eq!(mountains.spec(Prey::Stag).value, 120);
        assert_eq!(mountains.spec(Prey::Deer).value, 60);

        let plains = HuntGround::new(Environment::Plains);
        assert_eq!(plains.spec(Prey::Deer).value, 72);

        let forest = HuntGround::new(Environment::Forest);
        assert_eq!(forest.spec(Prey::Squirrel).value, 12);
        assert_eq!(forest.spec(Prey::Stag).value, 100);
    }

    #[test]
    fn test_full_stag_party_always_succeeds() {
        let choices = BTreeMap::from([(0, Prey::Stag), (1, Prey::Stag), (2, Prey::Stag)]);
        // draws below every risk would fail a short-handed hunt
        let mut rng = ScriptedRng::new(&[0.0]);
        let (payoffs, outcome) =
            resolve_hunt(&choices, &HuntGround::new(Environment::Forest), &mut rng);
        assert!(payoffs.values().all(|p| *p == 100.0));
        assert_eq!(outcome.hunters_on(Prey::Stag), 3);
    }

    #[test]
    fn test_short_handed_hunt_uses_draw() {
        let choices = BTreeMap::from([(0, Prey::Stag), (1, Prey::Stag), (2, Prey::Rabbit)]);
        let ground = HuntGround::new(Environment::Forest);

        // rabbit has a single hunter and min 1, so only the stag hunters draw
        let mut rng = ScriptedRng::new(&[0.9, 0.1]);
        let (payoffs, outcome) = resolve_hunt(&choices, &ground, &mut rng);
        assert_eq!(payoffs[&0], 100.0);
        assert_eq!(payoffs[&1], 0.0);
        assert_eq!(payoffs[&2], 20.0);
        assert!(!outcome.caught[&1]);
    }

    #[test]
    fn test_success_rule() {
        let stag = PreySpec::base(Prey::Stag);
        assert!(stag.succeeds(3, &mut ScriptedRng::new(&[0.0])));
        assert!(!stag.succeeds(2, &mut ScriptedRng::new(&[0.7])));
        assert!(stag.succeeds(2, &mut ScriptedRng::new(&[0.71])));
    }

    #[test]
    fn test_guaranteed_hunts_skip_the_draw() {
        let choices =
            BTreeMap::from([(0, Prey::Stag), (1, Prey::Stag), (2, Prey::Stag), (3, Prey::Rabbit)]);
        let mut rng = ScriptedRng::new(&[0.3, 0.9]);
        let (payoffs, _) = resolve_hunt(&choices, &HuntGround::new(Environment::Plains), &mut rng);
        assert_eq!(payoffs[&3], 20.0);
        // the script is untouched, so its first draw is still next
        assert!((rng.next_unit() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_cooperative_party_scores() {
        let seats = vec![Seat::Synthetic(HunterArchetype::Cooperative); 3];
        let mut s = Session::create(StagHunt::new(), seats, SeededRng::from_u64(4)).unwrap();
        s.play_synthetic().unwrap();
        let environment = s.history()[0].outcome.environment;
        let value = f64::from(PreySpec::table(environment)[0].value);
        assert!(s.agents().iter().all(|a| a.score == value));
    }

    #[test]
    fn test_adaptive_follows_last_stag_party() {
        let seats = vec![
            Seat::Synthetic(HunterArchetype::Adaptive),
            Seat::Synthetic(HunterArchetype::Selfish),
            Seat::Synthetic(HunterArchetype::Selfish),
        ];
        let mut s = Session::create(StagHunt::new(), seats, SeededRng::from_u64(4)).unwrap();
        s.play_synthetic().unwrap();
        assert_eq!(s.history()[0].decision(0), Some(&Prey::Stag));
        s.advance_round().unwrap();
        s.play_synthetic().unwrap();
        assert_eq!(s.history()[1].decision(0), Some(&Prey::Rabbit));
    }

    #[test]
    fn test_countdown_resolves_partial_round() {
        let seats = vec![
            Seat::Human,
            Seat::Synthetic(HunterArchetype::Selfish),
            Seat::Synthetic(HunterArchetype::Selfish),
        ];
        let mut s = Session::create(StagHunt::new(), seats, SeededRng::from_u64(2)).unwrap();
        let countdown = s.start_countdown().unwrap();
        assert_eq!(countdown.delay_ms, 20_000);

        s.play_synthetic().unwrap();
        assert_eq!(s.pending(), vec![0]);
        assert_eq!(s.fire(countdown).unwrap(), TimerOutcome::Applied);

        assert_eq!(s.phase(), Phase::Analysis);
        let record = &s.history()[0];
        assert!(record.decision(0).is_none());
        assert_eq!(record.payoff(0), 0.0);
        assert!(record.analysis.contains("ran out of time"));

        // the same ticket is stale once the round has closed
        assert_eq!(s.fire(countdown).unwrap(), TimerOutcome::Stale);
    }
}
