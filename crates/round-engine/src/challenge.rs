//! Challenge quiz: historical and classic dilemmas, one choice each
//!
//! A [`ChallengeRun`] is a single-player session in miniature. Each scenario
//! collects one answer, shows feedback, and moves on until the catalogue is
//! exhausted. It reuses the engine's [`Phase`] vocabulary for that cycle.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::round::Phase;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scenario {
    pub title: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub choices: &'static [&'static str],
    /// One entry per choice
    pub feedback: &'static [&'static str],
    pub explanation: &'static str,
    pub insight: Option<&'static str>,
    /// Index into `choices` of the choice that counts toward the tally
    pub recommended: usize,
}

static SCENARIOS: [Scenario; 10] = [
    Scenario {
        title: "Cuban Missile Crisis (1962)",
        category: "Political science",
        description: "The U.S. and the USSR face off over missiles in Cuba. As the U.S. President, what action will you take?",
        choices: &[
            "Demand missile removal (risk escalation)",
            "Launch a strike (immediate war)",
            "Negotiate secretly (trust-building)",
        ],
        feedback: &[
            "This is a risky move that could lead to further escalation.",
            "This is an extreme action that could lead to devastating consequences.",
            "Great choice! This aligns with how Kennedy resolved the crisis through back-channel diplomacy.",
        ],
        explanation: "The Cuban Missile Crisis was resolved through secret negotiations, avoiding a potentially catastrophic war. This scenario demonstrates concepts of brinkmanship and the importance of diplomatic channels in international conflicts.",
        insight: Some(
            "This scenario illustrates the concept of brinkmanship in game theory, where two parties push dangerous events to the brink of disaster to achieve the most advantageous outcome. It also demonstrates the importance of finding a Nash equilibrium, where neither party has an incentive to deviate from their strategy given what the other party is doing.",
        ),
        recommended: 2,
    },
    Scenario {
        title: "Prisoner's Dilemma: The Watergate Scandal (1972)",
        category: "Political science",
        description: "You're one of Nixon's aides implicated in the Watergate scandal. Do you confess or stay silent?",
        choices: &["Confess and implicate Nixon", "Stay silent and hope others don't confess"],
        feedback: &[
            "Correct! Cooperating with prosecutors minimizes your prison sentence. The others defected, and silence would have been costly.",
            "This is a risky choice. If others confess, you could face a harsher sentence.",
        ],
        explanation: "This scenario illustrates the Prisoner's Dilemma, a fundamental concept in game theory. The dominant strategy is to confess, as it provides the best outcome regardless of what others do.",
        insight: Some(
            "The Prisoner's Dilemma is a classic example in game theory where two individuals might not cooperate even if it's in their best interests to do so. It demonstrates why two completely rational individuals might not cooperate, even when it appears that it is in their best interests to do so.",
        ),
        recommended: 0,
    },
    Scenario {
        title: "Battle of the Sexes (Cold War Sports)",
        category: "Relationships",
        description: "A couple needs to decide which sports event to attend. The husband prefers a football game, while the wife prefers a ballet performance. What should they do?",
        choices: &[
            "Attend the football game",
            "Attend the ballet performance",
            "Each goes to their preferred event separately",
        ],
        feedback: &[
            "This choice favors one partner's preference. In game theory, this is one of two pure strategy Nash equilibria.",
            "This choice favors the other partner's preference. This is also a pure strategy Nash equilibrium.",
            "While this allows both to enjoy their preferred event, it results in a lower payoff as they don't get to spend time together.",
        ],
        explanation: "This scenario, known as the 'Battle of the Sexes' in game theory, illustrates coordination games where players have different preferences but still benefit from coordinating their actions.",
        insight: Some(
            "The 'Battle of the Sexes' game demonstrates the concept of multiple Nash equilibria in coordination games. It shows how social conventions or communication can help resolve conflicts when players have different preferences but still benefit from coordinating their actions.",
        ),
        // either coordinated outcome is an equilibrium; the first one counts
        recommended: 0,
    },
    Scenario {
        title: "The Tragedy of the Commons",
        category: "Social science",
        description: "You and other villagers share a common grazing field. How many animals will you graze?",
        choices: &[
            "Graze 1 animal (sustainable use)",
            "Graze 3 animals (maximize short-term benefit)",
            "Graze 5 animals (over-exploit for maximum gain)",
        ],
        feedback: &[
            "A sustainable choice that helps preserve the common resource.",
            "This choice risks depleting the resource if everyone chooses similarly.",
            "Over-grazing leads to the rapid depletion of the common resource, harming everyone in the long run.",
        ],
        explanation: "The 'Tragedy of the Commons' demonstrates how individual incentives can lead to the over-exploitation of shared resources, harming the group as a whole.",
        insight: Some(
            "This scenario highlights the tension between individual rationality and collective welfare. Game theory shows that external regulation or agreements are often required to prevent overuse of shared resources.",
        ),
        recommended: 0,
    },
    Scenario {
        title: "Chicken Game: Arms Race",
        category: "Demographics",
        description: "Two nations are in an arms race. Should you build more weapons or attempt disarmament?",
        choices: &[
            "Build more weapons (escalation)",
            "Attempt disarmament (risk trust issues)",
            "Do nothing (maintain status quo)",
        ],
        feedback: &[
            "Escalation increases tension and the risk of conflict.",
            "This approach requires trust and communication but can lead to stability.",
            "A neutral stance avoids immediate risks but may fail to address underlying tensions.",
        ],
        explanation: "The Chicken Game models situations where players face off to see who will yield first. An arms race represents brinkmanship, with catastrophic risks if neither side yields.",
        insight: Some(
            "This game illustrates the risks of escalation and the potential for mutually beneficial outcomes through cooperation and trust-building.",
        ),
        recommended: 1,
    },
    Scenario {
        title: "Monty Hall Problem",
        category: "Life",
        description: "You're on a game show. You pick one of three doors, one hides a car, and the others hide goats. After you choose, the host reveals a goat behind one of the remaining doors. Do you switch your choice?",
        choices: &["Stay with the original door", "Switch to the other door"],
        feedback: &[
            "Staying gives you a 1/3 chance of winning.",
            "Switching increases your chances to 2/3!",
        ],
        explanation: "The Monty Hall Problem demonstrates probability and decision-making under uncertainty. Switching doors improves your chances of winning due to conditional probabilities.",
        insight: Some(
            "While not a traditional game theory scenario, it highlights strategic decision-making based on updated information.",
        ),
        recommended: 1,
    },
    Scenario {
        title: "Stag Hunt (Cooperative Hunting)",
        category: "Community",
        description: "You and a friend can hunt a stag together or each hunt rabbits individually. What will you do?",
        choices: &["Hunt stag (cooperate)", "Hunt rabbit (act alone)"],
        feedback: &[
            "Cooperating yields the highest joint payoff if both choose it.",
            "Acting alone ensures a smaller but guaranteed payoff.",
        ],
        explanation: "The Stag Hunt models situations where cooperation yields the highest payoff, but requires trust.",
        insight: Some(
            "The Stag Hunt game explores coordination and the risks of cooperation. It contrasts with the Prisoner's Dilemma, as the best outcomes occur when both parties trust each other.",
        ),
        recommended: 0,
    },
    Scenario {
        title: "Ultimatum Game",
        category: "Relationships",
        description: "You must propose how to split $100 with another player. If they reject your offer, neither gets anything. How much do you offer?",
        choices: &["$50 (fair split)", "$20 (keep more for yourself)", "$1 (maximize your share)"],
        feedback: &[
            "Fair offers are more likely to be accepted.",
            "Risky! The other player might reject this offer as unfair.",
            "Unlikely to be accepted, leaving both with nothing.",
        ],
        explanation: "The Ultimatum Game explores fairness, negotiation, and the psychological factors influencing decision-making.",
        insight: Some(
            "This game challenges the assumption of purely rational decision-making, incorporating elements of fairness and social preferences.",
        ),
        recommended: 0,
    },
    Scenario {
        title: "Colonial Negotiation (Berlin Conference)",
        category: "Political science",
        description: "You're a European power negotiating colonial boundaries in Africa. Do you prioritize cooperation or maximize your territorial gains?",
        choices: &["Cooperate for stability", "Maximize gains at the expense of others"],
        feedback: &[
            "This approach fosters long-term stability but might result in smaller immediate gains.",
            "This aggressive approach risks future conflicts and instability.",
        ],
        explanation: "The Berlin Conference demonstrates real-world applications of game theory in international negotiations.",
        insight: Some(
            "This scenario illustrates zero-sum games and the potential benefits of cooperative strategies.",
        ),
        recommended: 0,
    },
    Scenario {
        title: "Tit-for-Tat Strategy (Iterated Prisoner's Dilemma)",
        category: "Relationships",
        description: "You're in an ongoing interaction with another player. Do you cooperate or defect?",
        choices: &["Cooperate (build trust)", "Defect (maximize immediate gain)"],
        feedback: &[
            "Cooperation fosters trust and mutual benefit over time.",
            "Defection risks retaliation, reducing future payoffs.",
        ],
        explanation: "Tit-for-Tat is a successful strategy in repeated interactions, promoting cooperation while punishing defection.",
        insight: Some(
            "The Iterated Prisoner's Dilemma demonstrates the dynamics of trust, retaliation, and long-term strategy in repeated games.",
        ),
        recommended: 0,
    },
];

/// The built-in scenario catalogue, in play order
pub fn scenarios() -> &'static [Scenario] {
    &SCENARIOS
}

/// What the player sees after answering
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Feedback {
    pub choice: usize,
    pub text: &'static str,
    pub recommended: bool,
    pub explanation: &'static str,
    pub insight: Option<&'static str>,
}

#[derive(Clone, Debug)]
pub struct ChallengeRun {
    scenarios: &'static [Scenario],
    index: usize,
    phase: Phase,
    tally: usize,
    answers: Vec<usize>,
}

impl Default for ChallengeRun {
    fn default() -> Self {
        Self::new(scenarios())
    }
}

impl ChallengeRun {
    pub fn new(scenarios: &'static [Scenario]) -> Self {
        let phase = if scenarios.is_empty() { Phase::Terminal } else { Phase::DecisionCollection };
        Self { scenarios, index: 0, phase, tally: 0, answers: Vec::new() }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> Option<&'static Scenario> {
        if self.is_finished() {
            None
        } else {
            self.scenarios.get(self.index)
        }
    }

    /// Recommended choices picked so far
    pub fn tally(&self) -> usize {
        self.tally
    }

    pub fn answers(&self) -> &[usize] {
        &self.answers
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Terminal
    }

    pub fn answer(&mut self, choice: usize) -> Result<Feedback, EngineError> {
        let operation = "answer a scenario";
        match self.phase {
            Phase::DecisionCollection => {}
            Phase::Analysis => {
                let round = self.index as u32 + 1;
                return Err(EngineError::DuplicateDecision { agent: 0, round });
            }
            phase => return Err(EngineError::InvalidTransition { operation, phase }),
        }
        let scenario = self
            .scenarios
            .get(self.index)
            .ok_or(EngineError::InvalidTransition { operation, phase: self.phase })?;
        let text = scenario.feedback.get(choice).copied().ok_or_else(|| {
            let options = scenario.choices.len();
            EngineError::illegal(0, format!("choice {choice} is not one of {options} options"))
        })?;

        let recommended = choice == scenario.recommended;
        if recommended {
            self.tally += 1;
        }
        self.answers.push(choice);
        self.phase = Phase::Analysis;
        debug!(scenario = scenario.title, choice, recommended, "scenario answered");

        Ok(Feedback {
            choice,
            text,
            recommended,
            explanation: scenario.explanation,
            insight: scenario.insight,
        })
    }

    /// Move past the feedback; `None` once the catalogue is exhausted
    pub fn next(&mut self) -> Result<Option<&'static Scenario>, EngineError> {
        if self.phase != Phase::Analysis {
            return Err(EngineError::InvalidTransition {
                operation: "move to the next scenario",
                phase: self.phase,
            });
        }
        self.index += 1;
        if self.index >= self.scenarios.len() {
            self.phase = Phase::Terminal;
            info!(tally = self.tally, total = self.scenarios.len(), "challenge finished");
            return Ok(None);
        }
        self.phase = Phase::DecisionCollection;
        Ok(self.scenarios.get(self.index))
    }

    pub fn restart(&mut self) {
        *self = Self::new(self.scenarios);
    }
}
