//! Match configuration and the running score ledger across rounds.

use crate::bot::SkillTier;
use crate::player::{next_seat, Player, SeatIndex, SEATS};
use crate::round::RoundOutcome;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_ROUNDS: u32 = 8;

/// Settings for a whole match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Scored rounds to play
    pub rounds: u32,
    pub tier: SkillTier,
    /// Fixed seed for a reproducible match
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            tier: SkillTier::default(),
            seed: None,
        }
    }
}

/// One seat's line in the standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: Player,
    pub score: i64,
}

/// Cumulative scores in roster order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub rounds_played: u32,
    pub house: Player,
    pub streak: u32,
    pub scores: Vec<Standing>,
}

impl Standings {
    /// Highest score first; ties keep roster order
    pub fn leader(&self) -> Option<&Standing> {
        self.scores
            .iter()
            .reduce(|best, s| if s.score > best.score { s } else { best })
    }
}

/// Who holds the house and how every seat stands between rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    config: MatchConfig,
    roster: [Player; SEATS],
    house_seat: SeatIndex,
    /// Consecutive rounds the current house has won
    streak: u32,
    scores: [i64; SEATS],
    rounds_played: u32,
    quit: bool,
}

impl MatchState {
    /// Start a match with a randomly chosen first house
    pub fn new<R: Rng + ?Sized>(config: MatchConfig, roster: [Player; SEATS], rng: &mut R) -> Self {
        let house_seat = rng.gen_range(0..SEATS);
        info!(house = %roster[house_seat], rounds = config.rounds, "match starting");
        Self {
            config,
            roster,
            house_seat,
            streak: 0,
            scores: [0; SEATS],
            rounds_played: 0,
            quit: false,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn roster(&self) -> [Player; SEATS] {
        self.roster
    }

    pub fn house(&self) -> Player {
        self.roster[self.house_seat]
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn is_finished(&self) -> bool {
        self.quit || self.rounds_played >= self.config.rounds
    }

    pub fn score_of(&self, player: Player) -> Option<i64> {
        self.seat_of(player).map(|seat| self.scores[seat])
    }

    fn seat_of(&self, player: Player) -> Option<SeatIndex> {
        self.roster.iter().position(|&p| p == player)
    }

    /// Apply a round's outcome to the scores and the house rotation
    pub fn record(&mut self, outcome: &RoundOutcome) {
        match outcome {
            RoundOutcome::Restart => {
                debug!("round restarted, not scored");
                return;
            }
            RoundOutcome::Quit => {
                info!(rounds = self.rounds_played, "match quit");
                self.quit = true;
                return;
            }
            RoundOutcome::Draw { .. } => self.pass_house(),
            RoundOutcome::Win {
                winner,
                source,
                score,
            } => {
                let Some(winner_seat) = self.seat_of(*winner) else {
                    warn!(winner = %winner, "winner is not seated in this match; round not scored");
                    return;
                };
                let house_won = winner_seat == self.house_seat;
                let points = i64::from(*score)
                    + if house_won {
                        i64::from(self.streak)
                    } else {
                        0
                    };

                match source.and_then(|p| self.seat_of(p)) {
                    Some(discarder) => {
                        self.scores[winner_seat] += points;
                        self.scores[discarder] -= points;
                    }
                    None => {
                        for seat in (0..SEATS).filter(|&s| s != winner_seat) {
                            self.scores[seat] -= points;
                        }
                        self.scores[winner_seat] += points * (SEATS as i64 - 1);
                    }
                }
                info!(winner = %winner, points, house_won, "round scored");

                if house_won {
                    self.streak += 1;
                } else {
                    self.pass_house();
                }
            }
        }
        self.rounds_played += 1;
    }

    fn pass_house(&mut self) {
        self.house_seat = next_seat(self.house_seat);
        self.streak = 0;
    }

    pub fn standings(&self) -> Standings {
        Standings {
            rounds_played: self.rounds_played,
            house: self.house(),
            streak: self.streak,
            scores: self
                .roster
                .iter()
                .zip(self.scores)
                .map(|(&player, score)| Standing { player, score })
                .collect(),
        }
    }
}
