//! Computer opponents.
//!
//! Two skill tiers share one interface:
//! - Basic: discards at random (Computer 3 always throws its last tile)
//!   and never claims or declares anything
//! - Advanced: declares a self-drawn win when it has one, discards by the
//!   evaluator heuristic, and claims win > pung > chow on other discards
//!
//! The tier is picked once per match; the round engine only sees
//! `dyn NpcPolicy`.

use crate::actions::Response;
use crate::hand::{can_pung, chow_options, is_winning_hand, suggest_discard, Hand, Meld};
use crate::player::{Player, SeatState};
use crate::tile::Tile;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Strength of the computer opponents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTier {
    Basic,
    #[default]
    Advanced,
}

impl SkillTier {
    /// Build the policy for this tier
    pub fn policy(self, rng: StdRng) -> Box<dyn NpcPolicy> {
        match self {
            SkillTier::Basic => Box::new(BasicBot::with_rng(rng)),
            SkillTier::Advanced => Box::new(AdvancedBot),
        }
    }
}

/// What a computer seat sees when it decides
#[derive(Debug, Clone, Copy)]
pub struct SeatView<'a> {
    pub player: Player,
    pub hand: &'a Hand,
    pub melds: &'a [Meld],
    /// Wall tile drawn this turn. `None` off turn and after a claim, when
    /// no self-drawn win is possible.
    pub drawn: Option<Tile>,
}

impl<'a> SeatView<'a> {
    pub fn of(seat: &'a SeatState) -> Self {
        Self {
            player: seat.player,
            hand: &seat.hand,
            melds: &seat.melds,
            drawn: None,
        }
    }

    /// The seat on its own turn
    pub fn on_turn(seat: &'a SeatState, drawn: Option<Tile>) -> Self {
        Self {
            drawn,
            ..Self::of(seat)
        }
    }
}

/// A computer seat's decision on its own turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnAction {
    /// Declare a self-drawn win
    DeclareWin,
    /// Discard the tile at this 0-based index
    Discard(usize),
}

/// Decision-making for the three computer seats
pub trait NpcPolicy {
    fn tier(&self) -> SkillTier;

    /// Called after the seat has drawn (or claimed) and must act
    fn choose_turn_action(&mut self, view: &SeatView<'_>) -> TurnAction;

    /// Called when another seat discards. `downstream` is true for the seat
    /// right after the discarder, the only one allowed to chow.
    fn choose_response(&mut self, view: &SeatView<'_>, discard: Tile, downstream: bool)
        -> Response;
}

/// Random discards, no claims
pub struct BasicBot {
    rng: StdRng,
}

impl BasicBot {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Default for BasicBot {
    fn default() -> Self {
        Self::new()
    }
}

impl NpcPolicy for BasicBot {
    fn tier(&self) -> SkillTier {
        SkillTier::Basic
    }

    fn choose_turn_action(&mut self, view: &SeatView<'_>) -> TurnAction {
        let len = view.hand.len();
        if len == 0 {
            return TurnAction::Discard(0);
        }

        // Computer 3 gives itself away by always throwing the last tile
        match view.player {
            Player::Computer(3) => TurnAction::Discard(len - 1),
            _ => TurnAction::Discard(self.rng.gen_range(0..len)),
        }
    }

    fn choose_response(&mut self, _view: &SeatView<'_>, _discard: Tile, _downstream: bool) -> Response {
        Response::Pass
    }
}

/// Heuristic discards and automatic claims
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedBot;

impl NpcPolicy for AdvancedBot {
    fn tier(&self) -> SkillTier {
        SkillTier::Advanced
    }

    fn choose_turn_action(&mut self, view: &SeatView<'_>) -> TurnAction {
        if view.drawn.is_some() && is_winning_hand(view.hand, view.melds, None) {
            return TurnAction::DeclareWin;
        }

        let fallback = view.hand.len().saturating_sub(1);
        TurnAction::Discard(suggest_discard(view.hand).unwrap_or(fallback))
    }

    fn choose_response(&mut self, view: &SeatView<'_>, discard: Tile, downstream: bool) -> Response {
        if is_winning_hand(view.hand, view.melds, Some(discard)) {
            return Response::Win;
        }
        if can_pung(view.hand, discard) {
            return Response::Pung;
        }
        if downstream {
            if let Some(pair) = chow_options(view.hand, discard).into_iter().next() {
                return Response::Chow(pair);
            }
        }
        Response::Pass
    }
}
