//! Seat identities and per-seat round state.
//!
//! A round addresses seats by index 0-3 only; the roster maps each index
//! to a fixed identity for the round's lifetime.

use crate::hand::{Hand, Meld};
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat index within a round (0-3)
pub type SeatIndex = usize;

/// Seats at the table
pub const SEATS: usize = 4;

/// Who sits in a seat: the one human or one of three computer opponents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Human,
    /// Computer opponent 1-3
    Computer(u8),
}

impl Player {
    /// Human first, then the computers in order
    pub const DEFAULT_ROSTER: [Player; SEATS] = [
        Player::Human,
        Player::Computer(1),
        Player::Computer(2),
        Player::Computer(3),
    ];

    pub fn is_human(&self) -> bool {
        matches!(self, Player::Human)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Human => write!(f, "You"),
            Player::Computer(n) => write!(f, "Computer {}", n),
        }
    }
}

/// The seat that plays after `seat`
pub fn next_seat(seat: SeatIndex) -> SeatIndex {
    (seat + 1) % SEATS
}

/// Whether `seat` plays immediately after `discarder` (the only seat
/// allowed to chow its discard)
pub fn is_downstream(discarder: SeatIndex, seat: SeatIndex) -> bool {
    next_seat(discarder) == seat
}

/// Everything one seat holds during a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatState {
    pub player: Player,
    /// Concealed tiles
    pub hand: Hand,
    /// Declared sets, in the order they were made
    pub melds: Vec<Meld>,
    /// Bonus tiles set aside when drawn
    pub bonus: Vec<Tile>,
    /// Kong bonus: 2 per concealed kong, 1 per claimed or extended kong
    pub kong_record: u32,
}

impl SeatState {
    pub fn new(player: Player, hand: Hand) -> Self {
        Self {
            player,
            hand,
            melds: Vec::new(),
            bonus: Vec::new(),
            kong_record: 0,
        }
    }

    /// Physical tiles this seat holds or has laid down
    pub fn tile_count(&self) -> usize {
        self.hand.len() + self.melds.iter().map(|m| m.len()).sum::<usize>() + self.bonus.len()
    }

    /// Hand size with each meld counted as three tiles; 13 between turns
    /// and 14 while the seat must discard
    pub fn effective_size(&self) -> usize {
        self.hand.len() + self.melds.len() * 3
    }
}
