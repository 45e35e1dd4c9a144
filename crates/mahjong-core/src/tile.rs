//! Tile catalog and the wall.
//!
//! This module contains:
//! - The three suits and the suited tiles (ranks 1-9, four copies each)
//! - Bonus tiles (flowers and seasons), which never enter a hand
//! - The wall: a shuffled, draw-from-the-front sequence of every tile

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Copies of each suited tile in the set
pub const COPIES_PER_TILE: usize = 4;

/// Number of distinct suited tiles (3 suits x 9 ranks)
pub const SUITED_KINDS: usize = 27;

/// Total tiles in the wall before dealing: 108 suited + 8 bonus
pub const TOTAL_TILES: usize = SUITED_KINDS * COPIES_PER_TILE + 8;

/// Tile suit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    Dots,
    Bamboo,
    Characters,
}

impl Suit {
    /// All suits, in catalog order
    pub const ALL: [Suit; 3] = [Suit::Dots, Suit::Bamboo, Suit::Characters];

    /// Single-letter code used when printing tiles
    pub fn code(&self) -> char {
        match self {
            Suit::Dots => 'D',
            Suit::Bamboo => 'B',
            Suit::Characters => 'C',
        }
    }
}

/// Bonus tiles are set aside when drawn and replaced from the wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bonus {
    /// Flower 1-4
    Flower(u8),
    /// Season 1-4
    Season(u8),
}

/// A tile, compared by value.
///
/// The derived ordering is the catalog order: suited tiles by suit then
/// rank, then bonus tiles. Hands are kept sorted in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tile {
    Suited { suit: Suit, rank: u8 },
    Bonus(Bonus),
}

impl Tile {
    /// Create a suited tile.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is outside 1-9. Use [`Tile::try_new`] for ranks
    /// that come from input.
    pub const fn new(suit: Suit, rank: u8) -> Self {
        match Tile::try_new(suit, rank) {
            Some(tile) => tile,
            None => panic!("tile rank must be 1-9"),
        }
    }

    /// Create a suited tile, or `None` if `rank` is outside 1-9
    pub const fn try_new(suit: Suit, rank: u8) -> Option<Self> {
        if rank >= 1 && rank <= 9 {
            Some(Tile::Suited { suit, rank })
        } else {
            None
        }
    }

    /// Shorthand for a dots tile
    pub const fn dots(rank: u8) -> Self {
        Tile::new(Suit::Dots, rank)
    }

    /// Shorthand for a bamboo tile
    pub const fn bamboo(rank: u8) -> Self {
        Tile::new(Suit::Bamboo, rank)
    }

    /// Shorthand for a characters tile
    pub const fn characters(rank: u8) -> Self {
        Tile::new(Suit::Characters, rank)
    }

    /// Whether this tile is set aside on draw instead of entering the hand
    pub fn is_bonus(&self) -> bool {
        matches!(self, Tile::Bonus(_))
    }

    pub fn suit(&self) -> Option<Suit> {
        match self {
            Tile::Suited { suit, .. } => Some(*suit),
            Tile::Bonus(_) => None,
        }
    }

    pub fn rank(&self) -> Option<u8> {
        match self {
            Tile::Suited { rank, .. } => Some(*rank),
            Tile::Bonus(_) => None,
        }
    }

    /// Dense index 0..27 for suited tiles, used by count tables. `None`
    /// for bonus tiles and for a hand-built `Suited` with a bad rank.
    pub fn index(&self) -> Option<usize> {
        match self {
            Tile::Suited { suit, rank } if (1..=9).contains(rank) => {
                Some(*suit as usize * 9 + (*rank as usize - 1))
            }
            _ => None,
        }
    }

    /// Inverse of [`Tile::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= SUITED_KINDS {
            return None;
        }
        Some(Tile::new(Suit::ALL[index / 9], (index % 9) as u8 + 1))
    }

    /// The suited tile `offset` ranks away in the same suit, if it exists
    pub fn offset(&self, offset: i8) -> Option<Self> {
        match self {
            Tile::Suited { suit, rank } => {
                let target = *rank as i8 + offset;
                (1..=9).contains(&target).then(|| Tile::new(*suit, target as u8))
            }
            Tile::Bonus(_) => None,
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tile::Suited { suit, rank } => write!(f, "{}{}", rank, suit.code()),
            Tile::Bonus(Bonus::Flower(n)) => write!(f, "F{}", n),
            Tile::Bonus(Bonus::Season(n)) => write!(f, "S{}", n),
        }
    }
}

/// Every tile instance in the game, in deterministic catalog order
pub fn all_tiles() -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(TOTAL_TILES);

    for suit in Suit::ALL {
        for rank in 1..=9 {
            tiles.extend(std::iter::repeat(Tile::new(suit, rank)).take(COPIES_PER_TILE));
        }
    }

    for n in 1..=4 {
        tiles.push(Tile::Bonus(Bonus::Flower(n)));
    }
    for n in 1..=4 {
        tiles.push(Tile::Bonus(Bonus::Season(n)));
    }

    tiles
}

/// Whether a tile is set aside and replaced when drawn
pub fn is_bonus(tile: Tile) -> bool {
    tile.is_bonus()
}

/// The undrawn tiles. Draws come off the front; never reshuffled mid-round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    tiles: VecDeque<Tile>,
}

impl Wall {
    /// A wall holding exactly these tiles, front first
    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        Self {
            tiles: tiles.into_iter().collect(),
        }
    }

    /// A randomly permuted copy of [`all_tiles`]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut tiles = all_tiles();
        tiles.shuffle(rng);
        Self::from_tiles(tiles)
    }

    /// Remove and return the front tile, `None` once the wall is exhausted
    pub fn draw_front(&mut self) -> Option<Tile> {
        self.tiles.pop_front()
    }

    /// Look at the front tile without drawing it
    pub fn peek(&self) -> Option<Tile> {
        self.tiles.front().copied()
    }

    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
