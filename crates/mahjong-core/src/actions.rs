//! Commands, claim responses and round events.
//!
//! `Command` is what the human's console hands the engine once a line of
//! input has been parsed. `Response` is a seat's answer to another seat's
//! discard, whoever made it. `RoundEvent` records what happened at the
//! table.

use crate::hand::Meld;
use crate::player::Player;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};

/// A parsed command from the human seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Discard the tile at this 1-based position
    Discard(usize),
    /// Let the current discard go
    Continue,
    /// Run with the discard, using the tiles at these 1-based positions
    Chow(usize, usize),
    Pung,
    Kong,
    /// Declare a winning hand
    Mahjong,
    Quit,
    Restart,
    Help,
    /// Show the discard history and everyone's open melds
    Played,
}

/// A seat's answer to another seat's discard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Pass,
    /// Run completed by the two concealed tiles given
    Chow([Tile; 2]),
    Pung,
    Kong,
    /// Win on the discard
    Win,
}

impl Response {
    /// Claims resolve highest first: win, kong, pung, chow
    pub fn priority(&self) -> u8 {
        match self {
            Response::Pass => 0,
            Response::Chow(_) => 1,
            Response::Pung => 2,
            Response::Kong => 3,
            Response::Win => 4,
        }
    }
}

/// Things that happen at the table during a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    /// Starting hands dealt
    Dealt { house: Player },

    /// A seat drew from the wall. The tile is only revealed for the human.
    Drew { player: Player, tile: Option<Tile> },

    /// A drawn bonus tile was set aside
    BonusSetAside { player: Player, tile: Tile },

    Discarded { player: Player, tile: Tile },

    /// A discard was claimed into a meld
    Claimed {
        player: Player,
        from: Player,
        meld: Meld,
    },

    /// A seat declared a kong on its own turn
    KongDeclared {
        player: Player,
        tile: Tile,
        concealed: bool,
    },

    Won {
        player: Player,
        from: Option<Player>,
        score: u32,
    },

    /// A draw was needed but the wall is empty
    WallExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_priority_order() {
        let mut claims = vec![
            Response::Pung,
            Response::Pass,
            Response::Win,
            Response::Chow([Tile::dots(1), Tile::dots(2)]),
            Response::Kong,
        ];
        claims.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        assert_eq!(claims[0], Response::Win);
        assert_eq!(claims[1], Response::Kong);
        assert_eq!(claims[2], Response::Pung);
        assert!(matches!(claims[3], Response::Chow(_)));
        assert_eq!(claims[4], Response::Pass);
    }
}
