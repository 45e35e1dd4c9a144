//! The boundary between the round engine and the human seat.
//!
//! The engine never reads input itself. At each decision point it hands a
//! [`Console`] a [`Prompt`] and blocks until a parsed [`Command`] comes
//! back. Everything the human should see goes out as a [`Notice`].

use crate::actions::{Command, RoundEvent};
use crate::hand::{can_kong, can_pung, chow_options, is_winning_hand, self_kong_options};
use crate::hand::{Hand, KongKind, Meld};
use crate::player::{Player, SeatState};
use crate::round::CommandRejected;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Why the console could not produce a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The line was not a recognized command
    #[error("Could not understand '{0}'")]
    Parse(String),

    /// No more input will arrive
    #[error("Input closed")]
    Closed,
}

/// Where in the turn the human is being asked to act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The human's own turn: discard, declare a kong, or declare a win
    Discard,
    /// Another seat discarded `tile`
    Respond { tile: Tile, from: Player },
}

/// Claims available at a decision point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOptions {
    pub win: bool,
    pub kong: bool,
    pub pung: bool,
    /// Run options, only ever filled for the downstream seat
    pub chows: Vec<[Tile; 2]>,
}

impl ClaimOptions {
    /// Options on the seat's own turn. `drawn` is the wall tile taken this
    /// turn; a turn reached by claiming offers no win.
    pub fn for_turn(seat: &SeatState, drawn: Option<Tile>) -> Self {
        Self {
            win: drawn.is_some() && is_winning_hand(&seat.hand, &seat.melds, None),
            kong: !self_kong_options(&seat.hand, &seat.melds).is_empty(),
            pung: false,
            chows: Vec::new(),
        }
    }

    /// Options on another seat's discard
    pub fn for_discard(seat: &SeatState, tile: Tile, downstream: bool) -> Self {
        Self {
            win: is_winning_hand(&seat.hand, &seat.melds, Some(tile)),
            kong: can_kong(&seat.hand, &seat.melds, tile, KongKind::Claimed),
            pung: can_pung(&seat.hand, tile),
            chows: if downstream {
                chow_options(&seat.hand, tile)
            } else {
                Vec::new()
            },
        }
    }

    /// Whether anything at all can be claimed
    pub fn any(&self) -> bool {
        self.win || self.kong || self.pung || !self.chows.is_empty()
    }
}

/// A request for the human's next command
#[derive(Debug, Clone)]
pub struct Prompt<'a> {
    pub decision: Decision,
    pub hand: &'a Hand,
    pub melds: &'a [Meld],
    pub options: ClaimOptions,
    /// 1-based position the discard heuristic would throw
    pub suggestion: Option<usize>,
    pub wall_remaining: usize,
}

/// One seat's public side of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSummary {
    pub player: Player,
    pub melds: Vec<Meld>,
    pub bonus: Vec<Tile>,
    pub concealed: usize,
}

/// What `Played` shows: public information only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Discard history, most recent first
    pub discards: Vec<Tile>,
    pub current_discard: Option<Tile>,
    pub seats: Vec<SeatSummary>,
    pub wall_remaining: usize,
}

/// Output for the human
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Event(RoundEvent),
    Rejected(CommandRejected),
    Help,
    Played(TableSnapshot),
}

/// The human seat's input and output
pub trait Console {
    /// Block until the human has a command for this decision point
    fn request(&mut self, prompt: &Prompt<'_>) -> Result<Command, InputError>;

    fn show(&mut self, notice: &Notice);
}

/// Replays a fixed list of commands and records everything shown.
///
/// Once the list runs out every request reports [`InputError::Closed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    commands: VecDeque<Command>,
    pub decisions: Vec<Decision>,
    pub notices: Vec<Notice>,
}

impl ScriptedConsole {
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            decisions: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Commands not yet consumed
    pub fn remaining(&self) -> usize {
        self.commands.len()
    }

    /// Every rejection shown so far
    pub fn rejections(&self) -> Vec<&CommandRejected> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::Rejected(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// Every round event shown so far
    pub fn events(&self) -> Vec<&RoundEvent> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::Event(event) => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl Console for ScriptedConsole {
    fn request(&mut self, prompt: &Prompt<'_>) -> Result<Command, InputError> {
        self.decisions.push(prompt.decision);
        self.commands.pop_front().ok_or(InputError::Closed)
    }

    fn show(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
