//! Mahjong - a four-seat tile-matching game engine
//!
//! This crate provides the rules and the round engine:
//! - A 116-tile catalog (three suits plus flowers and seasons) and the wall
//! - Hand evaluation: claim legality, winning-hand decomposition, scoring
//!   and a discard heuristic
//! - The turn state machine for one round, from the deal to an outcome
//! - Computer opponents at two skill tiers
//! - A score ledger that rotates the house across a match
//!
//! # Architecture
//!
//! The engine performs no I/O. The human seat is driven through the
//! [`Console`] trait, so the same round runs under a terminal front-end or
//! a [`ScriptedConsole`] in tests.
//!
//! # Modules
//!
//! - [`tile`]: Tiles, the catalog and the wall
//! - [`hand`]: Concealed hands, melds and the evaluator
//! - [`player`]: Seat identities and per-seat state
//! - [`actions`]: Human commands, claim responses and round events
//! - [`bot`]: Computer opponent policies
//! - [`console`]: The human seat's input/output boundary
//! - [`round`]: Round state and the turn engine
//! - [`ledger`]: Match configuration and cumulative scores

pub mod actions;
pub mod bot;
pub mod console;
pub mod hand;
pub mod ledger;
pub mod player;
pub mod round;
pub mod tile;

// Re-export commonly used types
pub use actions::{Command, Response, RoundEvent};
pub use bot::{AdvancedBot, BasicBot, NpcPolicy, SeatView, SkillTier, TurnAction};
pub use console::{ClaimOptions, Console, Decision, InputError, Notice, Prompt, ScriptedConsole, TableSnapshot};
pub use hand::{ClaimError, Hand, KongKind, Meld};
pub use ledger::{MatchConfig, MatchState, Standing, Standings};
pub use player::{Player, SeatIndex, SeatState, SEATS};
pub use round::{start_round, CommandRejected, Round, RoundError, RoundOutcome, RoundState, TurnPhase};
pub use tile::{Bonus, Suit, Tile, Wall};
