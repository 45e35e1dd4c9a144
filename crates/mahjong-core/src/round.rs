//! The round engine: one hand of play from the deal to a single outcome.
//!
//! A round is a turn state machine:
//!
//! ```text
//! AwaitingDraw(seat) -> AwaitingDiscard(seat) -> AwaitingResponses(discarder, tile)
//!        ^                    |   ^                         |
//!        |                    |   +-- claimed (pung/chow/kong)
//!        +--------------------+------------- passed --------+
//! ```
//!
//! Winning, running out of wall, quitting and restarting are ordinary
//! transitions that end the round with a [`RoundOutcome`]. Broken
//! invariants surface as [`RoundError`], which [`Round::play`] logs and
//! turns into a drawn round, so a round always produces an outcome.

use crate::actions::{Command, Response, RoundEvent};
use crate::bot::{NpcPolicy, SeatView, SkillTier, TurnAction};
use crate::console::{ClaimOptions, Console, Decision, InputError, Notice, Prompt};
use crate::console::{SeatSummary, TableSnapshot};
use crate::hand::{self, ClaimError, Hand, KongKind, Meld, HAND_SIZE};
use crate::player::{is_downstream, next_seat, Player, SeatIndex, SeatState, SEATS};
use crate::tile::{Tile, Wall};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How a round ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Win {
        winner: Player,
        /// The discarder, or `None` for a self-drawn win
        source: Option<Player>,
        score: u32,
    },
    /// Wall exhausted, or the round was abandoned after an internal fault
    Draw { diagnostic: Option<String> },
    Quit,
    /// Replay the round with the same house and roster, unscored
    Restart,
}

/// Invariant violations inside the engine. Never caused by user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("Roster must seat exactly one human and four distinct players")]
    InvalidRoster,

    #[error("{0} is not seated in this round")]
    SeatNotFound(Player),

    #[error("{player} has no tile at index {index}")]
    NoSuchTile { player: Player, index: usize },

    #[error("{player} does not hold the tiles for {meld}")]
    MissingTiles { player: Player, meld: Meld },

    #[error("There is no discard to claim")]
    NoCurrentDiscard,

    #[error("A discard is still waiting for responses")]
    DiscardPending,

    #[error("{player} chose an illegal action: {detail}")]
    IllegalDecision { player: Player, detail: String },

    #[error("Tile count is {actual}, expected {expected}")]
    TilesNotConserved { expected: usize, actual: usize },

    #[error("{player} holds {actual} tiles, expected {expected}")]
    WrongHandSize {
        player: Player,
        expected: usize,
        actual: usize,
    },
}

/// Why a recognized command was refused; the human is asked again
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommandRejected {
    #[error("{0}")]
    Unparsed(String),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("That hand is not complete")]
    NotWinning,

    #[error("You have no kong to declare")]
    NoKong,

    #[error("You cannot pung that tile")]
    NoPung,

    #[error("Only the player after the discarder may chow")]
    ChowNotDownstream,

    #[error("There is no discard to claim on your turn; discard a tile instead")]
    NothingToClaim,

    #[error("It is not your turn to discard; claim the tile or continue")]
    NotYourDiscard,
}

/// Where the round is in the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingDraw(SeatIndex),
    AwaitingDiscard(SeatIndex),
    AwaitingResponses { discarder: SeatIndex, tile: Tile },
}

/// Everything one round owns. All mutation goes through the named
/// operations below so tile conservation and hand sizes hold after each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    pub house: Player,
    pub house_seat: SeatIndex,
    seats: [SeatState; SEATS],
    wall: Wall,
    /// Settled discards, oldest first
    discards: Vec<Tile>,
    current_discard: Option<Tile>,
    current_drawer: SeatIndex,
    /// Tile the seat on turn drew from the wall; `None` after a claim
    drawn: Option<Tile>,
    turn: u32,
    tier: SkillTier,
    phase: TurnPhase,
    events: Vec<RoundEvent>,
    tile_total: usize,
}

impl RoundState {
    /// A round with empty hands, ready to [`deal`](Self::deal)
    pub fn new(
        house: Player,
        roster: [Player; SEATS],
        tier: SkillTier,
        wall: Wall,
    ) -> Result<Self, RoundError> {
        Self::preset(house, roster, tier, Default::default(), wall)
    }

    /// A round with the given hands already dealt and the house about to
    /// draw. Used to replay a known position.
    pub fn preset(
        house: Player,
        roster: [Player; SEATS],
        tier: SkillTier,
        hands: [Hand; SEATS],
        wall: Wall,
    ) -> Result<Self, RoundError> {
        let humans = roster.iter().filter(|p| p.is_human()).count();
        let distinct = roster
            .iter()
            .enumerate()
            .all(|(i, p)| !roster[..i].contains(p));
        if humans != 1 || !distinct {
            return Err(RoundError::InvalidRoster);
        }

        let house_seat = roster
            .iter()
            .position(|&p| p == house)
            .ok_or(RoundError::SeatNotFound(house))?;

        let [h0, h1, h2, h3] = hands;
        let seats = [
            SeatState::new(roster[0], h0),
            SeatState::new(roster[1], h1),
            SeatState::new(roster[2], h2),
            SeatState::new(roster[3], h3),
        ];
        let tile_total = wall.remaining() + seats.iter().map(|s| s.tile_count()).sum::<usize>();

        Ok(Self {
            house,
            house_seat,
            seats,
            wall,
            discards: Vec::new(),
            current_discard: None,
            current_drawer: house_seat,
            drawn: None,
            turn: 0,
            tier,
            phase: TurnPhase::AwaitingDraw(house_seat),
            events: Vec::new(),
            tile_total,
        })
    }

    // ==================== Queries ====================

    pub fn seat(&self, seat: SeatIndex) -> &SeatState {
        &self.seats[seat % SEATS]
    }

    pub fn seats(&self) -> &[SeatState; SEATS] {
        &self.seats
    }

    /// Seat index of a player
    pub fn seat_of(&self, player: Player) -> Result<SeatIndex, RoundError> {
        self.seats
            .iter()
            .position(|s| s.player == player)
            .ok_or(RoundError::SeatNotFound(player))
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn current_drawer(&self) -> SeatIndex {
        self.current_drawer
    }

    pub fn current_discard(&self) -> Option<Tile> {
        self.current_discard
    }

    /// The wall tile behind the current turn, if the seat drew rather than
    /// claimed
    pub fn drawn(&self) -> Option<Tile> {
        self.drawn
    }

    /// Settled discards, most recent first
    pub fn discards(&self) -> impl Iterator<Item = &Tile> {
        self.discards.iter().rev()
    }

    pub fn wall_remaining(&self) -> usize {
        self.wall.remaining()
    }

    /// Discards made so far
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn tier(&self) -> SkillTier {
        self.tier
    }

    pub fn events(&self) -> &[RoundEvent] {
        &self.events
    }

    /// Public view of the table
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            discards: self.discards().copied().collect(),
            current_discard: self.current_discard,
            seats: self
                .seats
                .iter()
                .map(|s| SeatSummary {
                    player: s.player,
                    melds: s.melds.clone(),
                    bonus: s.bonus.clone(),
                    concealed: s.hand.len(),
                })
                .collect(),
            wall_remaining: self.wall.remaining(),
        }
    }

    /// Check tile conservation and every seat's hand size for the current
    /// phase
    pub fn check_invariants(&self) -> Result<(), RoundError> {
        let actual = self.wall.remaining()
            + self.seats.iter().map(|s| s.tile_count()).sum::<usize>()
            + self.discards.len()
            + usize::from(self.current_discard.is_some());
        if actual != self.tile_total {
            return Err(RoundError::TilesNotConserved {
                expected: self.tile_total,
                actual,
            });
        }

        let on_turn = match self.phase {
            TurnPhase::AwaitingDiscard(seat) => Some(seat),
            _ => None,
        };
        for (i, seat) in self.seats.iter().enumerate() {
            let expected = if on_turn == Some(i) {
                HAND_SIZE + 1
            } else {
                HAND_SIZE
            };
            if seat.effective_size() != expected {
                return Err(RoundError::WrongHandSize {
                    player: seat.player,
                    expected,
                    actual: seat.effective_size(),
                });
            }
        }
        Ok(())
    }

    // ==================== Mutations ====================

    /// Deal 13 tiles to each seat starting with the house, replacing bonus
    /// tiles as they come. Returns false if the wall runs out.
    pub fn deal(&mut self) -> bool {
        for offset in 0..SEATS {
            let seat = (self.house_seat + offset) % SEATS;
            for _ in 0..HAND_SIZE {
                if self.draw_into(seat).is_none() {
                    return false;
                }
            }
        }
        self.events.push(RoundEvent::Dealt { house: self.house });
        true
    }

    /// The normal draw at the start of a turn; passes the draw on to the
    /// next seat
    fn draw_for_turn(&mut self, seat: SeatIndex) -> Option<Tile> {
        let tile = self.draw_into(seat)?;
        self.current_drawer = next_seat(seat);
        self.drawn = Some(tile);
        self.phase = TurnPhase::AwaitingDiscard(seat);
        self.log_draw(seat, tile);
        Some(tile)
    }

    /// The extra draw after a kong; the turn pointer does not move
    fn draw_replacement(&mut self, seat: SeatIndex) -> Option<Tile> {
        let tile = self.draw_into(seat)?;
        self.drawn = Some(tile);
        self.phase = TurnPhase::AwaitingDiscard(seat);
        self.log_draw(seat, tile);
        Some(tile)
    }

    fn log_draw(&mut self, seat: SeatIndex, tile: Tile) {
        let player = self.seats[seat].player;
        debug!(%player, %tile, wall = self.wall.remaining(), "drew");
        self.events.push(RoundEvent::Drew {
            player,
            tile: player.is_human().then_some(tile),
        });
    }

    /// Draw from the front of the wall until a non-bonus tile turns up
    fn draw_into(&mut self, seat: SeatIndex) -> Option<Tile> {
        loop {
            let tile = self.wall.draw_front()?;
            let state = &mut self.seats[seat];
            if tile.is_bonus() {
                state.bonus.push(tile);
                self.events.push(RoundEvent::BonusSetAside {
                    player: state.player,
                    tile,
                });
                continue;
            }
            state.hand.add(tile);
            return Some(tile);
        }
    }

    /// Discard the tile at a 0-based index, opening the response window
    fn discard(&mut self, seat: SeatIndex, index: usize) -> Result<Tile, RoundError> {
        if self.current_discard.is_some() {
            return Err(RoundError::DiscardPending);
        }
        let state = &mut self.seats[seat];
        let tile = state.hand.remove_at(index).ok_or(RoundError::NoSuchTile {
            player: state.player,
            index,
        })?;

        debug!(player = %state.player, %tile, "discarded");
        self.events.push(RoundEvent::Discarded {
            player: state.player,
            tile,
        });
        self.current_discard = Some(tile);
        self.drawn = None;
        self.turn += 1;
        self.phase = TurnPhase::AwaitingResponses {
            discarder: seat,
            tile,
        };
        Ok(tile)
    }

    /// Nobody claimed: the discard joins the pile and play moves on
    fn settle_discard(&mut self) {
        if let Some(tile) = self.current_discard.take() {
            self.discards.push(tile);
        }
        self.phase = TurnPhase::AwaitingDraw(self.current_drawer);
    }

    /// Move the current discard and matching concealed tiles into a meld.
    /// The claimant discards next; the seat after it draws after that.
    fn claim(
        &mut self,
        seat: SeatIndex,
        discarder: SeatIndex,
        response: Response,
    ) -> Result<Meld, RoundError> {
        let tile = self.current_discard.ok_or(RoundError::NoCurrentDiscard)?;
        let state = &mut self.seats[seat];

        let (meld, used): (Meld, Vec<Tile>) = match response {
            Response::Pung => (Meld::Pung(tile), vec![tile; 2]),
            Response::Kong => (
                Meld::Kong {
                    tile,
                    concealed: false,
                },
                vec![tile; 3],
            ),
            Response::Chow(pair) => {
                let low = pair[0].min(tile);
                (Meld::Chow(low), pair.to_vec())
            }
            Response::Win | Response::Pass => {
                return Err(RoundError::IllegalDecision {
                    player: state.player,
                    detail: format!("{:?} is not a meld claim", response),
                })
            }
        };

        let mut hand = state.hand.clone();
        let held = used.iter().all(|&t| hand.try_remove(t, 1));
        if !held {
            return Err(RoundError::MissingTiles {
                player: state.player,
                meld,
            });
        }
        state.hand = hand;
        state.melds.push(meld);
        if matches!(meld, Meld::Kong { .. }) {
            state.kong_record += KongKind::Claimed.record_weight();
        }

        let from = self.seats[discarder].player;
        let player = self.seats[seat].player;
        debug!(%player, %from, %meld, "claimed");
        self.events.push(RoundEvent::Claimed { player, from, meld });

        self.current_discard = None;
        self.current_drawer = next_seat(seat);
        self.drawn = None;
        self.phase = TurnPhase::AwaitingDiscard(seat);
        Ok(meld)
    }

    /// Declare a concealed kong or extend an open pung on the seat's own
    /// turn. The replacement draw is separate.
    fn declare_kong(&mut self, seat: SeatIndex, tile: Tile, kind: KongKind) -> Result<(), RoundError> {
        let state = &mut self.seats[seat];
        if !hand::can_kong(&state.hand, &state.melds, tile, kind) {
            return Err(RoundError::IllegalDecision {
                player: state.player,
                detail: format!("{:?} kong of {}", kind, tile),
            });
        }

        match kind {
            KongKind::Concealed => {
                let meld = Meld::Kong {
                    tile,
                    concealed: true,
                };
                if !state.hand.try_remove(tile, 4) {
                    return Err(RoundError::MissingTiles {
                        player: state.player,
                        meld,
                    });
                }
                state.melds.push(meld);
            }
            KongKind::Extension => {
                let meld = Meld::Kong {
                    tile,
                    concealed: false,
                };
                let Some(index) = state.melds.iter().position(|m| *m == Meld::Pung(tile)) else {
                    return Err(RoundError::MissingTiles {
                        player: state.player,
                        meld,
                    });
                };
                if !state.hand.try_remove(tile, 1) {
                    return Err(RoundError::MissingTiles {
                        player: state.player,
                        meld,
                    });
                }
                state.melds[index] = meld;
            }
            KongKind::Claimed => {
                return Err(RoundError::IllegalDecision {
                    player: state.player,
                    detail: "a claimed kong needs a discard".to_string(),
                })
            }
        }
        state.kong_record += kind.record_weight();

        let concealed = kind == KongKind::Concealed;
        debug!(player = %state.player, %tile, concealed, "declared kong");
        self.events.push(RoundEvent::KongDeclared {
            player: state.player,
            tile,
            concealed,
        });
        Ok(())
    }

    /// End the round with a win. Nothing is mutated besides the event log.
    fn win(&mut self, seat: SeatIndex, discarder: Option<SeatIndex>) -> Result<RoundOutcome, RoundError> {
        let extra = match discarder {
            Some(_) => Some(self.current_discard.ok_or(RoundError::NoCurrentDiscard)?),
            None => None,
        };
        let state = &self.seats[seat];
        if discarder.is_none() && self.drawn.is_none() {
            return Err(RoundError::IllegalDecision {
                player: state.player,
                detail: "a self-drawn win needs a tile from the wall this turn".to_string(),
            });
        }
        if !hand::is_winning_hand(&state.hand, &state.melds, extra) {
            return Err(RoundError::IllegalDecision {
                player: state.player,
                detail: "declared a win without a complete hand".to_string(),
            });
        }

        let score = hand::score(&state.hand, &state.melds, extra) + state.kong_record;
        let winner = state.player;
        let source = discarder.map(|d| self.seats[d].player);
        self.events.push(RoundEvent::Won {
            player: winner,
            from: source,
            score,
        });
        Ok(RoundOutcome::Win {
            winner,
            source,
            score,
        })
    }

    /// Whether a response is legal for `seat` against the current discard
    fn is_legal_response(&self, seat: SeatIndex, discarder: SeatIndex, tile: Tile, response: &Response) -> bool {
        let state = &self.seats[seat];
        match response {
            Response::Pass => true,
            Response::Win => hand::is_winning_hand(&state.hand, &state.melds, Some(tile)),
            Response::Kong => hand::can_kong(&state.hand, &state.melds, tile, KongKind::Claimed),
            Response::Pung => hand::can_pung(&state.hand, tile),
            Response::Chow(pair) => {
                is_downstream(discarder, seat) && hand::chow_options(&state.hand, tile).contains(pair)
            }
        }
    }
}

/// What a seat's turn in the response window produced
enum Reply {
    Respond(Response),
    End(RoundOutcome),
}

/// Drives one [`RoundState`] to its outcome, asking the policy for the
/// computer seats and the console for the human
pub struct Round<'a> {
    state: RoundState,
    policy: &'a mut dyn NpcPolicy,
    console: &'a mut dyn Console,
    shown: usize,
}

impl<'a> Round<'a> {
    pub fn new(state: RoundState, policy: &'a mut dyn NpcPolicy, console: &'a mut dyn Console) -> Self {
        Self {
            state,
            policy,
            console,
            shown: 0,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    /// Run until the round ends. Internal faults end it as a draw.
    pub fn play(mut self) -> RoundOutcome {
        loop {
            match self.step() {
                Ok(Some(outcome)) => {
                    info!(?outcome, turns = self.state.turn, "round over");
                    return outcome;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, phase = ?self.state.phase, "round abandoned");
                    return RoundOutcome::Draw {
                        diagnostic: Some(e.to_string()),
                    };
                }
            }
        }
    }

    /// Advance one phase of the turn cycle
    pub fn step(&mut self) -> Result<Option<RoundOutcome>, RoundError> {
        let result = match self.state.phase {
            TurnPhase::AwaitingDraw(seat) => Ok(self.draw_step(seat)),
            TurnPhase::AwaitingDiscard(seat) => self.discard_step(seat),
            TurnPhase::AwaitingResponses { discarder, tile } => self.response_step(discarder, tile),
        };
        self.flush_events();

        let outcome = result?;
        if outcome.is_none() {
            self.state.check_invariants()?;
        }
        Ok(outcome)
    }

    fn draw_step(&mut self, seat: SeatIndex) -> Option<RoundOutcome> {
        match self.state.draw_for_turn(seat) {
            Some(_) => None,
            None => Some(self.wall_exhausted()),
        }
    }

    fn wall_exhausted(&mut self) -> RoundOutcome {
        self.state.events.push(RoundEvent::WallExhausted);
        RoundOutcome::Draw { diagnostic: None }
    }

    fn discard_step(&mut self, seat: SeatIndex) -> Result<Option<RoundOutcome>, RoundError> {
        if self.state.seats[seat].player.is_human() {
            return self.human_turn(seat);
        }

        let action = self
            .policy
            .choose_turn_action(&SeatView::on_turn(&self.state.seats[seat], self.state.drawn));
        match action {
            TurnAction::DeclareWin => self.state.win(seat, None).map(Some),
            TurnAction::Discard(index) => {
                self.state.discard(seat, index)?;
                Ok(None)
            }
        }
    }

    fn human_turn(&mut self, seat: SeatIndex) -> Result<Option<RoundOutcome>, RoundError> {
        loop {
            self.flush_events();
            let command = {
                let state = &self.state.seats[seat];
                let prompt = Prompt {
                    decision: Decision::Discard,
                    hand: &state.hand,
                    melds: &state.melds,
                    options: ClaimOptions::for_turn(state, self.state.drawn),
                    suggestion: hand::suggest_discard(&state.hand).map(|i| i + 1),
                    wall_remaining: self.state.wall.remaining(),
                };
                self.console.request(&prompt)
            };

            let command = match command {
                Ok(command) => command,
                Err(InputError::Closed) => Command::Quit,
                Err(e @ InputError::Parse(_)) => {
                    self.reject(CommandRejected::Unparsed(e.to_string()));
                    continue;
                }
            };

            match command {
                Command::Quit => return Ok(Some(RoundOutcome::Quit)),
                Command::Restart => return Ok(Some(RoundOutcome::Restart)),
                Command::Help => self.console.show(&Notice::Help),
                Command::Played => self.console.show(&Notice::Played(self.state.snapshot())),
                Command::Discard(position) => match self.state.seats[seat].hand.tile_at(position) {
                    Ok(_) => {
                        self.state.discard(seat, position - 1)?;
                        return Ok(None);
                    }
                    Err(e) => self.reject(e.into()),
                },
                Command::Mahjong => {
                    // A claimed tile can only be won on in the response window
                    let state = &self.state.seats[seat];
                    if self.state.drawn.is_some()
                        && hand::is_winning_hand(&state.hand, &state.melds, None)
                    {
                        return self.state.win(seat, None).map(Some);
                    }
                    self.reject(CommandRejected::NotWinning);
                }
                Command::Kong => {
                    let state = &self.state.seats[seat];
                    match hand::self_kong_options(&state.hand, &state.melds).first() {
                        Some(&(tile, kind)) => {
                            self.state.declare_kong(seat, tile, kind)?;
                            if self.state.draw_replacement(seat).is_none() {
                                return Ok(Some(self.wall_exhausted()));
                            }
                        }
                        None => self.reject(CommandRejected::NoKong),
                    }
                }
                Command::Continue | Command::Pung | Command::Chow(..) => {
                    self.reject(CommandRejected::NothingToClaim)
                }
            }
        }
    }

    fn response_step(&mut self, discarder: SeatIndex, tile: Tile) -> Result<Option<RoundOutcome>, RoundError> {
        let mut responses = Vec::with_capacity(SEATS - 1);

        for offset in 1..SEATS {
            let seat = (discarder + offset) % SEATS;
            let downstream = offset == 1;

            let response = if self.state.seats[seat].player.is_human() {
                match self.human_response(seat, discarder, tile, downstream)? {
                    Reply::Respond(response) => response,
                    Reply::End(outcome) => return Ok(Some(outcome)),
                }
            } else {
                let response = self.policy.choose_response(
                    &SeatView::of(&self.state.seats[seat]),
                    tile,
                    downstream,
                );
                if !self.state.is_legal_response(seat, discarder, tile, &response) {
                    return Err(RoundError::IllegalDecision {
                        player: self.state.seats[seat].player,
                        detail: format!("{:?} on {}", response, tile),
                    });
                }
                response
            };
            responses.push((seat, response));
        }

        // Highest priority wins; equal claims go to the seat nearest the
        // discarder, which is already the iteration order
        let chosen = responses
            .into_iter()
            .enumerate()
            .filter(|(_, (_, r))| *r != Response::Pass)
            .min_by_key(|(order, (_, r))| (Reverse(r.priority()), *order))
            .map(|(_, claim)| claim);

        match chosen {
            None => {
                self.state.settle_discard();
                Ok(None)
            }
            Some((seat, Response::Win)) => self.state.win(seat, Some(discarder)).map(Some),
            Some((seat, response)) => {
                self.state.claim(seat, discarder, response)?;
                if response == Response::Kong && self.state.draw_replacement(seat).is_none() {
                    return Ok(Some(self.wall_exhausted()));
                }
                Ok(None)
            }
        }
    }

    fn human_response(
        &mut self,
        seat: SeatIndex,
        discarder: SeatIndex,
        tile: Tile,
        downstream: bool,
    ) -> Result<Reply, RoundError> {
        let options = ClaimOptions::for_discard(&self.state.seats[seat], tile, downstream);
        if !options.any() {
            return Ok(Reply::Respond(Response::Pass));
        }
        let from = self.state.seats[discarder].player;

        loop {
            self.flush_events();
            let command = {
                let state = &self.state.seats[seat];
                let prompt = Prompt {
                    decision: Decision::Respond { tile, from },
                    hand: &state.hand,
                    melds: &state.melds,
                    options: options.clone(),
                    suggestion: None,
                    wall_remaining: self.state.wall.remaining(),
                };
                self.console.request(&prompt)
            };

            let command = match command {
                Ok(command) => command,
                Err(InputError::Closed) => Command::Quit,
                Err(e @ InputError::Parse(_)) => {
                    self.reject(CommandRejected::Unparsed(e.to_string()));
                    continue;
                }
            };

            let rejected = match command {
                Command::Quit => return Ok(Reply::End(RoundOutcome::Quit)),
                Command::Restart => return Ok(Reply::End(RoundOutcome::Restart)),
                Command::Help => {
                    self.console.show(&Notice::Help);
                    continue;
                }
                Command::Played => {
                    self.console.show(&Notice::Played(self.state.snapshot()));
                    continue;
                }
                Command::Continue => return Ok(Reply::Respond(Response::Pass)),
                Command::Mahjong if options.win => return Ok(Reply::Respond(Response::Win)),
                Command::Mahjong => CommandRejected::NotWinning,
                Command::Kong if options.kong => return Ok(Reply::Respond(Response::Kong)),
                Command::Kong => CommandRejected::NoKong,
                Command::Pung if options.pung => return Ok(Reply::Respond(Response::Pung)),
                Command::Pung => CommandRejected::NoPung,
                Command::Chow(..) if !downstream => CommandRejected::ChowNotDownstream,
                Command::Chow(first, second) => {
                    match hand::chow_pair_at(&self.state.seats[seat].hand, tile, first, second) {
                        Ok(pair) => return Ok(Reply::Respond(Response::Chow(pair))),
                        Err(e) => e.into(),
                    }
                }
                Command::Discard(_) => CommandRejected::NotYourDiscard,
            };
            self.reject(rejected);
        }
    }

    fn reject(&mut self, reason: CommandRejected) {
        warn!(%reason, "command rejected");
        self.console.show(&Notice::Rejected(reason));
    }

    /// Show the console every event it has not seen yet
    fn flush_events(&mut self) {
        for event in &self.state.events[self.shown..] {
            self.console.show(&Notice::Event(event.clone()));
        }
        self.shown = self.state.events.len();
    }
}

/// Play one round from a fresh shuffle. Always returns an outcome.
pub fn start_round<R: Rng + ?Sized>(
    house: Player,
    roster: [Player; SEATS],
    policy: &mut dyn NpcPolicy,
    console: &mut dyn Console,
    rng: &mut R,
) -> RoundOutcome {
    let wall = Wall::shuffled(rng);
    let mut state = match RoundState::new(house, roster, policy.tier(), wall) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "round could not start");
            return RoundOutcome::Draw {
                diagnostic: Some(e.to_string()),
            };
        }
    };

    info!(%house, tier = ?state.tier, "round starting");
    if !state.deal() {
        return RoundOutcome::Draw { diagnostic: None };
    }
    Round::new(state, policy, console).play()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{AdvancedBot, BasicBot};
    use crate::console::ScriptedConsole;
    use crate::tile::TOTAL_TILES;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_round_validates_roster() {
        let wall = || Wall::from_tiles(Vec::new());
        let two_humans = [Player::Human, Player::Human, Player::Computer(1), Player::Computer(2)];
        assert_eq!(
            RoundState::new(Player::Human, two_humans, SkillTier::Basic, wall()).err(),
            Some(RoundError::InvalidRoster)
        );

        let no_human = [
            Player::Computer(1),
            Player::Computer(2),
            Player::Computer(3),
            Player::Computer(4),
        ];
        assert_eq!(
            RoundState::new(Player::Computer(1), no_human, SkillTier::Basic, wall()).err(),
            Some(RoundError::InvalidRoster)
        );

        assert_eq!(
            RoundState::new(Player::Computer(9), Player::DEFAULT_ROSTER, SkillTier::Basic, wall()).err(),
            Some(RoundError::SeatNotFound(Player::Computer(9)))
        );
    }

    #[test]
    fn test_deal_gives_thirteen_each() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = RoundState::new(
            Player::Computer(2),
            Player::DEFAULT_ROSTER,
            SkillTier::Advanced,
            Wall::shuffled(&mut rng),
        )
        .unwrap();
        assert_eq!(state.house_seat, 2);
        assert!(state.deal());

        for seat in state.seats() {
            assert_eq!(seat.hand.len(), HAND_SIZE);
            assert!(seat.hand.tiles().iter().all(|t| !t.is_bonus()));
        }
        assert_eq!(state.phase(), TurnPhase::AwaitingDraw(2));
        assert_eq!(state.current_drawer(), 2);
        assert_eq!(state.events().last(), Some(&RoundEvent::Dealt { house: Player::Computer(2) }));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_bonus_tiles_are_replaced_on_draw() {
        use crate::tile::Bonus;
        let hands: [Hand; SEATS] = Default::default();
        let mut state = RoundState::preset(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Basic,
            hands,
            Wall::from_tiles([
                Tile::Bonus(Bonus::Flower(1)),
                Tile::Bonus(Bonus::Season(3)),
                Tile::dots(4),
            ]),
        )
        .unwrap();

        assert_eq!(state.draw_for_turn(0), Some(Tile::dots(4)));
        assert_eq!(state.seat(0).bonus.len(), 2);
        assert_eq!(state.seat(0).hand.tiles(), &[Tile::dots(4)]);
        assert_eq!(state.current_drawer(), 1);
    }

    #[test]
    fn test_replacement_draw_keeps_turn_pointer() {
        let hands: [Hand; SEATS] = Default::default();
        let mut state = RoundState::preset(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Basic,
            hands,
            Wall::from_tiles([Tile::dots(1), Tile::dots(2)]),
        )
        .unwrap();
        state.draw_for_turn(0);
        assert_eq!(state.current_drawer(), 1);
        state.draw_replacement(0);
        assert_eq!(state.current_drawer(), 1);
        assert_eq!(state.draw_replacement(0), None);
    }

    /// 123D 456B 234C 8C with an open pung of 5D
    fn holding_five_dot_pung() -> SeatState {
        let mut seat = SeatState::new(
            Player::Human,
            Hand::from_tiles([
                Tile::dots(1),
                Tile::dots(2),
                Tile::dots(3),
                Tile::bamboo(4),
                Tile::bamboo(5),
                Tile::bamboo(6),
                Tile::characters(2),
                Tile::characters(3),
                Tile::characters(4),
                Tile::characters(8),
            ]),
        );
        seat.melds.push(Meld::Pung(Tile::dots(5)));
        seat
    }

    fn filler() -> Hand {
        Hand::from_tiles((1..=9).map(Tile::bamboo).chain((1..=4).map(Tile::characters)))
    }

    #[test]
    fn test_extension_kong_replaces_from_wall_without_moving_turn() {
        let hands = [Hand::new(), filler(), filler(), filler()];
        let mut state = RoundState::preset(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Advanced,
            hands,
            Wall::from_tiles([Tile::dots(5), Tile::bamboo(9), Tile::dots(7)]),
        )
        .unwrap();
        state.seats[0] = holding_five_dot_pung();
        state.tile_total += state.seats[0].tile_count();
        state.check_invariants().unwrap();

        let mut policy = AdvancedBot;
        let mut console = ScriptedConsole::new([Command::Kong, Command::Quit]);
        let mut round = Round::new(state, &mut policy, &mut console);
        assert_eq!(round.step(), Ok(None));
        assert_eq!(round.step(), Ok(Some(RoundOutcome::Quit)));

        let state = round.state();
        let seat = state.seat(0);
        assert_eq!(
            seat.melds,
            vec![Meld::Kong {
                tile: Tile::dots(5),
                concealed: false,
            }]
        );
        assert_eq!(seat.kong_record, 1);
        assert!(!seat.hand.contains(Tile::dots(5)));
        assert!(seat.hand.contains(Tile::bamboo(9)));
        assert_eq!(state.drawn(), Some(Tile::bamboo(9)));
        assert_eq!(state.current_drawer(), 1);
        assert_eq!(state.phase(), TurnPhase::AwaitingDiscard(0));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_declare_kong_without_the_tiles_changes_nothing() {
        let hands = [Hand::new(), filler(), filler(), filler()];
        let mut state = RoundState::preset(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Advanced,
            hands,
            Wall::from_tiles(Vec::new()),
        )
        .unwrap();
        state.seats[0] = holding_five_dot_pung();
        let before = state.seats[0].clone();

        // Three 2C short of a concealed kong, no fourth 5D for the pung
        assert!(state.declare_kong(0, Tile::characters(2), KongKind::Concealed).is_err());
        assert!(state.declare_kong(0, Tile::dots(5), KongKind::Extension).is_err());
        assert!(state.declare_kong(0, Tile::dots(5), KongKind::Claimed).is_err());
        assert_eq!(state.seats[0], before);
        assert!(state.events().is_empty());
    }

    #[test]
    fn test_self_drawn_win_needs_a_draw_this_turn() {
        let mut tiles = holding_five_dot_pung().hand.tiles().to_vec();
        tiles.retain(|&t| t != Tile::characters(8));
        tiles.extend([Tile::characters(9), Tile::characters(9)]);
        let hands = [Hand::new(), filler(), filler(), filler()];
        let mut state = RoundState::preset(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Advanced,
            hands,
            Wall::from_tiles(Vec::new()),
        )
        .unwrap();
        state.seats[0].hand = Hand::from_tiles(tiles);
        state.seats[0].melds.push(Meld::Pung(Tile::dots(5)));

        // Complete, but the turn came from a claim
        assert!(hand::is_winning_hand(&state.seats[0].hand, &state.seats[0].melds, None));
        assert!(matches!(state.win(0, None), Err(RoundError::IllegalDecision { .. })));

        state.drawn = Some(Tile::characters(9));
        assert!(matches!(
            state.win(0, None),
            Ok(RoundOutcome::Win {
                winner: Player::Human,
                source: None,
                ..
            })
        ));
    }

    #[test]
    fn test_seeded_rounds_always_finish() {
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut policy = AdvancedBot;
            let mut console = ScriptedConsole::new(std::iter::repeat(Command::Discard(1)).take(200));
            let outcome = start_round(
                Player::Computer(1),
                Player::DEFAULT_ROSTER,
                &mut policy,
                &mut console,
                &mut rng,
            );
            assert!(
                !matches!(outcome, RoundOutcome::Draw { diagnostic: Some(_) }),
                "seed {} faulted: {:?}",
                seed,
                outcome
            );
        }
    }

    #[test]
    fn test_bad_roster_downgrades_to_draw() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut policy = BasicBot::with_seed(0);
        let mut console = ScriptedConsole::default();
        let outcome = start_round(
            Player::Computer(7),
            Player::DEFAULT_ROSTER,
            &mut policy,
            &mut console,
            &mut rng,
        );
        assert!(matches!(outcome, RoundOutcome::Draw { diagnostic: Some(_) }));
    }

    #[test]
    fn test_full_wall_is_conserved_after_deal() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = RoundState::new(
            Player::Human,
            Player::DEFAULT_ROSTER,
            SkillTier::Basic,
            Wall::shuffled(&mut rng),
        )
        .unwrap();
        state.deal();
        let held: usize = state.seats().iter().map(|s| s.tile_count()).sum();
        assert_eq!(held + state.wall_remaining(), TOTAL_TILES);
    }
}
