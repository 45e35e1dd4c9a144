//! Hands, melds and the hand evaluator.
//!
//! This module contains:
//! - `Hand`: a seat's concealed tiles, kept sorted in catalog order
//! - `Meld`: a declared chow, pung or kong
//! - Pure legality checks for claims and self-declared kongs
//! - Winning-hand detection (four sets plus a pair) and scoring
//! - A discard heuristic shared by the human hint and the advanced bots
//!
//! Nothing here mutates round state; every function reads the hand and
//! melds it is given.

use crate::tile::{Tile, SUITED_KINDS};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sets (runs, triplets or quads) in a complete hand besides the pair
pub const SETS_IN_WINNING_HAND: usize = 4;

/// Concealed tiles a seat holds right after discarding, with no melds
pub const HAND_SIZE: usize = 13;

/// Points every winning hand is worth before bonuses
const BASE_POINTS: u32 = 1;
const SELF_DRAWN_POINTS: u32 = 1;
const CONCEALED_HAND_POINTS: u32 = 1;
const ALL_PUNGS_POINTS: u32 = 1;
const PURE_SUIT_POINTS: u32 = 2;

/// Why a claim could not be made
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClaimError {
    /// A 1-based tile position outside the hand
    #[error("Tile {index} is out of range (hand has {len} tiles)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The positions are valid but the rules do not allow the claim
    #[error("{0}")]
    NotLegal(String),
}

/// Counts per suited tile, indexed by [`Tile::index`]
type Counts = [u8; SUITED_KINDS];

/// A seat's concealed tiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand holding these tiles
    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let mut tiles: Vec<Tile> = tiles.into_iter().collect();
        tiles.sort();
        Self { tiles }
    }

    /// Tiles in display order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// How many copies of a tile are held
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    /// Add a tile, keeping catalog order
    pub fn add(&mut self, tile: Tile) {
        let at = self.tiles.partition_point(|&t| t <= tile);
        self.tiles.insert(at, tile);
    }

    /// The tile at a 1-based position, as a human names it
    pub fn tile_at(&self, position: usize) -> Result<Tile, ClaimError> {
        position
            .checked_sub(1)
            .and_then(|i| self.tiles.get(i))
            .copied()
            .ok_or(ClaimError::IndexOutOfRange {
                index: position,
                len: self.tiles.len(),
            })
    }

    /// Remove the tile at a 0-based index
    pub fn remove_at(&mut self, index: usize) -> Option<Tile> {
        (index < self.tiles.len()).then(|| self.tiles.remove(index))
    }

    /// Remove `n` copies of a tile, or nothing if fewer are held
    pub fn try_remove(&mut self, tile: Tile, n: usize) -> bool {
        if self.count(tile) < n {
            return false;
        }
        for _ in 0..n {
            if let Some(i) = self.tiles.iter().position(|&t| t == tile) {
                self.tiles.remove(i);
            }
        }
        true
    }

    fn counts(&self) -> Counts {
        let mut counts = [0; SUITED_KINDS];
        for tile in &self.tiles {
            if let Some(i) = tile.index() {
                counts[i] += 1;
            }
        }
        counts
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.tiles.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", codes.join(" "))
    }
}

/// How a kong is formed; decides its weight in the kong record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KongKind {
    /// Four matching concealed tiles
    Concealed,
    /// A drawn fourth tile added to an open pung
    Extension,
    /// Three concealed tiles plus another seat's discard
    Claimed,
}

impl KongKind {
    /// Amount added to the seat's kong record
    pub fn record_weight(&self) -> u32 {
        match self {
            KongKind::Concealed => 2,
            KongKind::Extension | KongKind::Claimed => 1,
        }
    }
}

/// A declared set, committed to a seat's open area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Meld {
    /// Run of three, stored by its lowest tile
    Chow(Tile),
    Pung(Tile),
    Kong { tile: Tile, concealed: bool },
}

impl Meld {
    /// The tiles making up this meld
    pub fn tiles(&self) -> Vec<Tile> {
        match *self {
            Meld::Chow(low) => [Some(low), low.offset(1), low.offset(2)]
                .into_iter()
                .flatten()
                .collect(),
            Meld::Pung(tile) => vec![tile; 3],
            Meld::Kong { tile, .. } => vec![tile; 4],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Meld::Chow(_) | Meld::Pung(_) => 3,
            Meld::Kong { .. } => 4,
        }
    }
}

impl fmt::Display for Meld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.tiles().iter().map(|t| t.to_string()).collect();
        match self {
            Meld::Kong {
                concealed: true, ..
            } => write!(f, "[{}]*", codes.join(" ")),
            _ => write!(f, "[{}]", codes.join(" ")),
        }
    }
}

// ==================== Claim legality ====================

/// Whether two concealed copies let this discard complete a triplet
pub fn can_pung(hand: &Hand, tile: Tile) -> bool {
    !tile.is_bonus() && hand.count(tile) >= 2
}

/// Whether a kong of `tile` of the given kind is legal.
///
/// For `Concealed` and `Extension` the tile is already in the hand (the
/// seat just drew it); for `Claimed` it is the current discard.
pub fn can_kong(hand: &Hand, melds: &[Meld], tile: Tile, kind: KongKind) -> bool {
    if tile.is_bonus() {
        return false;
    }
    match kind {
        KongKind::Concealed => hand.count(tile) >= 4,
        KongKind::Extension => hand.contains(tile) && melds.contains(&Meld::Pung(tile)),
        KongKind::Claimed => hand.count(tile) >= 3,
    }
}

/// Kongs the seat on turn could declare, concealed ones first, each group
/// in catalog order
pub fn self_kong_options(hand: &Hand, melds: &[Meld]) -> Vec<(Tile, KongKind)> {
    let mut options = Vec::new();
    let mut seen: Vec<Tile> = Vec::new();

    for &tile in hand.tiles() {
        if seen.contains(&tile) {
            continue;
        }
        seen.push(tile);
        if can_kong(hand, melds, tile, KongKind::Concealed) {
            options.push((tile, KongKind::Concealed));
        }
    }

    for &tile in &seen {
        if can_kong(hand, melds, tile, KongKind::Extension) {
            options.push((tile, KongKind::Extension));
        }
    }

    options
}

/// Concealed tile pairs that complete a run with `tile`.
///
/// Options are ordered by the lowest tile of the resulting run. Whether the
/// seat is allowed to chow at all (only the discarder's downstream
/// neighbour may) is for the caller to decide.
pub fn chow_options(hand: &Hand, tile: Tile) -> Vec<[Tile; 2]> {
    [(-2, -1), (-1, 1), (1, 2)]
        .into_iter()
        .filter_map(|(a, b)| {
            let first = tile.offset(a)?;
            let second = tile.offset(b)?;
            (hand.contains(first) && hand.contains(second)).then_some([first, second])
        })
        .collect()
}

/// Resolve a human's two 1-based positions into a chow pair
pub fn chow_pair_at(
    hand: &Hand,
    tile: Tile,
    first: usize,
    second: usize,
) -> Result<[Tile; 2], ClaimError> {
    let a = hand.tile_at(first)?;
    let b = hand.tile_at(second)?;
    if first == second {
        return Err(ClaimError::NotLegal(
            "Pick two different tiles for the run".to_string(),
        ));
    }

    let pair = if a <= b { [a, b] } else { [b, a] };
    if chow_options(hand, tile).contains(&pair) {
        Ok(pair)
    } else {
        Err(ClaimError::NotLegal(format!(
            "{} and {} do not make a run with {}",
            pair[0], pair[1], tile
        )))
    }
}

// ==================== Winning hands ====================

/// Whether the concealed tiles, the melds and an optional outside tile (a
/// claimed discard) make four sets and a pair.
///
/// Pass `None` for a self-drawn win: the drawn tile is already in the hand.
pub fn is_winning_hand(hand: &Hand, melds: &[Meld], extra: Option<Tile>) -> bool {
    concealed_counts(hand, melds, extra)
        .map(|(mut counts, sets)| decomposes(&mut counts, sets, true))
        .unwrap_or(false)
}

/// Points for a winning hand, or 0 if the hand does not win.
///
/// The seat's kong record is added on top by the round engine.
pub fn score(hand: &Hand, melds: &[Meld], extra: Option<Tile>) -> u32 {
    let Some((mut counts, sets)) = concealed_counts(hand, melds, extra) else {
        return 0;
    };
    if !decomposes(&mut counts, sets, true) {
        return 0;
    }

    let mut points = BASE_POINTS;

    if extra.is_none() {
        points += SELF_DRAWN_POINTS;
    }

    let concealed = melds
        .iter()
        .all(|m| matches!(m, Meld::Kong { concealed: true, .. }));
    if concealed {
        points += CONCEALED_HAND_POINTS;
    }

    let no_chows = !melds.iter().any(|m| matches!(m, Meld::Chow(_)));
    if no_chows && decomposes(&mut counts, sets, false) {
        points += ALL_PUNGS_POINTS;
    }

    let mut suits = hand
        .tiles()
        .iter()
        .copied()
        .chain(extra)
        .chain(melds.iter().flat_map(|m| m.tiles()))
        .filter_map(|t| t.suit());
    if let Some(first) = suits.next() {
        if suits.all(|s| s == first) {
            points += PURE_SUIT_POINTS;
        }
    }

    points
}

/// Counts for the concealed part plus `extra`, and how many sets it must
/// form. `None` when a bonus tile is involved or the melds already exceed
/// a full hand.
fn concealed_counts(hand: &Hand, melds: &[Meld], extra: Option<Tile>) -> Option<(Counts, usize)> {
    let sets = SETS_IN_WINNING_HAND.checked_sub(melds.len())?;
    if hand.tiles().iter().any(|t| t.is_bonus()) {
        return None;
    }

    let mut counts = hand.counts();
    if let Some(tile) = extra {
        counts[tile.index()?] += 1;
    }
    Some((counts, sets))
}

/// Whether `counts` is exactly `sets` sets plus one pair
fn decomposes(counts: &mut Counts, sets: usize, allow_runs: bool) -> bool {
    let total: usize = counts.iter().map(|&c| c as usize).sum();
    if total != sets * 3 + 2 {
        return false;
    }

    for i in 0..SUITED_KINDS {
        if counts[i] >= 2 {
            counts[i] -= 2;
            let found = forms_sets(counts, sets, allow_runs);
            counts[i] += 2;
            if found {
                return true;
            }
        }
    }
    false
}

/// Backtracking over the lowest remaining tile: it must start either a
/// triplet or a run
fn forms_sets(counts: &mut Counts, sets: usize, allow_runs: bool) -> bool {
    let Some(i) = counts.iter().position(|&c| c > 0) else {
        return sets == 0;
    };
    if sets == 0 {
        return false;
    }

    if counts[i] >= 3 {
        counts[i] -= 3;
        let found = forms_sets(counts, sets - 1, allow_runs);
        counts[i] += 3;
        if found {
            return true;
        }
    }

    // Runs never wrap into the next suit
    if allow_runs && i % 9 <= 6 && counts[i + 1] > 0 && counts[i + 2] > 0 {
        counts[i] -= 1;
        counts[i + 1] -= 1;
        counts[i + 2] -= 1;
        let found = forms_sets(counts, sets - 1, allow_runs);
        counts[i] += 1;
        counts[i + 1] += 1;
        counts[i + 2] += 1;
        if found {
            return true;
        }
    }

    false
}

// ==================== Discard heuristic ====================

/// 0-based index of the tile least useful toward a winning shape.
///
/// Copies of the same tile and neighbours within two ranks make a tile
/// useful. Ties go to the lowest tile in catalog order.
pub fn suggest_discard(hand: &Hand) -> Option<usize> {
    let counts = hand.counts();

    hand.tiles()
        .iter()
        .enumerate()
        .map(|(i, tile)| (i, usefulness(&counts, *tile)))
        .min_by_key(|&(i, value)| (value, i))
        .map(|(i, _)| i)
}

fn usefulness(counts: &Counts, tile: Tile) -> u32 {
    let Some(index) = tile.index() else {
        return 0;
    };
    let held = |offset: i8| -> bool {
        tile.offset(offset)
            .and_then(|t| t.index())
            .is_some_and(|i| counts[i] > 0)
    };

    let mut value = (counts[index] as u32).saturating_sub(1) * 4;
    for offset in [-1, 1] {
        if held(offset) {
            value += 2;
        }
    }
    for offset in [-2, 2] {
        if held(offset) {
            value += 1;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Bonus, Suit};
    use pretty_assertions::assert_eq;

    fn d(rank: u8) -> Tile {
        Tile::dots(rank)
    }
    fn b(rank: u8) -> Tile {
        Tile::bamboo(rank)
    }
    fn c(rank: u8) -> Tile {
        Tile::characters(rank)
    }

    /// 1-2-3D, 4-5-6D, 7-7-7B, 2-3-4C, pair 9C
    fn winning_tiles() -> Vec<Tile> {
        vec![
            d(1),
            d(2),
            d(3),
            d(4),
            d(5),
            d(6),
            b(7),
            b(7),
            b(7),
            c(2),
            c(3),
            c(4),
            c(9),
            c(9),
        ]
    }

    #[test]
    fn test_hand_stays_sorted() {
        let mut hand = Hand::from_tiles([c(1), d(5), b(2)]);
        hand.add(d(1));
        assert_eq!(hand.tiles(), &[d(1), d(5), b(2), c(1)]);
        assert_eq!(hand.to_string(), "1D 5D 2B 1C");
    }

    #[test]
    fn test_tile_at_is_one_based() {
        let hand = Hand::from_tiles([d(1), d(2)]);
        assert_eq!(hand.tile_at(1), Ok(d(1)));
        assert_eq!(hand.tile_at(2), Ok(d(2)));
        assert_eq!(
            hand.tile_at(0),
            Err(ClaimError::IndexOutOfRange { index: 0, len: 2 })
        );
        assert_eq!(
            hand.tile_at(3),
            Err(ClaimError::IndexOutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_try_remove_is_all_or_nothing() {
        let mut hand = Hand::from_tiles([d(1), d(1), d(2)]);
        assert!(!hand.try_remove(d(1), 3));
        assert_eq!(hand.len(), 3);
        assert!(hand.try_remove(d(1), 2));
        assert_eq!(hand.tiles(), &[d(2)]);
    }

    #[test]
    fn test_can_pung() {
        let hand = Hand::from_tiles([d(4), d(4), b(1)]);
        assert!(can_pung(&hand, d(4)));
        assert!(!can_pung(&hand, b(1)));
        assert!(!can_pung(&hand, Tile::Bonus(Bonus::Flower(1))));
    }

    #[test]
    fn test_kong_cases() {
        let hand = Hand::from_tiles([d(4), d(4), d(4), d(4), b(2), c(3), c(3), c(3)]);
        let melds = [Meld::Pung(b(2))];

        assert!(can_kong(&hand, &melds, d(4), KongKind::Concealed));
        assert!(!can_kong(&hand, &melds, c(3), KongKind::Concealed));
        assert!(can_kong(&hand, &melds, b(2), KongKind::Extension));
        assert!(!can_kong(&hand, &melds, c(3), KongKind::Extension));
        assert!(can_kong(&hand, &melds, c(3), KongKind::Claimed));
        assert!(!can_kong(&hand, &melds, b(2), KongKind::Claimed));

        assert_eq!(
            self_kong_options(&hand, &melds),
            vec![(d(4), KongKind::Concealed), (b(2), KongKind::Extension)]
        );
    }

    #[test]
    fn test_kong_weights() {
        assert_eq!(KongKind::Concealed.record_weight(), 2);
        assert_eq!(KongKind::Extension.record_weight(), 1);
        assert_eq!(KongKind::Claimed.record_weight(), 1);
    }

    #[test]
    fn test_chow_options_cover_all_positions() {
        let hand = Hand::from_tiles([d(3), d(4), d(6), d(7)]);
        assert_eq!(
            chow_options(&hand, d(5)),
            vec![[d(3), d(4)], [d(4), d(6)], [d(6), d(7)]]
        );
        assert_eq!(chow_options(&hand, b(5)), Vec::<[Tile; 2]>::new());
    }

    #[test]
    fn test_chow_options_do_not_cross_suits() {
        let hand = Hand::from_tiles([d(8), d(9), b(1)]);
        assert_eq!(chow_options(&hand, b(2)), Vec::<[Tile; 2]>::new());
        assert_eq!(chow_options(&hand, d(7)), vec![[d(8), d(9)]]);
    }

    #[test]
    fn test_chow_options_are_deterministic() {
        let hand = Hand::from_tiles([c(1), c(2), c(4), c(5)]);
        assert_eq!(chow_options(&hand, c(3)), chow_options(&hand, c(3)));
    }

    #[test]
    fn test_chow_pair_at_distinguishes_errors() {
        let hand = Hand::from_tiles([d(3), d(4), b(9)]);
        assert_eq!(chow_pair_at(&hand, d(5), 2, 1), Ok([d(3), d(4)]));
        assert_eq!(
            chow_pair_at(&hand, d(5), 1, 9),
            Err(ClaimError::IndexOutOfRange { index: 9, len: 3 })
        );
        assert!(matches!(
            chow_pair_at(&hand, d(5), 1, 3),
            Err(ClaimError::NotLegal(_))
        ));
        assert!(matches!(
            chow_pair_at(&hand, d(5), 1, 1),
            Err(ClaimError::NotLegal(_))
        ));
    }

    #[test]
    fn test_complete_hand_wins() {
        let hand = Hand::from_tiles(winning_tiles());
        assert!(is_winning_hand(&hand, &[], None));
    }

    #[test]
    fn test_removing_any_tile_breaks_the_win() {
        let tiles = winning_tiles();
        for i in 0..tiles.len() {
            let mut rest = tiles.clone();
            rest.remove(i);
            let hand = Hand::from_tiles(rest);
            assert!(!is_winning_hand(&hand, &[], None), "removed {}", tiles[i]);
        }
    }

    #[test]
    fn test_discard_win_needs_the_outside_tile() {
        let mut tiles = winning_tiles();
        let missing = tiles.remove(4); // 5D
        let hand = Hand::from_tiles(tiles);

        assert!(!is_winning_hand(&hand, &[], None));
        assert!(is_winning_hand(&hand, &[], Some(missing)));
        assert!(!is_winning_hand(&hand, &[], Some(b(1))));
    }

    #[test]
    fn test_win_with_open_melds() {
        let melds = [Meld::Pung(b(7)), Meld::Kong { tile: c(1), concealed: false }];
        let hand = Hand::from_tiles([d(1), d(2), d(3), d(4), d(5), d(6), c(9)]);
        assert!(is_winning_hand(&hand, &melds, Some(c(9))));
        assert!(!is_winning_hand(&hand, &melds, None));
    }

    #[test]
    fn test_ambiguous_shapes_need_backtracking() {
        // 1112345678999D: nine gates shape, wins on any dots tile
        let mut tiles = vec![d(1), d(1), d(1)];
        tiles.extend((2..=8).map(d));
        tiles.extend([d(9), d(9), d(9)]);
        let hand = Hand::from_tiles(tiles);
        for rank in 1..=9 {
            assert!(is_winning_hand(&hand, &[], Some(d(rank))), "waits on {}D", rank);
        }
    }

    #[test]
    fn test_runs_do_not_wrap_suits() {
        let hand = Hand::from_tiles([
            d(8),
            d(9),
            b(1),
            d(1),
            d(1),
            d(1),
            d(2),
            d(2),
            d(2),
            d(3),
            d(3),
            d(3),
            d(5),
            d(5),
        ]);
        assert!(!is_winning_hand(&hand, &[], None));
    }

    #[test]
    fn test_bonus_tiles_never_win() {
        let mut tiles = winning_tiles();
        tiles[13] = Tile::Bonus(Bonus::Flower(1));
        let hand = Hand::from_tiles(tiles);
        assert!(!is_winning_hand(&hand, &[], None));
        assert_eq!(score(&hand, &[], None), 0);
    }

    #[test]
    fn test_score_breakdown() {
        let hand = Hand::from_tiles(winning_tiles());
        // base + self-drawn + concealed
        assert_eq!(score(&hand, &[], None), 3);

        let mut tiles = winning_tiles();
        let missing = tiles.remove(0);
        let hand = Hand::from_tiles(tiles);
        // base + concealed
        assert_eq!(score(&hand, &[], Some(missing)), 2);
    }

    #[test]
    fn test_score_all_pungs_pure_suit() {
        let melds = [Meld::Pung(d(2)), Meld::Kong { tile: d(9), concealed: true }];
        let hand = Hand::from_tiles([d(4), d(4), d(4), d(6), d(6), d(6), d(8)]);
        // base + all pungs + pure suit, claimed discard, open pung
        assert_eq!(score(&hand, &melds, Some(d(8))), 1 + 1 + 2);
    }

    #[test]
    fn test_non_winning_hand_scores_zero() {
        let hand = Hand::from_tiles([d(1), d(5), b(9)]);
        assert_eq!(score(&hand, &[], None), 0);
    }

    #[test]
    fn test_suggest_discard_prefers_isolated_tiles() {
        let hand = Hand::from_tiles([d(1), d(2), d(3), b(5), b(5), c(9)]);
        assert_eq!(hand.tiles()[suggest_discard(&hand).unwrap()], c(9));
    }

    #[test]
    fn test_suggest_discard_tie_breaks_by_catalog_order() {
        let hand = Hand::from_tiles([c(9), b(5), d(1)]);
        assert_eq!(suggest_discard(&hand), Some(0));
        assert_eq!(hand.tiles()[0], d(1));
        assert_eq!(suggest_discard(&Hand::new()), None);
    }

    #[test]
    fn test_meld_tiles() {
        assert_eq!(Meld::Chow(Tile::new(Suit::Bamboo, 3)).tiles(), vec![b(3), b(4), b(5)]);
        assert_eq!(Meld::Kong { tile: c(2), concealed: true }.len(), 4);
        assert_eq!(Meld::Kong { tile: c(2), concealed: true }.to_string(), "[2C 2C 2C 2C]*");
    }
}
