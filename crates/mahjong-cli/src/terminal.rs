//! Line-oriented console over any reader and writer (stdin/stdout in the
//! binary, in-memory buffers in tests).

use crate::parse::parse_command;
use mahjong_core::{
    Command, Console, Decision, InputError, Meld, Notice, Player, Prompt, RoundEvent, RoundOutcome,
    Standings, TableSnapshot, Tile,
};
use std::io::{self, BufRead, Write};
use tracing::warn;

const HELP: &str = "\
Commands (case-insensitive):
  discard <n>   throw the tile at position n (or just type n)
  continue      let the discard go
  chow <a> <b>  run the discard with the tiles at positions a and b
  pung          claim the discard for a triplet
  kong          claim the discard for a quad, or declare one on your turn
  mahjong       declare a winning hand
  played        show the discards and everyone's open melds
  restart       replay this round
  quit          end the match";

pub struct TerminalConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn round_header(&mut self, number: u32, house: Player, streak: u32) -> io::Result<()> {
        writeln!(self.output)?;
        write!(self.output, "=== Round {}: {} deal", number, house)?;
        if streak > 0 {
            write!(self.output, " (streak {})", streak)?;
        }
        writeln!(self.output, " ===")
    }

    pub fn outcome(&mut self, outcome: &RoundOutcome) -> io::Result<()> {
        match outcome {
            RoundOutcome::Win {
                winner,
                source: Some(from),
                score,
            } => writeln!(self.output, "{} won on {}'s discard for {} points", winner, from, score),
            RoundOutcome::Win {
                winner,
                source: None,
                score,
            } => writeln!(self.output, "{} won self-drawn for {} points", winner, score),
            RoundOutcome::Draw { diagnostic: None } => writeln!(self.output, "The wall is empty. Draw."),
            RoundOutcome::Draw {
                diagnostic: Some(reason),
            } => writeln!(self.output, "Round abandoned as a draw: {}", reason),
            RoundOutcome::Quit => writeln!(self.output, "Quitting."),
            RoundOutcome::Restart => writeln!(self.output, "Restarting the round."),
        }
    }

    pub fn standings(&mut self, standings: &Standings) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "Standings after {} rounds", standings.rounds_played)?;
        for line in &standings.scores {
            writeln!(self.output, "  {:<12}{:>6}", line.player.to_string(), line.score)?;
        }
        match standings.leader() {
            Some(leader) => writeln!(self.output, "Top of the table: {}", leader.player),
            None => Ok(()),
        }
    }

    fn render_prompt(&mut self, prompt: &Prompt<'_>) -> io::Result<()> {
        writeln!(self.output)?;
        if !prompt.melds.is_empty() {
            writeln!(self.output, "Melds: {}", melds(prompt.melds))?;
        }
        let numbered: Vec<String> = prompt
            .hand
            .tiles()
            .iter()
            .enumerate()
            .map(|(i, tile)| format!("{}:{}", i + 1, tile))
            .collect();
        writeln!(self.output, "Hand:  {}", numbered.join(" "))?;

        let options = &prompt.options;
        let mut claims = Vec::new();
        if options.win {
            claims.push("mahjong");
        }
        if options.kong {
            claims.push("kong");
        }
        if options.pung {
            claims.push("pung");
        }
        if !options.chows.is_empty() {
            claims.push("chow");
        }

        match prompt.decision {
            Decision::Discard => {
                write!(self.output, "Your turn ({} left in the wall)", prompt.wall_remaining)?;
                if let Some(position) = prompt.suggestion {
                    write!(self.output, ", suggested discard {}", position)?;
                }
                writeln!(self.output)?;
            }
            Decision::Respond { tile, from } => {
                writeln!(self.output, "{} discarded {}", from, tile)?;
                claims.push("continue");
            }
        }
        if !claims.is_empty() {
            writeln!(self.output, "You may: {}", claims.join(", "))?;
        }
        write!(self.output, "> ")?;
        self.output.flush()
    }

    fn render(&mut self, notice: &Notice) -> io::Result<()> {
        match notice {
            Notice::Event(event) => self.render_event(event),
            Notice::Rejected(reason) => writeln!(self.output, "! {}", reason),
            Notice::Help => writeln!(self.output, "{}", HELP),
            Notice::Played(snapshot) => self.render_table(snapshot),
        }
    }

    fn render_event(&mut self, event: &RoundEvent) -> io::Result<()> {
        match event {
            RoundEvent::Dealt { house } => writeln!(self.output, "Tiles dealt, {} is the house", house),
            RoundEvent::Drew {
                player,
                tile: Some(tile),
            } => writeln!(self.output, "{} drew {}", player, tile),
            // Other seats' draws are noise at the terminal
            RoundEvent::Drew { .. } => Ok(()),
            RoundEvent::BonusSetAside { player, tile } => {
                writeln!(self.output, "{} set aside bonus tile {}", player, tile)
            }
            RoundEvent::Discarded { player, tile } => writeln!(self.output, "{} discarded {}", player, tile),
            RoundEvent::Claimed { player, from, meld } => {
                writeln!(self.output, "{} claimed {}'s discard: {}", player, from, meld)
            }
            RoundEvent::KongDeclared { player, tile, concealed } => {
                let kind = if *concealed { "a concealed" } else { "an extended" };
                writeln!(self.output, "{} declared {} kong of {}", player, kind, tile)
            }
            RoundEvent::Won { player, .. } => writeln!(self.output, "{} declares mahjong!", player),
            RoundEvent::WallExhausted => writeln!(self.output, "No tiles left in the wall"),
        }
    }

    fn render_table(&mut self, snapshot: &TableSnapshot) -> io::Result<()> {
        writeln!(self.output, "Discards (latest first): {}", tiles(&snapshot.discards))?;
        if let Some(tile) = snapshot.current_discard {
            writeln!(self.output, "On the table: {}", tile)?;
        }
        for seat in &snapshot.seats {
            write!(self.output, "  {:<12}{:>2} concealed", seat.player.to_string(), seat.concealed)?;
            if !seat.melds.is_empty() {
                write!(self.output, "  {}", melds(&seat.melds))?;
            }
            if !seat.bonus.is_empty() {
                write!(self.output, "  bonus {}", tiles(&seat.bonus))?;
            }
            writeln!(self.output)?;
        }
        writeln!(self.output, "Wall: {} tiles", snapshot.wall_remaining)
    }

    /// Next non-blank line, or `None` once input is exhausted
    fn read_line(&mut self) -> Option<String> {
        loop {
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => return Some(line),
                Err(e) => {
                    warn!(error = %e, "could not read input");
                    return None;
                }
            }
        }
    }
}

fn tiles(tiles: &[Tile]) -> String {
    tiles.iter().map(Tile::to_string).collect::<Vec<_>>().join(" ")
}

fn melds(melds: &[Meld]) -> String {
    melds.iter().map(Meld::to_string).collect::<Vec<_>>().join(" ")
}

impl<R: BufRead, W: Write> Console for TerminalConsole<R, W> {
    fn request(&mut self, prompt: &Prompt<'_>) -> Result<Command, InputError> {
        if let Err(e) = self.render_prompt(prompt) {
            warn!(error = %e, "could not write prompt");
        }
        let line = self.read_line().ok_or(InputError::Closed)?;
        parse_command(&line)
    }

    fn show(&mut self, notice: &Notice) {
        if let Err(e) = self.render(notice) {
            warn!(error = %e, "could not write to terminal");
        }
    }
}
