//! Mahjong terminal game: you against three computer opponents.

mod parse;
mod terminal;

use clap::{Parser, ValueEnum};
use mahjong_core::ledger::DEFAULT_ROUNDS;
use mahjong_core::{start_round, MatchConfig, MatchState, Player, SkillTier, Standings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io;
use terminal::TerminalConsole;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mahjong")]
#[command(about = "Play mahjong against three computer opponents")]
struct Args {
    /// Number of scored rounds in the match
    #[arg(short, long, env = "MAHJONG_ROUNDS", default_value_t = DEFAULT_ROUNDS,
          value_parser = clap::value_parser!(u32).range(1..))]
    rounds: u32,

    /// Strength of the computer opponents
    #[arg(short, long, env = "MAHJONG_TIER", value_enum, default_value = "advanced")]
    tier: Tier,

    /// Seed for a reproducible match
    #[arg(long, env = "MAHJONG_SEED")]
    seed: Option<u64>,

    /// Print the final standings as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Tier {
    Basic,
    Advanced,
}

impl From<Tier> for SkillTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Basic => SkillTier::Basic,
            Tier::Advanced => SkillTier::Advanced,
        }
    }
}

impl Args {
    fn config(&self) -> MatchConfig {
        MatchConfig {
            rounds: self.rounds,
            tier: self.tier.into(),
            seed: self.seed,
        }
    }
}

/// What `--json` prints
#[derive(Serialize)]
struct Report<'a> {
    config: &'a MatchConfig,
    standings: Standings,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the table
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = args.config();
    info!(?config, "starting match");

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut ledger = MatchState::new(config, Player::DEFAULT_ROSTER, &mut rng);
    let mut policy = config.tier.policy(StdRng::seed_from_u64(rng.gen()));

    let mut console = TerminalConsole::new(io::stdin().lock(), io::stdout());
    if !args.json {
        println!("Mahjong: {} rounds against the {:?} computers. Type 'help' for commands.", config.rounds, config.tier);
    }

    while !ledger.is_finished() {
        console.round_header(ledger.rounds_played() + 1, ledger.house(), ledger.streak())?;
        let outcome = start_round(
            ledger.house(),
            ledger.roster(),
            &mut *policy,
            &mut console,
            &mut rng,
        );
        console.outcome(&outcome)?;
        ledger.record(&outcome);
    }

    let standings = ledger.standings();
    if args.json {
        let report = Report {
            config: ledger.config(),
            standings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        console.standings(&standings)?;
    }
    Ok(())
}
