//! Telesketch - Unified CLI
//!
//! Simulation and inspection tools for the game coordination core.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use telesketch::{Rotation, max_links, simulate};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate { players } => run_simulation(players).await,
        Command::Schedule { players } => {
            print_schedule(players);
            Ok(())
        }
    }
}

/// Run a full bot game and print every reviewed chain
async fn run_simulation(players: usize) -> Result<()> {
    anyhow::ensure!(players > 0, "a game needs at least one player");

    info!(players, "starting simulation");
    let report = simulate(players).await?;

    println!("game {}", report.game_id);
    for chain in report.chains {
        println!("\nchain of {}", chain.username);
        for (index, link) in chain.links.iter().enumerate() {
            match (&link.word, &link.image_url) {
                (Some(word), _) => println!("  {index}: {word:24} ({})", link.username),
                (_, Some(url)) => println!("  {index}: {url:24} ({})", link.username),
                _ => println!("  {index}: <empty>"),
            }
        }
    }
    Ok(())
}

/// Print the responsibility rotation of every player
fn print_schedule(players: usize) {
    if players == 0 {
        println!("a game needs at least one player");
        return;
    }

    println!(
        "{players} players, chains of {} links",
        max_links(players)
    );
    for own in 0..players {
        let steps: Vec<String> = Rotation::new(players, own)
            .map(|r| format!("chain {} link {}", r.chain_number, r.link_index))
            .collect();
        if steps.is_empty() {
            println!("player {own}: nothing to do");
        } else {
            println!("player {own}: {}", steps.join(" -> "));
        }
    }
}
