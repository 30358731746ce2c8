//! Command-line interface for telesketch.

use clap::{Parser, Subcommand};

/// Telesketch - leaderless turn coordination for telephone-drawing games
#[derive(Parser, Debug)]
#[command(name = "telesketch")]
#[command(about = "Telephone-drawing game coordination", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a full game with bot players over the in-memory store
    Simulate {
        /// Number of players
        #[arg(short, long, default_value = "4")]
        players: usize,
    },

    /// Print each player's responsibility rotation for a player count
    Schedule {
        /// Number of players
        #[arg(short, long, default_value = "4")]
        players: usize,
    },
}
