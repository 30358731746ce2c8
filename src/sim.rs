//! Bot players for driving full games in-process.
//!
//! Bots embed a client the way a UI would: they watch the lifecycle state
//! and answer each prompting state with a submission. A full simulation
//! runs one shared store, one shared image bucket, and one independent
//! client per player - the same topology as real devices on a hosted
//! backend.

use crate::error::GameError;
use crate::images::{ImageStore, MemoryImages};
use crate::machine::{ClientHandle, GameClient, GameState};
use crate::profile::{IdentityProvider, MemoryIdentity};
use crate::service::GameService;
use crate::store::{DocumentStore, MemoryStore};
use crate::words;
use crate::game::types::ReviewLink;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

/// Outcome of one simulated game.
#[derive(Debug)]
pub struct SimulationReport {
    /// The generated game id.
    pub game_id: String,
    /// Every player's completed, attributed chain.
    pub chains: Vec<PlayerChain>,
}

/// One player's completed chain.
#[derive(Debug)]
pub struct PlayerChain {
    /// The bot's display name.
    pub username: String,
    /// The chain as shown at review.
    pub links: Vec<ReviewLink>,
}

/// A drawing a bot would make: the word, scribbled into an svg.
fn scribble(word: &str) -> Vec<u8> {
    format!("<svg xmlns=\"http://www.w3.org/2000/svg\"><text x=\"8\" y=\"16\">{word}</text></svg>")
        .into_bytes()
}

/// Answers every prompting state of one client until its lifecycle ends.
///
/// Joins with a random seed word, draws whatever word is shown, and
/// guesses a random word - telephone-game degradation included.
pub async fn run_bot(handle: ClientHandle, username: String) {
    let mut states = handle.state_updates();
    loop {
        let state = *states.borrow_and_update();
        match state {
            GameState::JoinGame => {
                let joined = handle
                    .game_updates()
                    .borrow()
                    .joined(handle.user_id());
                if !joined {
                    let word = words::random_word();
                    if let Err(error) = handle.join_game(&username, word).await {
                        warn!(%error, %username, "bot failed to join");
                    }
                }
            }
            GameState::Draw => {
                if let Some(word) = handle.view().word_to_draw {
                    handle.submit_drawing(scribble(&word));
                }
            }
            GameState::Guess => {
                handle.submit_guess(words::random_word());
            }
            state if state.is_final() => return,
            _ => {}
        }
        if states.changed().await.is_err() {
            return;
        }
    }
}

/// Runs a complete game with `player_count` bots over an in-memory store.
///
/// The first bot creates the game and starts it once everyone has joined.
/// Returns every player's reviewed chain.
#[instrument]
pub async fn simulate(player_count: usize) -> Result<SimulationReport, GameError> {
    assert!(player_count > 0, "a game needs at least one player");

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let images: Arc<dyn ImageStore> = Arc::new(MemoryImages::new());
    let game_id = words::game_id();
    info!(%game_id, player_count, "simulating game");

    let identities: Vec<MemoryIdentity> =
        (0..player_count).map(|_| MemoryIdentity::new()).collect();
    GameService::create_game(&store, &identities[0].user_id(), &game_id).await?;

    let mut clients = JoinSet::new();
    let mut bots = JoinSet::new();
    let mut handles = Vec::with_capacity(player_count);

    for (index, identity) in identities.iter().enumerate() {
        let username = format!("bot-{index}");
        identity.save_username(&username);
        let service = GameService::connect(Arc::clone(&store), identity.user_id(), &game_id);
        let client = GameClient::new(service, Arc::clone(&images));
        let handle = client.handle();
        clients.spawn(client.run());
        bots.spawn(run_bot(handle.clone(), username));
        handles.push(handle);
    }

    // The starter waits for the full table before dealing out numbers.
    let starter = handles[0].clone();
    let expected = player_count;
    bots.spawn(async move {
        let mut roster = starter.game_updates();
        let everyone_in = roster
            .wait_for(|game| {
                game.players.iter().filter(|p| p.username.is_some()).count() == expected
            })
            .await
            .is_ok();
        if everyone_in {
            if let Err(error) = starter.start_game().await {
                warn!(%error, "starter failed to start the game");
            }
        }
    });

    while let Some(finished) = clients.join_next().await {
        let state = finished.expect("client task panicked")?;
        assert!(state.is_final(), "client stopped in non-final state {state}");
    }
    bots.abort_all();

    let chains = handles
        .iter()
        .enumerate()
        .map(|(index, handle)| PlayerChain {
            username: format!("bot-{index}"),
            links: handle.view().chain.unwrap_or_default(),
        })
        .collect();

    Ok(SimulationReport { game_id, chains })
}
