//! Tests for the reactive game lifecycle.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telesketch::{
    AlternatingMediaInvariant, CollectionPath, DocPath, Document, DocumentStore, GameClient,
    GameService, GameState, ImageStore, Invariant, Link, MemoryImages, MemoryStore, StoreError,
    run_bot, simulate,
};
use tokio::sync::watch;
use tokio::time::timeout;

const TICK: Duration = Duration::from_secs(5);

fn stores() -> (Arc<dyn DocumentStore>, Arc<dyn ImageStore>) {
    (
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryImages::new()),
    )
}

async fn wait_for_state(
    rx: &mut watch::Receiver<GameState>,
    wanted: GameState,
) -> GameState {
    timeout(TICK, rx.wait_for(|state| *state == wanted))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
        .map(|state| *state)
        .expect("state stream ended")
}

#[tokio::test]
async fn test_missing_game_is_terminal() {
    let (store, images) = stores();
    let service = GameService::connect(store, "u1", "no-such-game");
    let client = GameClient::new(service, images);

    let state = timeout(TICK, client.run()).await.unwrap().unwrap();
    assert_eq!(state, GameState::GameDoesNotExist);
}

#[tokio::test]
async fn test_joining_a_started_game_is_rejected() {
    let (store, images) = stores();
    GameService::create_game(&store, "starter", "g").await.unwrap();
    let starter = GameService::connect(Arc::clone(&store), "starter", "g");
    starter.join_game("amy", "lighthouse").await.unwrap();
    starter.start_game().await.unwrap();

    let latecomer = GameService::connect(store, "latecomer", "g");
    let client = GameClient::new(latecomer, images);
    let state = timeout(TICK, client.run()).await.unwrap().unwrap();
    assert_eq!(state, GameState::GameAlreadyStarted);
}

#[tokio::test]
async fn test_solo_game_reviews_the_seed_word() {
    let (store, images) = stores();
    GameService::create_game(&store, "starter", "g").await.unwrap();
    let service = GameService::connect(store, "starter", "g");
    let client = GameClient::new(service, images);
    let handle = client.handle();
    let run = tokio::spawn(client.run());

    let mut states = handle.state_updates();
    wait_for_state(&mut states, GameState::JoinGame).await;
    handle.join_game("amy", "lighthouse").await.unwrap();

    wait_for_state(&mut states, GameState::StartGame).await;
    handle.start_game().await.unwrap();

    let state = timeout(TICK, run).await.unwrap().unwrap().unwrap();
    assert_eq!(state, GameState::Review);

    let chain = handle.view().chain.expect("review shows a chain");
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].word.as_deref(), Some("lighthouse"));
    assert_eq!(chain[0].username, "amy");
}

#[tokio::test]
async fn test_lifecycle_states_advance_exactly_once() {
    let (store, images) = stores();
    GameService::create_game(&store, "starter", "g").await.unwrap();
    let service = GameService::connect(store, "starter", "g");
    let client = GameClient::new(service, images);
    let handle = client.handle();

    // Record every state the machine publishes.
    let mut recorder_rx = handle.state_updates();
    let recorded = Arc::new(Mutex::new(vec![*recorder_rx.borrow_and_update()]));
    let recorded_in_task = Arc::clone(&recorded);
    let recorder = tokio::spawn(async move {
        while recorder_rx.changed().await.is_ok() {
            recorded_in_task
                .lock()
                .unwrap()
                .push(*recorder_rx.borrow_and_update());
        }
    });

    let run = tokio::spawn(client.run());
    let mut states = handle.state_updates();
    wait_for_state(&mut states, GameState::JoinGame).await;
    handle.join_game("amy", "acorn").await.unwrap();
    // Rejoining qualifies the armed wait again; it must not fire again.
    handle.join_game("amy", "acorn").await.unwrap();
    wait_for_state(&mut states, GameState::StartGame).await;
    handle.start_game().await.unwrap();

    let state = timeout(TICK, run).await.unwrap().unwrap().unwrap();
    assert_eq!(state, GameState::Review);
    recorder.abort();

    // A solo lifecycle can only move forward through these states; any
    // repeat would mean a wait fired twice.
    let expected = [
        GameState::LoadingGame,
        GameState::JoinGame,
        GameState::StartGame,
        GameState::WaitingForReview,
        GameState::Review,
    ];
    let observed = recorded.lock().unwrap().clone();
    let mut cursor = 0;
    for state in &observed {
        let position = expected[cursor..]
            .iter()
            .position(|expected_state| expected_state == state)
            .unwrap_or_else(|| panic!("state {state} repeated or out of order in {observed:?}"));
        cursor += position + 1;
    }
    assert_eq!(*observed.last().unwrap(), GameState::Review);
}

#[tokio::test]
async fn test_four_player_game_completes_all_chains() {
    let report = timeout(Duration::from_secs(30), simulate(4))
        .await
        .expect("simulation timed out")
        .unwrap();

    assert_eq!(report.chains.len(), 4);
    for chain in &report.chains {
        let links: Vec<Link> = chain
            .links
            .iter()
            .map(|link| match (&link.word, &link.image_url) {
                (Some(word), None) => Link::Word(word.clone()),
                (None, Some(url)) => Link::Drawing(telesketch::ImageRef::new(url.clone())),
                other => panic!("link is neither word nor image: {other:?}"),
            })
            .collect();
        assert_eq!(links.len(), 5, "chain of {}", chain.username);
        assert!(
            AlternatingMediaInvariant::holds(&links),
            "chain of {} does not alternate",
            chain.username
        );
        for link in &chain.links {
            assert!(
                link.username.starts_with("bot-"),
                "unattributed link in chain of {}",
                chain.username
            );
        }
    }
}

#[tokio::test]
async fn test_three_player_game_completes_all_chains() {
    let report = timeout(Duration::from_secs(30), simulate(3))
        .await
        .expect("simulation timed out")
        .unwrap();
    assert_eq!(report.chains.len(), 3);
    for chain in &report.chains {
        assert_eq!(chain.links.len(), 3, "chain of {}", chain.username);
    }
}

/// Store wrapper that counts writes per document path.
struct CountingStore {
    inner: MemoryStore,
    writes: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            writes: Mutex::new(HashMap::new()),
        }
    }

    fn writes_to(&self, path: &DocPath) -> usize {
        self.writes
            .lock()
            .unwrap()
            .get(path.as_str())
            .copied()
            .unwrap_or(0)
    }

    fn chain_write_counts(&self) -> Vec<(String, usize)> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.contains("/chain/"))
            .map(|(path, count)| (path.clone(), *count))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    fn subscribe_doc(&self, path: &DocPath) -> watch::Receiver<Option<Document>> {
        self.inner.subscribe_doc(path)
    }

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> watch::Receiver<Vec<(String, Document)>> {
        self.inner.subscribe_collection(path)
    }

    async fn write(&self, path: &DocPath, patch: Document) -> Result<(), StoreError> {
        *self
            .writes
            .lock()
            .unwrap()
            .entry(path.as_str().to_string())
            .or_insert(0) += 1;
        self.inner.write(path, patch).await
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<(), StoreError> {
        self.inner.batch_write(writes).await
    }
}

#[tokio::test]
async fn test_duplicate_tab_never_writes_a_completed_step() {
    let counting = Arc::new(CountingStore::new());
    let store: Arc<dyn DocumentStore> = Arc::clone(&counting) as Arc<dyn DocumentStore>;
    let images: Arc<dyn ImageStore> = Arc::new(MemoryImages::new());
    GameService::create_game(&store, "user-a", "g").await.unwrap();

    // Player A runs two tabs; only the first has a user behind it. Player B
    // runs one. The second tab must ride along on observed completions.
    let tab1 = GameClient::new(
        GameService::connect(Arc::clone(&store), "user-a", "g"),
        Arc::clone(&images),
    );
    let tab2 = GameClient::new(
        GameService::connect(Arc::clone(&store), "user-a", "g"),
        Arc::clone(&images),
    );
    let player_b = GameClient::new(
        GameService::connect(Arc::clone(&store), "user-b", "g"),
        Arc::clone(&images),
    );

    let tab1_handle = tab1.handle();
    let b_handle = player_b.handle();
    let tab2_run = tokio::spawn(tab2.run());
    let tab1_run = tokio::spawn(tab1.run());
    let b_run = tokio::spawn(player_b.run());
    tokio::spawn(run_bot(tab1_handle.clone(), "amy".to_string()));
    tokio::spawn(run_bot(b_handle, "bo".to_string()));

    // Start once both players are in.
    let mut roster = tab1_handle.game_updates();
    timeout(TICK, roster.wait_for(|game| {
        game.players.iter().filter(|p| p.username.is_some()).count() == 2
    }))
    .await
    .expect("players never joined")
    .unwrap();
    tab1_handle.start_game().await.unwrap();

    for run in [tab1_run, tab2_run, b_run] {
        let state = timeout(TICK, run).await.unwrap().unwrap().unwrap();
        assert_eq!(state, GameState::Review);
    }

    // Every chain link was durably written exactly once: the duplicate tab
    // observed completions instead of re-producing them.
    let counts = counting.chain_write_counts();
    assert!(!counts.is_empty());
    for (path, count) in counts {
        assert_eq!(count, 1, "link {path} written {count} times");
    }
    // Spot-check the seed words too.
    assert_eq!(counting.writes_to(&DocPath::link("g", "user-a", 0)), 1);
    assert_eq!(counting.writes_to(&DocPath::link("g", "user-b", 0)), 1);
}
