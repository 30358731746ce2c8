//! The reactive game lifecycle.
//!
//! One `GameClient` drives one player's tab through the game purely from
//! signals arriving off the shared store. There is no arbiter anywhere:
//! every client decides locally what it must do next, and races its own
//! work against the possibility that another client for the same player -
//! a second tab, a reloaded window - already did it.
//!
//! Two rules hold in every state:
//!
//! 1. Exactly one wait is armed, and it resolves at most once.
//! 2. That wait is the only way to leave the state; entering the next
//!    state drops (cancels) it.

use crate::error::GameError;
use crate::game::types::{GameSnapshot, Link, ReviewLink};
use crate::images::ImageStore;
use crate::service::{GameService, TurnStreams, parse_chain};
use crate::signal::{First, first_match, select_first};
use crate::store::Document;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};

/// Lifecycle state of one client's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum GameState {
    /// The game and its roster are being retrieved from the store.
    LoadingGame,
    /// The user is picking a username and seed word; ends when they join.
    JoinGame,
    /// Starter only: the roster is gathering, the start action is available.
    StartGame,
    /// Non-starters wait here until the starter starts the game.
    WaitForGameStart,
    /// The link to act on is not there yet - or the step was already done
    /// elsewhere, which the race against the output link detects.
    WaitingForOtherPlayer,
    /// A word is on screen and a drawing of it is owed.
    Draw,
    /// A drawing is on screen and a guess at it is owed.
    Guess,
    /// No responsibilities remain; the own chain is still filling up.
    WaitingForReview,
    /// The completed chain is on display.
    Review,
    /// The game started without this user; terminal.
    GameAlreadyStarted,
    /// No game with this id exists; terminal.
    GameDoesNotExist,
}

impl GameState {
    /// Whether the lifecycle ends in this state.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            GameState::Review | GameState::GameAlreadyStarted | GameState::GameDoesNotExist
        )
    }
}

/// What the current state puts on screen.
#[derive(Debug, Clone, Default)]
pub struct GameView {
    /// The word to draw while in [`GameState::Draw`].
    pub word_to_draw: Option<String>,
    /// The drawing to guess at while in [`GameState::Guess`].
    pub image_to_guess: Option<String>,
    /// The completed, attributed chain once in [`GameState::Review`].
    pub chain: Option<Vec<ReviewLink>>,
}

/// Cloneable surface for whatever embeds the client - UI, bot, test.
///
/// Reads are watch receivers; actions either write through the service
/// (join, start) or signal the state machine's armed turn (submit).
#[derive(Clone)]
pub struct ClientHandle {
    service: GameService,
    state_rx: watch::Receiver<GameState>,
    view_rx: watch::Receiver<GameView>,
    guess_tx: mpsc::UnboundedSender<String>,
    image_tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ClientHandle {
    /// The stable id this client plays under.
    pub fn user_id(&self) -> &str {
        self.service.user_id()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> GameState {
        *self.state_rx.borrow()
    }

    /// A fresh receiver of lifecycle state changes.
    pub fn state_updates(&self) -> watch::Receiver<GameState> {
        self.state_rx.clone()
    }

    /// The current view contents.
    pub fn view(&self) -> GameView {
        self.view_rx.borrow().clone()
    }

    /// A fresh receiver of view changes.
    pub fn view_updates(&self) -> watch::Receiver<GameView> {
        self.view_rx.clone()
    }

    /// A fresh receiver of the folded game snapshot, for live rosters.
    pub fn game_updates(&self) -> watch::Receiver<GameSnapshot> {
        self.service.game_updates()
    }

    /// Joins the game with a username and the seed word of the own chain.
    pub async fn join_game(&self, username: &str, word: &str) -> Result<(), GameError> {
        self.service.join_game(username, word).await
    }

    /// Orders the roster and starts the game. Starter only.
    pub async fn start_game(&self) -> Result<(), GameError> {
        self.service.start_game().await
    }

    /// Hands the finished drawing to the armed turn, if one is waiting.
    pub fn submit_drawing(&self, image: Vec<u8>) {
        let _ = self.image_tx.send(image);
    }

    /// Hands the entered guess to the armed turn, if one is waiting.
    pub fn submit_guess(&self, guess: impl Into<String>) {
        let _ = self.guess_tx.send(guess.into());
    }
}

/// Outcome of racing local production against external completion.
enum TurnOutcome<T> {
    /// The local user produced the value first.
    Produced(T),
    /// Another client already wrote the output link; produce nothing.
    AlreadyDone,
}

/// The two competing observers of one producing turn.
///
/// Short-lived: built on entering Draw or Guess, consumed by the one
/// resolution that leaves the state.
struct TurnSession<'a, T> {
    output: &'a mut watch::Receiver<Option<Document>>,
    local: &'a mut mpsc::UnboundedReceiver<T>,
}

impl<'a, T> TurnSession<'a, T> {
    /// Arms the session, discarding any submission left over from an
    /// earlier turn so it cannot satisfy this one.
    fn new(
        output: &'a mut watch::Receiver<Option<Document>>,
        local: &'a mut mpsc::UnboundedReceiver<T>,
    ) -> Self {
        while local.try_recv().is_ok() {}
        Self { output, local }
    }

    /// Resolves the race. External completion wins ties, so a client never
    /// produces a value it has observed to be redundant.
    async fn resolve(self) -> Result<TurnOutcome<T>, GameError> {
        match select_first(
            first_match(self.output, |doc: &Option<Document>| doc.is_some()),
            self.local.recv(),
        )
        .await
        {
            First::Left(done) => {
                done?;
                Ok(TurnOutcome::AlreadyDone)
            }
            First::Right(Some(value)) => Ok(TurnOutcome::Produced(value)),
            First::Right(None) => Err(GameError::InputClosed),
        }
    }
}

/// Decision taken when the join wait resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinOutcome {
    /// Game already running and the user is in it: rejoin the rotation.
    Resume,
    /// Game already running without the user; terminal.
    AlreadyStarted,
    /// Not started and this user is the starter.
    Start,
    /// Not started and this user is a regular player.
    Wait,
}

/// Where to go once the game has loaded.
fn after_loading(game: &GameSnapshot) -> GameState {
    if game.exists == Some(true) {
        GameState::JoinGame
    } else {
        GameState::GameDoesNotExist
    }
}

/// Where to go once the join wait resolves.
fn after_join(game: &GameSnapshot, user_id: &str) -> JoinOutcome {
    if game.started {
        if game.joined(user_id) {
            JoinOutcome::Resume
        } else {
            JoinOutcome::AlreadyStarted
        }
    } else if game.is_starter(user_id) {
        JoinOutcome::Start
    } else {
        JoinOutcome::Wait
    }
}

/// One player's client, driven entirely by store signals.
pub struct GameClient {
    service: GameService,
    images: Arc<dyn ImageStore>,
    state_tx: watch::Sender<GameState>,
    view_tx: watch::Sender<GameView>,
    guess_rx: mpsc::UnboundedReceiver<String>,
    image_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    handle: ClientHandle,
    /// Streams of the currently armed responsibility, while one is active.
    turn: Option<TurnStreams>,
    /// The own chain collection, subscribed once the rotation is exhausted.
    chain_rx: Option<watch::Receiver<Vec<(String, Document)>>>,
}

impl GameClient {
    /// Creates a client over a connected service and a shared blob store.
    pub fn new(service: GameService, images: Arc<dyn ImageStore>) -> Self {
        let (state_tx, state_rx) = watch::channel(GameState::LoadingGame);
        let (view_tx, view_rx) = watch::channel(GameView::default());
        let (guess_tx, guess_rx) = mpsc::unbounded_channel();
        let (image_tx, image_rx) = mpsc::unbounded_channel();
        let handle = ClientHandle {
            service: service.clone(),
            state_rx,
            view_rx,
            guess_tx,
            image_tx,
        };
        Self {
            service,
            images,
            state_tx,
            view_tx,
            guess_rx,
            image_rx,
            handle,
            turn: None,
            chain_rx: None,
        }
    }

    /// A cloneable handle for the embedding surface.
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Runs the lifecycle to its final state.
    ///
    /// Each loop iteration arms the single wait of the current state,
    /// resolves it once, and moves on; leaving the iteration drops the
    /// wait, so nothing armed in an old state can fire later.
    #[instrument(skip(self), fields(user_id = %self.service.user_id(), game_id = %self.service.game_id()))]
    pub async fn run(mut self) -> Result<GameState, GameError> {
        let mut game_rx = self.service.game_updates();
        let user_id = self.service.user_id().to_string();

        loop {
            let state = *self.state_tx.borrow();
            let next = match state {
                GameState::LoadingGame => {
                    let game = first_match(&mut game_rx, GameSnapshot::loaded).await?;
                    after_loading(&game)
                }
                GameState::JoinGame => {
                    let game =
                        first_match(&mut game_rx, |g| g.started || g.joined(&user_id)).await?;
                    match after_join(&game, &user_id) {
                        JoinOutcome::Resume => self.resume_rotation()?,
                        JoinOutcome::AlreadyStarted => GameState::GameAlreadyStarted,
                        JoinOutcome::Start => GameState::StartGame,
                        JoinOutcome::Wait => GameState::WaitForGameStart,
                    }
                }
                GameState::StartGame | GameState::WaitForGameStart => {
                    first_match(&mut game_rx, |g| g.started && g.included(&user_id)).await?;
                    self.resume_rotation()?
                }
                GameState::WaitingForOtherPlayer => self.wait_for_other_player().await?,
                GameState::Draw => self.draw().await?,
                GameState::Guess => self.guess().await?,
                GameState::WaitingForReview => self.wait_for_review().await?,
                GameState::Review
                | GameState::GameAlreadyStarted
                | GameState::GameDoesNotExist => return Ok(state),
            };
            info!(from = %state, to = %next, "state change");
            self.state_tx.send_replace(next);
        }
    }

    /// Steps the rotation: arms the next responsibility, or begins waiting
    /// for the own chain to complete when none remain.
    fn resume_rotation(&mut self) -> Result<GameState, GameError> {
        match self.service.advance_responsibility()? {
            Some(streams) => {
                self.turn = Some(streams);
                Ok(GameState::WaitingForOtherPlayer)
            }
            None => {
                self.chain_rx = Some(self.service.subscribe_chain());
                Ok(GameState::WaitingForReview)
            }
        }
    }

    /// Races the input link against the output link.
    ///
    /// The output filling first proves this step was already completed in
    /// another tab or before a reload; skip ahead instead of redoing it.
    async fn wait_for_other_player(&mut self) -> Result<GameState, GameError> {
        let turn = self
            .turn
            .as_mut()
            .expect("a responsibility is armed before waiting on it");

        let resolved = select_first(
            first_match(&mut turn.output, |doc: &Option<Document>| doc.is_some()),
            first_match(&mut turn.input, |doc: &Option<Document>| {
                doc.as_ref().is_some_and(|d| Link::from_doc(d).is_some())
            }),
        )
        .await;

        match resolved {
            First::Left(done) => {
                done?;
                self.resume_rotation()
            }
            First::Right(input) => {
                let doc = input?;
                let link = doc
                    .as_ref()
                    .and_then(Link::from_doc)
                    .expect("wait predicate admits only populated links");
                match link {
                    Link::Word(word) => {
                        self.view_tx.send_modify(|view| {
                            view.word_to_draw = Some(word.clone());
                            view.image_to_guess = None;
                        });
                        Ok(GameState::Draw)
                    }
                    Link::Drawing(image) => {
                        let url = self.images.resolve(&image).await?;
                        self.view_tx.send_modify(|view| {
                            view.image_to_guess = Some(url.clone());
                            view.word_to_draw = None;
                        });
                        Ok(GameState::Guess)
                    }
                }
            }
        }
    }

    /// Waits for a locally drawn image or for the step to complete elsewhere.
    ///
    /// A local drawing is uploaded and written on a detached task: the
    /// rotation moves on immediately, and a slow upload still lands in the
    /// link it was drawn for.
    async fn draw(&mut self) -> Result<GameState, GameError> {
        let turn = self
            .turn
            .as_mut()
            .expect("a responsibility is armed before drawing");
        let responsibility = turn.responsibility;

        let session = TurnSession::new(&mut turn.output, &mut self.image_rx);
        if let TurnOutcome::Produced(bytes) = session.resolve().await? {
            let images = Arc::clone(&self.images);
            let service = self.service.clone();
            tokio::spawn(async move {
                match images.put(bytes).await {
                    Ok(image) => {
                        if let Err(error) = service.save_drawing(responsibility, image).await {
                            warn!(%error, "drawing write failed");
                        }
                    }
                    Err(error) => warn!(%error, "drawing upload failed"),
                }
            });
        }
        self.resume_rotation()
    }

    /// Waits for a locally entered guess or for the step to complete
    /// elsewhere.
    async fn guess(&mut self) -> Result<GameState, GameError> {
        let turn = self
            .turn
            .as_mut()
            .expect("a responsibility is armed before guessing");
        let responsibility = turn.responsibility;

        let session = TurnSession::new(&mut turn.output, &mut self.guess_rx);
        if let TurnOutcome::Produced(guess) = session.resolve().await? {
            self.service.save_guess(responsibility, &guess).await?;
        }
        self.resume_rotation()
    }

    /// Waits for the own chain to reach full length, then resolves it for
    /// display: image references become URLs, every link gets its author.
    async fn wait_for_review(&mut self) -> Result<GameState, GameError> {
        let max_links = self.service.snapshot().max_links();
        let chain_rx = self
            .chain_rx
            .as_mut()
            .expect("the chain is subscribed before waiting for review");

        let entries =
            first_match(chain_rx, |raw| parse_chain(raw).len() == max_links).await?;
        let links = parse_chain(&entries);

        let mut chain = Vec::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            let username = self.service.author_name(index).unwrap_or_default();
            let review = match link {
                Link::Word(word) => ReviewLink {
                    username,
                    word: Some(word.clone()),
                    image_url: None,
                },
                Link::Drawing(image) => ReviewLink {
                    username,
                    word: None,
                    image_url: Some(self.images.resolve(image).await?),
                },
            };
            chain.push(review);
        }

        self.view_tx.send_modify(|view| view.chain = Some(chain.clone()));
        Ok(GameState::Review)
    }
}
