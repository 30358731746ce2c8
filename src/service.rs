//! Store-facing game orchestration.
//!
//! `GameService` owns one client's view of one game: it folds the game
//! document and the players collection into a single observable snapshot,
//! steps the responsibility rotation, and turns game actions into document
//! writes. It makes no lifecycle decisions - that is the state machine's
//! job - it only answers "what is there" and "write this".

use crate::error::GameError;
use crate::game::attribution;
use crate::game::rotation;
use crate::game::types::{
    GameDoc, GameSnapshot, ImageRef, Link, PlayerDoc, PlayerSnapshot, Responsibility, UNORDERED,
};
use crate::store::{CollectionPath, DocPath, Document, DocumentStore, StoreError};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// The input and output streams of one armed responsibility.
///
/// `input` watches the link the client must read to act; `output` watches
/// the link the client would write, which fills first when another client
/// for the same player already completed the step.
#[derive(Debug)]
pub struct TurnStreams {
    /// The responsibility these streams belong to.
    pub responsibility: Responsibility,
    /// The link to read before drawing or guessing.
    pub input: watch::Receiver<Option<Document>>,
    /// The link this responsibility produces.
    pub output: watch::Receiver<Option<Document>>,
}

/// One client's connection to one game.
///
/// Cheap to clone; all clones share the same subscriptions and rotation
/// position. Two clients for the same user must each `connect` separately -
/// that independence is what the completion races resolve.
#[derive(Clone)]
pub struct GameService {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    user_id: String,
    game_id: String,
    game_rx: watch::Receiver<GameSnapshot>,
    /// Position in the responsibility rotation; `None` before the first step.
    responsibility: Mutex<Option<Responsibility>>,
    combine: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.combine.abort();
    }
}

impl GameService {
    /// Creates a game and registers `user_id` as its starter.
    ///
    /// The starter is always player number 0; everyone else joins with the
    /// [`UNORDERED`] sentinel until the starter orders the roster.
    #[instrument(skip(store))]
    pub async fn create_game(
        store: &Arc<dyn DocumentStore>,
        user_id: &str,
        game_id: &str,
    ) -> Result<(), StoreError> {
        info!("creating game");
        store
            .write(
                &DocPath::game(game_id),
                Document::encode(&GameDoc {
                    started: Some(false),
                })?,
            )
            .await?;
        store
            .write(
                &DocPath::player(game_id, user_id),
                Document::encode(&PlayerDoc {
                    username: None,
                    number: Some(0),
                })?,
            )
            .await
    }

    /// Connects to a game, subscribing to its document and roster.
    ///
    /// The published snapshot starts with `exists: None` until the store
    /// has answered at all.
    #[instrument(skip(store, user_id, game_id))]
    pub fn connect(
        store: Arc<dyn DocumentStore>,
        user_id: impl Into<String>,
        game_id: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let game_id = game_id.into();
        info!(%user_id, %game_id, "connecting to game");

        let mut doc_rx = store.subscribe_doc(&DocPath::game(&game_id));
        let mut players_rx = store.subscribe_collection(&CollectionPath::players(&game_id));
        let (game_tx, game_rx) = watch::channel(GameSnapshot::default());

        let combine = tokio::spawn(async move {
            loop {
                let doc = doc_rx.borrow_and_update().clone();
                let entries = players_rx.borrow_and_update().clone();
                game_tx.send_replace(fold(doc, &entries));
                tokio::select! {
                    changed = doc_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = players_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            inner: Arc::new(Inner {
                store,
                user_id,
                game_id,
                game_rx,
                responsibility: Mutex::new(None),
                combine,
            }),
        }
    }

    /// The stable id this client plays under.
    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    /// The id of the connected game.
    pub fn game_id(&self) -> &str {
        &self.inner.game_id
    }

    /// A fresh receiver of the folded game snapshot.
    pub fn game_updates(&self) -> watch::Receiver<GameSnapshot> {
        self.inner.game_rx.clone()
    }

    /// The current folded game snapshot.
    pub fn snapshot(&self) -> GameSnapshot {
        self.inner.game_rx.borrow().clone()
    }

    /// Joins the game with a username and the seed word of the own chain.
    #[instrument(skip(self), fields(user_id = %self.user_id()))]
    pub async fn join_game(&self, username: &str, word: &str) -> Result<(), GameError> {
        // The starter already holds number 0; everyone else stays unordered
        // until the roster is numbered at start.
        let number = self
            .snapshot()
            .player(self.user_id())
            .map(|p| p.number)
            .unwrap_or(UNORDERED);

        info!(username, number, "joining game");
        self.inner
            .store
            .write(
                &DocPath::player(self.game_id(), self.user_id()),
                Document::encode(&PlayerDoc {
                    username: Some(username.to_string()),
                    number: Some(number),
                })?,
            )
            .await?;
        self.inner
            .store
            .write(
                &DocPath::link(self.game_id(), self.user_id(), 0),
                Link::Word(word.to_string()).to_doc()?,
            )
            .await?;
        Ok(())
    }

    /// Assigns every joined player a unique consecutive number, in arrival
    /// order, as one atomic batch. Starter only.
    ///
    /// The batch matters: every other client derives the player count from
    /// the numbering, so none of them may ever observe it half-applied.
    #[instrument(skip(self))]
    pub async fn order_players(&self) -> Result<(), GameError> {
        let snapshot = self.snapshot();
        info!(players = snapshot.players.len(), "ordering players");
        let writes = snapshot
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| {
                Ok((
                    DocPath::player(self.game_id(), &player.user_id),
                    Document::encode(&PlayerDoc {
                        username: None,
                        number: Some(index as i64),
                    })?,
                ))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.inner.store.batch_write(writes).await?;
        Ok(())
    }

    /// Orders the roster and flips the game to started. Starter only.
    #[instrument(skip(self))]
    pub async fn start_game(&self) -> Result<(), GameError> {
        self.order_players().await?;
        self.inner
            .store
            .write(
                &DocPath::game(self.game_id()),
                Document::encode(&GameDoc {
                    started: Some(true),
                })?,
            )
            .await?;
        Ok(())
    }

    /// Steps to this client's next responsibility.
    ///
    /// Returns the armed link streams for the new responsibility, or `None`
    /// when the rotation is exhausted and the client should wait for its
    /// chain to complete. Two clients for the same player step through
    /// identical sequences; the streams are what resolves their races.
    pub fn advance_responsibility(&self) -> Result<Option<TurnStreams>, GameError> {
        let snapshot = self.snapshot();
        let player_count = snapshot.player_count();
        let own_number = snapshot
            .player(self.user_id())
            .filter(|p| p.number >= 0)
            .map(|p| p.number as usize)
            .ok_or_else(|| GameError::NotJoined {
                user_id: self.user_id().to_string(),
            })?;

        let next = {
            let mut current = self.inner.responsibility.lock().unwrap();
            let next = match *current {
                None => rotation::first_responsibility(player_count, own_number),
                Some(prev) => rotation::step(prev, player_count),
            };
            *current = Some(next);
            next
        };

        if rotation::is_exhausted(next, player_count) {
            debug!(user_id = self.user_id(), "rotation exhausted");
            return Ok(None);
        }

        debug!(
            user_id = self.user_id(),
            chain = next.chain_number,
            link = next.link_index,
            "responsibility armed"
        );
        let input = self
            .inner
            .store
            .subscribe_doc(&self.link_path(&snapshot, next.chain_number, next.link_index)?);
        let output = self
            .inner
            .store
            .subscribe_doc(&self.link_path(&snapshot, next.chain_number, next.link_index + 1)?);
        Ok(Some(TurnStreams {
            responsibility: next,
            input,
            output,
        }))
    }

    /// Writes a guess as the output link of the given responsibility.
    #[instrument(skip(self))]
    pub async fn save_guess(
        &self,
        responsibility: Responsibility,
        guess: &str,
    ) -> Result<(), GameError> {
        let path = self.link_path(
            &self.snapshot(),
            responsibility.chain_number,
            responsibility.link_index + 1,
        )?;
        self.inner
            .store
            .write(&path, Link::Word(guess.to_string()).to_doc()?)
            .await?;
        Ok(())
    }

    /// Writes an uploaded drawing as the output link of the given
    /// responsibility.
    ///
    /// The responsibility is passed by value so an upload that finishes
    /// after the client has moved on still lands in the right link.
    #[instrument(skip(self))]
    pub async fn save_drawing(
        &self,
        responsibility: Responsibility,
        image: ImageRef,
    ) -> Result<(), GameError> {
        let path = self.link_path(
            &self.snapshot(),
            responsibility.chain_number,
            responsibility.link_index + 1,
        )?;
        self.inner
            .store
            .write(&path, Link::Drawing(image).to_doc()?)
            .await?;
        Ok(())
    }

    /// Subscribes to this client's own chain collection.
    pub fn subscribe_chain(&self) -> watch::Receiver<Vec<(String, Document)>> {
        self.inner
            .store
            .subscribe_collection(&CollectionPath::chain(self.game_id(), self.user_id()))
    }

    /// Display name of whoever authored the given link of the own chain.
    pub fn author_name(&self, link_index: usize) -> Option<String> {
        let snapshot = self.snapshot();
        let own_number = snapshot.player(self.user_id())?.number;
        if own_number < 0 {
            return None;
        }
        let author = attribution::author_of(
            own_number as usize,
            snapshot.player_count(),
            link_index,
        );
        snapshot.player_by_number(author as i64)?.username.clone()
    }

    fn link_path(
        &self,
        snapshot: &GameSnapshot,
        chain_number: usize,
        index: usize,
    ) -> Result<DocPath, GameError> {
        let owner = snapshot
            .player_by_number(chain_number as i64)
            .ok_or(GameError::UnknownPlayerNumber {
                number: chain_number,
            })?;
        Ok(DocPath::link(self.game_id(), &owner.user_id, index))
    }
}

/// Folds the game document and the players collection into one snapshot.
fn fold(doc: Option<Document>, entries: &[(String, Document)]) -> GameSnapshot {
    let started = doc
        .as_ref()
        .and_then(|d| d.decode::<GameDoc>().ok())
        .and_then(|g| g.started)
        .unwrap_or(false);
    GameSnapshot {
        exists: Some(doc.is_some()),
        started,
        players: entries
            .iter()
            .filter_map(|(user_id, doc)| PlayerSnapshot::from_entry(user_id, doc))
            .collect(),
    }
}

/// Orders and filters a raw chain collection into its links.
///
/// Keys are link indices; documents that hold neither a word nor an image
/// are still unwritten placeholders and are dropped.
pub fn parse_chain(entries: &[(String, Document)]) -> Vec<Link> {
    let mut links: Vec<(usize, Link)> = entries
        .iter()
        .filter_map(|(key, doc)| Some((key.parse().ok()?, Link::from_doc(doc)?)))
        .collect();
    links.sort_by_key(|(index, _)| *index);
    links.into_iter().map(|(_, link)| link).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::encode(&value).unwrap()
    }

    #[test]
    fn fold_reads_tri_state_existence() {
        let folded = fold(None, &[]);
        assert_eq!(folded.exists, Some(false));
        assert!(!folded.started);

        let folded = fold(Some(doc(json!({"started": true}))), &[]);
        assert_eq!(folded.exists, Some(true));
        assert!(folded.started);
    }

    #[test]
    fn fold_keeps_roster_arrival_order() {
        let entries = vec![
            ("zed".to_string(), doc(json!({"number": 0}))),
            ("amy".to_string(), doc(json!({"username": "amy", "number": -1}))),
        ];
        let folded = fold(Some(doc(json!({"started": false}))), &entries);
        let ids: Vec<&str> = folded.players.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["zed", "amy"]);
    }

    #[test]
    fn parse_chain_sorts_and_filters() {
        let entries = vec![
            ("2".to_string(), doc(json!({"word": "whale"}))),
            ("0".to_string(), doc(json!({"word": "boat"}))),
            ("1".to_string(), doc(json!({"image": "0.svg"}))),
            ("3".to_string(), doc(json!({}))),
        ];
        let links = parse_chain(&entries);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0], Link::Word("boat".to_string()));
        assert!(links[1].is_drawing());
        assert_eq!(links[2], Link::Word("whale".to_string()));
    }
}
