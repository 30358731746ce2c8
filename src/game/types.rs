//! Core domain types for the telephone-drawing game.

use crate::store::{Document, StoreError};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Player number of anyone who has joined but has not been ordered yet.
///
/// The starter is always number `0`. Everyone else keeps `-1` until the
/// starter assigns consecutive numbers at game start.
pub const UNORDERED: i64 = -1;

/// Opaque reference to a stored drawing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct ImageRef(pub String);

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One link in a player's chain.
///
/// Index 0 is the seed word, odd indices are drawings, even non-zero indices
/// are guesses. The position is derived from the document key, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// The seed word or a guess.
    Word(String),
    /// A drawing of the previous word.
    Drawing(ImageRef),
}

/// Stored field layout of a link document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct LinkDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Link {
    /// Reads a link out of its store document. Returns `None` if the
    /// document holds neither a word nor an image.
    pub fn from_doc(doc: &Document) -> Option<Self> {
        let fields: LinkDoc = doc.decode().ok()?;
        if let Some(word) = fields.word {
            Some(Link::Word(word))
        } else {
            fields.image.map(|name| Link::Drawing(ImageRef(name)))
        }
    }

    /// Encodes the link as its store document.
    pub fn to_doc(&self) -> Result<Document, StoreError> {
        let fields = match self {
            Link::Word(word) => LinkDoc {
                word: Some(word.clone()),
                image: None,
            },
            Link::Drawing(image) => LinkDoc {
                word: None,
                image: Some(image.0.clone()),
            },
        };
        Document::encode(&fields)
    }

    /// Whether the link holds a word or guess.
    pub fn is_word(&self) -> bool {
        matches!(self, Link::Word(_))
    }

    /// Whether the link holds a drawing.
    pub fn is_drawing(&self) -> bool {
        matches!(self, Link::Drawing(_))
    }
}

/// The link a client must currently read to produce the next one.
///
/// `chain_number` names whose chain the input link lives in; the client
/// writes its result to `link_index + 1` of the same chain. Held only in the
/// acting client's memory, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new)]
pub struct Responsibility {
    /// Number of the player whose chain the input link belongs to.
    pub chain_number: usize,
    /// Index of the input link within that chain.
    pub link_index: usize,
}

/// Stored field layout of the game document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GameDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<bool>,
}

/// Stored field layout of a player document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PlayerDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
}

/// One player as observed from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Stable identifier, the player document's key.
    pub user_id: String,
    /// Chosen display name; absent until the player has joined.
    pub username: Option<String>,
    /// Turn number; [`UNORDERED`] until the starter orders players.
    pub number: i64,
}

impl PlayerSnapshot {
    pub(crate) fn from_entry(user_id: &str, doc: &Document) -> Option<Self> {
        let fields: PlayerDoc = doc.decode().ok()?;
        Some(Self {
            user_id: user_id.to_string(),
            username: fields.username,
            number: fields.number.unwrap_or(UNORDERED),
        })
    }
}

/// The game and its roster as observed from the store.
///
/// `exists` stays `None` until the store has answered at all, so consumers
/// can distinguish "still loading" from "no such game".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameSnapshot {
    /// Whether the game document is present; `None` before the first answer.
    pub exists: Option<bool>,
    /// Whether the starter has started the game.
    pub started: bool,
    /// Players in arrival order.
    pub players: Vec<PlayerSnapshot>,
}

impl GameSnapshot {
    /// The player with the given user id, if any.
    pub fn player(&self, user_id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// The player holding the given turn number, if any.
    pub fn player_by_number(&self, number: i64) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.number == number)
    }

    /// Whether the user has joined (picked a username).
    pub fn joined(&self, user_id: &str) -> bool {
        self.player(user_id).is_some_and(|p| p.username.is_some())
    }

    /// Whether the user joined and was ordered by the starter.
    pub fn included(&self, user_id: &str) -> bool {
        self.joined(user_id) && self.player(user_id).is_some_and(|p| p.number != UNORDERED)
    }

    /// Whether the user started this game.
    pub fn is_starter(&self, user_id: &str) -> bool {
        self.player(user_id).is_some_and(|p| p.number == 0)
    }

    /// Number of players the starter included when ordering.
    pub fn player_count(&self) -> usize {
        self.players.iter().filter(|p| p.number >= 0).count()
    }

    /// Length of every completed chain in this game.
    ///
    /// # Panics
    ///
    /// Panics if no player has been ordered yet.
    pub fn max_links(&self) -> usize {
        super::rotation::max_links(self.player_count())
    }

    /// Whether enough has been retrieved to decide how to proceed: either
    /// the game is known to be absent, or it is present with its roster.
    pub fn loaded(&self) -> bool {
        match self.exists {
            Some(false) => true,
            Some(true) => !self.players.is_empty(),
            None => false,
        }
    }
}

/// One link of a completed chain, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLink {
    /// Display name of the player who authored this link.
    pub username: String,
    /// The seed word or guess, if this link is text.
    pub word: Option<String>,
    /// Displayable location of the drawing, if this link is an image.
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::encode(&value).unwrap()
    }

    #[test]
    fn link_round_trips_through_document() {
        let word = Link::Word("lighthouse".to_string());
        assert_eq!(Link::from_doc(&word.to_doc().unwrap()), Some(word));

        let drawing = Link::Drawing(ImageRef::new("7.svg".to_string()));
        assert_eq!(Link::from_doc(&drawing.to_doc().unwrap()), Some(drawing));
    }

    #[test]
    fn empty_link_document_is_no_link() {
        assert_eq!(Link::from_doc(&Document::new()), None);
    }

    #[test]
    fn player_without_number_defaults_to_unordered() {
        let player =
            PlayerSnapshot::from_entry("u1", &doc(json!({"username": "amy"}))).unwrap();
        assert_eq!(player.number, UNORDERED);
        assert_eq!(player.username.as_deref(), Some("amy"));
    }

    #[test]
    fn snapshot_membership_queries() {
        let snapshot = GameSnapshot {
            exists: Some(true),
            started: false,
            players: vec![
                PlayerSnapshot {
                    user_id: "starter".into(),
                    username: Some("amy".into()),
                    number: 0,
                },
                PlayerSnapshot {
                    user_id: "joiner".into(),
                    username: Some("bo".into()),
                    number: UNORDERED,
                },
                PlayerSnapshot {
                    user_id: "lurker".into(),
                    username: None,
                    number: UNORDERED,
                },
            ],
        };

        assert!(snapshot.is_starter("starter"));
        assert!(!snapshot.is_starter("joiner"));
        assert!(snapshot.joined("joiner"));
        assert!(!snapshot.joined("lurker"));
        assert!(snapshot.included("starter"));
        assert!(!snapshot.included("joiner"));
        assert_eq!(snapshot.player_count(), 1);
    }

    #[test]
    fn loading_is_complete_on_absence_or_roster() {
        let mut snapshot = GameSnapshot::default();
        assert!(!snapshot.loaded());

        snapshot.exists = Some(true);
        assert!(!snapshot.loaded());

        snapshot.players.push(PlayerSnapshot {
            user_id: "starter".into(),
            username: None,
            number: 0,
        });
        assert!(snapshot.loaded());

        let absent = GameSnapshot {
            exists: Some(false),
            ..GameSnapshot::default()
        };
        assert!(absent.loaded());
    }
}
