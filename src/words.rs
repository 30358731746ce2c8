//! Random drawable nouns, for seed words and human-readable game ids.

use rand::Rng;

/// Nouns concrete enough to draw.
const WORDS: &[&str] = &[
    "acorn", "anchor", "apple", "balloon", "banana", "beach", "bicycle",
    "bridge", "bucket", "butterfly", "cactus", "camel", "camera", "candle",
    "castle", "caterpillar", "cloud", "compass", "crown", "dolphin",
    "dragon", "drum", "eagle", "elephant", "feather", "fireplace", "flute",
    "forest", "fountain", "giraffe", "guitar", "hammer", "hedgehog",
    "helicopter", "igloo", "island", "jellyfish", "kangaroo", "kettle",
    "kite", "ladder", "lantern", "lighthouse", "lizard", "mailbox",
    "mermaid", "mountain", "mushroom", "octopus", "ostrich", "owl",
    "parachute", "peacock", "penguin", "piano", "pirate", "pretzel",
    "pumpkin", "rainbow", "robot", "rocket", "sailboat", "scarecrow",
    "snail", "snowman", "spider", "submarine", "sunflower", "teapot",
    "telescope", "tractor", "treehouse", "trumpet", "turtle", "umbrella",
    "unicorn", "volcano", "waterfall", "whale", "windmill", "wizard",
];

/// Returns a random drawable noun.
pub fn random_word() -> &'static str {
    WORDS[rand::rng().random_range(0..WORDS.len())]
}

/// Builds a human-readable game id from three random nouns.
pub fn game_id() -> String {
    format!("{}-{}-{}", random_word(), random_word(), random_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_word_comes_from_the_list() {
        for _ in 0..32 {
            assert!(WORDS.contains(&random_word()));
        }
    }

    #[test]
    fn game_id_has_three_parts() {
        let id = game_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            assert!(WORDS.contains(&part));
        }
    }
}
