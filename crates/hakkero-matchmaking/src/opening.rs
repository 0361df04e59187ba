//! Opening sentences: the first line of every story.

use rand::seq::IndexedRandom;

use crate::MatchmakingError;

/// Supplies the system sentence a new room starts from.
pub trait OpenSentencer: Send + Sync + 'static {
    /// Returns an opening sentence.
    ///
    /// # Errors
    /// Returns [`MatchmakingError::OpeningUnavailable`] if none can be
    /// produced; the match is then cancelled.
    fn next(&self) -> Result<String, MatchmakingError>;
}

const BUILT_IN: &[&str] = &[
    "The last train left without her.",
    "Nobody had opened the attic in forty years.",
    "The letter arrived three days after the funeral.",
    "It started raining the moment he lied.",
    "The lighthouse keeper had not been seen since Tuesday.",
    "We were told never to answer the red phone.",
    "The map was wrong, and I was the one who drew it.",
    "Every clock in the village stopped at noon.",
    "She found a key in the pocket of a coat she had never owned.",
    "The dog barked once, then the lights went out.",
    "He had rehearsed the apology a hundred times.",
    "There was a stranger in every photograph from that summer.",
    "The elevator went down past the lowest floor.",
    "I only meant to borrow the car for an hour.",
    "The bakery on the corner sold bread that was still warm at midnight.",
    "By the time the snow melted, everyone had a secret.",
    "The robot asked me what a birthday was.",
    "My grandfather kept a jar of buttons and would not say why.",
    "The ship's log ended in the middle of a word.",
    "On the first day of school, nobody came to class.",
];

/// Picks uniformly at random from a fixed list of sentences.
#[derive(Debug, Clone)]
pub struct StaticOpenings {
    sentences: Vec<String>,
}

impl StaticOpenings {
    /// Uses the given sentences.
    pub fn new(sentences: Vec<String>) -> Self {
        Self { sentences }
    }

    /// Number of sentences to pick from.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Returns `true` if there is nothing to pick from.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

impl Default for StaticOpenings {
    /// The built-in collection.
    fn default() -> Self {
        Self::new(BUILT_IN.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl OpenSentencer for StaticOpenings {
    fn next(&self) -> Result<String, MatchmakingError> {
        self.sentences
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| MatchmakingError::OpeningUnavailable("no sentences configured".into()))
    }
}
