use memlane_memory::embedding::tokenize;
use memlane_memory::{Embedder, MemoryError};

/// Words that carry no meaning for the vocabulary embedder.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "at", "did", "do", "for", "i", "in", "is", "it", "me", "my", "of", "on",
    "the", "to", "was", "what", "when", "where", "who", "why", "how", "with",
];

/// Residual buckets for words outside every concept.
const RESIDUAL_BUCKETS: usize = 32;
const RESIDUAL_WEIGHT: f32 = 0.5;

/// Deterministic embedder that maps related words onto shared concept axes.
///
/// Words listed under a concept land on that concept's dimension, so "eat",
/// "dinner" and "pasta" are similar without any model. Other words hash into
/// residual buckets with a lower weight; stopwords are ignored.
#[derive(Debug, Clone)]
pub struct VocabularyEmbedder {
    concepts: Vec<(String, Vec<String>)>,
}

impl VocabularyEmbedder {
    pub fn new() -> Self {
        Self::with_concepts(&[
            (
                "food",
                &[
                    "eat", "ate", "eating", "food", "dinner", "lunch", "breakfast", "meal",
                    "pasta", "pizza", "cooked", "cooking", "italian", "restaurant",
                ],
            ),
            (
                "beach",
                &["beach", "sea", "ocean", "sand", "swim", "swam", "waves", "shore"],
            ),
            (
                "family",
                &["mom", "dad", "sister", "brother", "family", "kids", "grandma", "grandpa"],
            ),
            (
                "schedule",
                &["remind", "reminder", "call", "appointment", "sunday", "monday", "pm"],
            ),
            ("pets", &["dog", "puppy", "cat", "kitten", "walk", "walked"]),
        ])
    }

    pub fn with_concepts(concepts: &[(&str, &[&str])]) -> Self {
        Self {
            concepts: concepts
                .iter()
                .map(|(name, words)| {
                    (
                        name.to_string(),
                        words.iter().map(|word| word.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    fn concept_of(&self, word: &str) -> Option<usize> {
        self.concepts
            .iter()
            .position(|(_, words)| words.iter().any(|candidate| candidate == word))
    }
}

impl Default for VocabularyEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for VocabularyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vector = vec![0.0; self.dimension()];
        for token in tokenize(text) {
            if STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            match self.concept_of(&token) {
                Some(concept) => vector[concept] += 1.0,
                None => {
                    let bucket = residual_bucket(&token);
                    vector[self.concepts.len() + bucket] += RESIDUAL_WEIGHT;
                }
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.concepts.len() + RESIDUAL_BUCKETS
    }

    fn model_name(&self) -> &str {
        "vocabulary-test"
    }
}

fn residual_bucket(token: &str) -> usize {
    let hash = token
        .bytes()
        .fold(0usize, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as usize));
    hash % RESIDUAL_BUCKETS
}

/// Embedder that always fails.
#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    dimension: usize,
    message: String,
}

impl FailingEmbedder {
    pub fn new(dimension: usize, message: impl Into<String>) -> Self {
        Self {
            dimension,
            message: message.into(),
        }
    }
}

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Err(MemoryError::Embedding(self.message.clone()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}
