//! Vocabulary types: a dense id assignment over counted tokens.

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordwinError};

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// Vocabulary entry: dense id plus absolute corpus frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    /// Dense, zero-based identifier.
    pub id: TokenId,
    /// Corpus frequency at construction time.
    pub count: u64,
}

impl Word {
    /// Creates a new entry.
    #[must_use]
    pub fn new(id: TokenId, count: u64) -> Self {
        Self { id, count }
    }
}

/// Bijection between token strings and [`Word`] entries.
///
/// Immutable once constructed; downstream stages share it by reference.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    words: AHashMap<String, Word>,
    tokens: Vec<String>,
    total_count: u64,
}

impl Vocabulary {
    /// Builds a vocabulary from `(token, word)` pairs, checking that ids are dense and unique.
    ///
    /// The total count is the sum of all word counts.
    pub fn from_words<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Word)>,
    {
        let words: AHashMap<String, Word> = entries.into_iter().collect();
        let total_count = words.values().map(|word| word.count).sum();
        Self::with_total_count(words, total_count)
    }

    /// Builds a vocabulary with an explicit total token count.
    pub fn with_total_count(words: AHashMap<String, Word>, total_count: u64) -> Result<Self> {
        let mut slots: Vec<Option<String>> = vec![None; words.len()];
        for (token, word) in &words {
            let slot = usize::try_from(word.id)
                .ok()
                .and_then(|idx| slots.get_mut(idx))
                .ok_or_else(|| {
                    WordwinError::InvalidConfig(format!(
                        "token {token:?} has id {} outside [0, {})",
                        word.id,
                        words.len()
                    ))
                })?;
            if let Some(existing) = slot.replace(token.clone()) {
                return Err(WordwinError::InvalidConfig(format!(
                    "tokens {existing:?} and {token:?} share id {}",
                    word.id
                )));
            }
        }
        let tokens = slots.into_iter().flatten().collect::<Vec<_>>();
        Ok(Self {
            words,
            tokens,
            total_count,
        })
    }

    /// Internal constructor for id-ordered tokens with known counts.
    pub(crate) fn from_sorted(entries: Vec<(String, u64)>) -> Self {
        let mut words = AHashMap::with_capacity(entries.len());
        let mut tokens = Vec::with_capacity(entries.len());
        let mut total_count = 0u64;
        for (idx, (token, count)) in entries.into_iter().enumerate() {
            words.insert(token.clone(), Word::new(idx as TokenId, count));
            tokens.push(token);
            total_count += count;
        }
        Self {
            words,
            tokens,
            total_count,
        }
    }

    /// Appends `token` with a zero count unless already present; returns its entry.
    pub(crate) fn ensure_token(&mut self, token: &str) -> Word {
        if let Some(word) = self.words.get(token) {
            return *word;
        }
        let word = Word::new(self.tokens.len() as TokenId, 0);
        self.words.insert(token.to_string(), word);
        self.tokens.push(token.to_string());
        word
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` when the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Looks up the entry for `token`.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<Word> {
        self.words.get(token).copied()
    }

    /// Looks up the id for `token`.
    #[must_use]
    pub fn id_of(&self, token: &str) -> Option<TokenId> {
        self.words.get(token).map(|word| word.id)
    }

    /// Looks up the token string for `id`.
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Returns `true` when `token` has an entry.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains_key(token)
    }

    /// Iterates `(token, word)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Word)> + '_ {
        self.tokens
            .iter()
            .filter_map(move |token| self.words.get(token).map(|word| (token.as_str(), *word)))
    }

    /// Sum of word counts, the number of word impressions the vocabulary covers.
    #[must_use]
    pub fn num_word_impressions(&self) -> u64 {
        self.total_count
    }

    /// Counts the in-vocabulary tokens of `document`, returning `(id, count)` sorted by id.
    pub fn doc2bow<I, S>(&self, document: I) -> Vec<(TokenId, u64)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: AHashMap<TokenId, u64> = AHashMap::new();
        for token in document {
            if let Some(id) = self.id_of(token.as_ref()) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: Vec<(TokenId, u64)> = counts.into_iter().collect();
        bow.sort_unstable_by_key(|&(id, _)| id);
        bow
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vocabulary({} unique tokens)", self.len())
    }
}
