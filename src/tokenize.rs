//! Stateful splitting of normalised characters into tokens, plus token-level stages.

use std::collections::VecDeque;

use crate::config::TokenizerConfig;
use crate::normalize::{normalize, NormalizationOrder};
use crate::vocabulary::{TokenId, Vocabulary};

/// Lazy token stream over a character iterator.
///
/// Characters accumulate until a delimiter or end-of-sequence character arrives.  Non-empty,
/// non-ignored buffers are emitted as tokens; every end-of-sequence character additionally emits
/// the configured end-of-sequence token.
#[derive(Debug)]
pub struct TokenStream<I> {
    chars: I,
    cfg: TokenizerConfig,
    buffer: String,
    queued: VecDeque<String>,
    finished: bool,
}

impl<I: Iterator<Item = char>> TokenStream<I> {
    /// Creates a token stream over `chars`.
    pub fn new(chars: I, cfg: TokenizerConfig) -> Self {
        Self {
            chars,
            cfg,
            buffer: String::new(),
            queued: VecDeque::with_capacity(2),
            finished: false,
        }
    }

    fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let value = std::mem::take(&mut self.buffer);
        (!self.cfg.ignore_words.contains(&value)).then_some(value)
    }
}

impl<I: Iterator<Item = char>> Iterator for TokenStream<I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(token) = self.queued.pop_front() {
            return Some(token);
        }
        if self.finished {
            return None;
        }
        while let Some(ch) = self.chars.next() {
            let is_eos = self.cfg.eos_chars.contains(&ch);
            if is_eos || self.cfg.delimiters.contains(&ch) {
                let token = self.flush();
                if is_eos {
                    self.queued.push_back(self.cfg.eos_token.clone());
                }
                if let Some(token) = token {
                    return Some(token);
                }
                if let Some(eos) = self.queued.pop_front() {
                    return Some(eos);
                }
            } else {
                self.buffer.push(ch);
            }
        }

        self.finished = true;
        if self.buffer.is_empty() {
            return None;
        }
        if !self.cfg.eos_chars.is_empty() {
            self.queued.push_back(self.cfg.eos_token.clone());
        }
        self.flush().or_else(|| self.queued.pop_front())
    }
}

/// Tokenizes a character stream with the given configuration.
pub fn tokenize<I: Iterator<Item = char>>(chars: I, cfg: TokenizerConfig) -> TokenStream<I> {
    TokenStream::new(chars, cfg)
}

/// Tokenizes ad hoc text: NFKC, alphanumeric and script filters, lowercasing, no
/// end-of-sequence handling.
#[must_use]
pub fn tokenize_text<I, S>(text: &str, ignore_words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let cfg = TokenizerConfig::default()
        .with_eos_chars(std::iter::empty::<char>())
        .with_ignore_words(ignore_words);
    tokenize(normalize(text.chars(), NormalizationOrder::Composed), cfg).collect()
}

/// Lowercases each token.
pub fn lowercase_tokens<I: Iterator<Item = String>>(tokens: I) -> impl Iterator<Item = String> {
    tokens.map(|token| token.to_lowercase())
}

/// Returns `true` for non-empty tokens made only of decimal digits `0-9`.
///
/// Fractions, superscripts and roman numerals are ordinary words here.
#[must_use]
pub fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

/// Replaces purely numeric tokens by `placeholder`.
pub fn replace_numeric_tokens<I: Iterator<Item = String>>(
    tokens: I,
    placeholder: String,
) -> impl Iterator<Item = String> {
    tokens.map(move |token| {
        if is_numeric_token(&token) {
            placeholder.clone()
        } else {
            token
        }
    })
}

/// Maps tokens to vocabulary ids, dropping tokens the vocabulary does not know.
pub fn translate_tokens<'v, I>(
    tokens: I,
    vocabulary: &'v Vocabulary,
) -> impl Iterator<Item = TokenId> + 'v
where
    I: Iterator<Item = String> + 'v,
{
    tokens.filter_map(move |token| vocabulary.id_of(&token))
}
