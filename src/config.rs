//! Configuration builders controlling tokenization, vocabulary extraction, and windowing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::error::{Result, WordwinError};
use crate::normalize::NormalizationOrder;

/// Default end-of-sequence token.
pub const DEFAULT_EOS_TOKEN: &str = "</s>";
/// Default placeholder substituted for purely numeric tokens.
pub const DEFAULT_NUMERIC_PLACEHOLDER: &str = "<num>";

/// Configuration of the character-to-token stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Characters separating tokens.
    pub delimiters: BTreeSet<char>,
    /// Characters that terminate a sequence; they also act as delimiters.
    pub eos_chars: BTreeSet<char>,
    /// Token emitted for every end-of-sequence character.
    pub eos_token: String,
    /// Tokens that are never emitted.
    pub ignore_words: BTreeSet<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            delimiters: [' ', '\t', '\n', '\r'].into_iter().collect(),
            eos_chars: ['\n', '\r'].into_iter().collect(),
            eos_token: DEFAULT_EOS_TOKEN.into(),
            ignore_words: BTreeSet::new(),
        }
    }
}

impl TokenizerConfig {
    /// Replaces the end-of-sequence character set.
    #[must_use]
    pub fn with_eos_chars<I: IntoIterator<Item = char>>(mut self, chars: I) -> Self {
        self.eos_chars = chars.into_iter().collect();
        self
    }

    /// Replaces the ignore set.
    #[must_use]
    pub fn with_ignore_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// ASCII delimiter and end-of-sequence characters as bytes, sorted and deduplicated.
    ///
    /// Chunk boundaries are only placed directly after such bytes.
    #[must_use]
    pub fn boundary_bytes(&self) -> Vec<u8> {
        self.delimiters
            .union(&self.eos_chars)
            .filter(|ch| ch.is_ascii())
            .map(|&ch| ch as u8)
            .collect()
    }
}

/// Configuration for corpus-wide vocabulary extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VocabularyConfig {
    /// Encoding of every input file.
    pub encoding: Encoding,
    /// Minimum corpus frequency; `0` disables the filter.
    pub min_count: u64,
    /// Minimum token length in characters.
    pub min_word_size: usize,
    /// Maximum number of counted words kept before reserved tokens; `0` keeps all.
    pub max_vocab_size: usize,
    /// Tokens removed after counting.
    pub ignore_tokens: BTreeSet<String>,
    /// Requested number of parallel workers.
    pub num_workers: usize,
    /// Placeholder replacing purely numeric tokens; `None` keeps digits as-is.
    pub numeric_placeholder: Option<String>,
    /// Normalisation stage ordering applied to file contents.
    pub normalization: NormalizationOrder,
    /// Tokenizer settings used by every worker.
    pub tokenizer: TokenizerConfig,
    /// Enables progress logging through the `log` facade.
    pub show_progress: bool,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Latin1,
            min_count: 2,
            min_word_size: 2,
            max_vocab_size: 65_536,
            ignore_tokens: BTreeSet::new(),
            num_workers: 8,
            numeric_placeholder: Some(DEFAULT_NUMERIC_PLACEHOLDER.into()),
            normalization: NormalizationOrder::Composed,
            tokenizer: TokenizerConfig::default(),
            show_progress: true,
        }
    }
}

impl VocabularyConfig {
    /// Returns a builder initialised with [`VocabularyConfig::default`].
    #[must_use]
    pub fn builder() -> VocabularyBuilder {
        VocabularyBuilder::default()
    }

    /// End-of-sequence token injected into every vocabulary.
    #[must_use]
    pub fn eos_token(&self) -> &str {
        &self.tokenizer.eos_token
    }

    /// Validates the invariants required for extraction.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(WordwinError::InvalidConfig(
                "num_workers must be greater than zero".into(),
            ));
        }
        if self.tokenizer.eos_token.is_empty() {
            return Err(WordwinError::InvalidConfig(
                "eos_token must not be empty".into(),
            ));
        }
        if self
            .numeric_placeholder
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(WordwinError::InvalidConfig(
                "numeric_placeholder must not be empty when set".into(),
            ));
        }
        if self.tokenizer.delimiters.is_empty() && self.tokenizer.eos_chars.is_empty() {
            return Err(WordwinError::InvalidConfig(
                "tokenizer requires at least one delimiter or eos character".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`VocabularyConfig`].
#[derive(Debug, Default, Clone)]
pub struct VocabularyBuilder {
    cfg: VocabularyConfig,
}

impl VocabularyBuilder {
    /// Creates a builder with [`VocabularyConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.cfg.encoding = encoding;
        self
    }

    /// Sets the minimum word frequency.
    #[must_use]
    pub fn min_count(mut self, value: u64) -> Self {
        self.cfg.min_count = value;
        self
    }

    /// Sets the minimum token length in characters.
    #[must_use]
    pub fn min_word_size(mut self, value: usize) -> Self {
        self.cfg.min_word_size = value;
        self
    }

    /// Sets the maximum vocabulary size before reserved tokens.
    #[must_use]
    pub fn max_vocab_size(mut self, value: usize) -> Self {
        self.cfg.max_vocab_size = value;
        self
    }

    /// Overrides the set of ignored tokens.
    #[must_use]
    pub fn ignore_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.ignore_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the requested worker count.
    #[must_use]
    pub fn num_workers(mut self, value: usize) -> Self {
        self.cfg.num_workers = value;
        self
    }

    /// Sets or disables the numeric placeholder.
    #[must_use]
    pub fn numeric_placeholder<S: Into<String>>(mut self, placeholder: Option<S>) -> Self {
        self.cfg.numeric_placeholder = placeholder.map(Into::into);
        self
    }

    /// Selects the normalisation ordering.
    #[must_use]
    pub fn normalization(mut self, order: NormalizationOrder) -> Self {
        self.cfg.normalization = order;
        self
    }

    /// Overrides the tokenizer settings.
    #[must_use]
    pub fn tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.cfg.tokenizer = tokenizer;
        self
    }

    /// Enables or disables progress logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`VocabularyConfig`].
    pub fn build(self) -> Result<VocabularyConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration for frequency-based subsampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubsampleConfig {
    /// Threshold ratio relative to the total token count.
    pub threshold: f64,
    /// Optional RNG seed for reproducible draws.
    pub seed: Option<u64>,
}

impl Default for SubsampleConfig {
    fn default() -> Self {
        Self {
            threshold: 1e-5,
            seed: None,
        }
    }
}

impl SubsampleConfig {
    /// Validates that the threshold is a positive finite ratio.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(WordwinError::InvalidConfig(format!(
                "subsample threshold ({}) must be a positive finite number",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the window generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window sizes; each gets an independent set of buffers.
    pub window_sizes: Vec<usize>,
    /// Skip sizes; skip `k` samples every `(k+1)`-th token in `k+1` phases.
    pub skips: Vec<usize>,
    /// Positions discarded after each emission.
    pub stride: usize,
    /// Token that resets every buffer.
    pub eos_token: String,
    /// Single-character tokens that also reset every buffer.
    pub eos_chars: BTreeSet<char>,
    /// Token used to fill trailing windows at end of stream.
    pub padding_token: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_sizes: vec![3],
            skips: vec![0],
            stride: 1,
            eos_token: DEFAULT_EOS_TOKEN.into(),
            eos_chars: ['\n'].into_iter().collect(),
            padding_token: None,
        }
    }
}

impl WindowConfig {
    /// Returns a builder initialised with [`WindowConfig::default`].
    #[must_use]
    pub fn builder() -> WindowBuilder {
        WindowBuilder::default()
    }

    /// Largest configured window size.
    #[must_use]
    pub fn max_window_size(&self) -> usize {
        self.window_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Validates the vocabulary-independent invariants.
    pub fn validate(&self) -> Result<()> {
        if self.window_sizes.is_empty() || self.window_sizes.contains(&0) {
            return Err(WordwinError::InvalidConfig(
                "window_sizes must be non-empty and strictly positive".into(),
            ));
        }
        if self.skips.is_empty() {
            return Err(WordwinError::InvalidConfig(
                "skips must contain at least one skip size".into(),
            ));
        }
        let max_window = self.max_window_size();
        if self.stride == 0 || self.stride > max_window {
            return Err(WordwinError::InvalidConfig(format!(
                "stride ({}) must lie within [1, {max_window}]",
                self.stride
            )));
        }
        Ok(())
    }
}

/// Builder for [`WindowConfig`].
#[derive(Debug, Default, Clone)]
pub struct WindowBuilder {
    cfg: WindowConfig,
}

impl WindowBuilder {
    /// Creates a builder with [`WindowConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the window sizes.
    #[must_use]
    pub fn window_sizes<I: IntoIterator<Item = usize>>(mut self, sizes: I) -> Self {
        self.cfg.window_sizes = sizes.into_iter().collect();
        self
    }

    /// Overrides the skip sizes.
    #[must_use]
    pub fn skips<I: IntoIterator<Item = usize>>(mut self, skips: I) -> Self {
        self.cfg.skips = skips.into_iter().collect();
        self
    }

    /// Sets the stride.
    #[must_use]
    pub fn stride(mut self, stride: usize) -> Self {
        self.cfg.stride = stride;
        self
    }

    /// Sets the end-of-sequence token.
    #[must_use]
    pub fn eos_token<S: Into<String>>(mut self, token: S) -> Self {
        self.cfg.eos_token = token.into();
        self
    }

    /// Overrides the end-of-sequence characters.
    #[must_use]
    pub fn eos_chars<I: IntoIterator<Item = char>>(mut self, chars: I) -> Self {
        self.cfg.eos_chars = chars.into_iter().collect();
        self
    }

    /// Sets or clears the padding token.
    #[must_use]
    pub fn padding_token<S: Into<String>>(mut self, token: Option<S>) -> Self {
        self.cfg.padding_token = token.map(Into::into);
        self
    }

    /// Finalises the builder, deduplicating sizes and skips while preserving order.
    pub fn build(mut self) -> Result<WindowConfig> {
        dedup_preserving_order(&mut self.cfg.window_sizes);
        dedup_preserving_order(&mut self.cfg.skips);
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

fn dedup_preserving_order(values: &mut Vec<usize>) {
    let mut seen = BTreeSet::new();
    values.retain(|value| seen.insert(*value));
}

/// Configuration controlling how corpus files are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}
