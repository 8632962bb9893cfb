//! Skip-gram window generation over id-translatable token streams.
//!
//! One [`WindowBuffer`] is instantiated per `(window_size, skip_size, start_position)` with
//! `start_position` ranging over `0..=skip_size`, so a skip size `k` samples every `(k+1)`-th
//! token in all `k+1` phases.

use std::collections::{BTreeSet, VecDeque};

use log::debug;

use crate::config::WindowConfig;
use crate::error::{Result, WordwinError};
use crate::metrics::WindowStats;
use crate::vocabulary::{TokenId, Vocabulary};

/// An emitted window: `window_size` token ids in stream order.
pub type Window = Vec<TokenId>;

/// Bounded FIFO that admits every `(skip_size + 1)`-th token starting at `start_position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowBuffer {
    window_size: usize,
    skip_size: usize,
    start_position: usize,
    position: usize,
    buffer: VecDeque<TokenId>,
}

impl WindowBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new(window_size: usize, skip_size: usize, start_position: usize) -> Self {
        Self {
            window_size,
            skip_size,
            start_position,
            position: start_position,
            buffer: VecDeque::with_capacity(window_size),
        }
    }

    /// Offers a token; it is stored only when the position counter is in phase.
    pub fn append(&mut self, id: TokenId) {
        if self.position % (self.skip_size + 1) == 0 && !self.is_full() {
            self.buffer.push_back(id);
        }
        self.position += 1;
    }

    /// Drops the contents and rewinds the position counter.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.position = self.start_position;
    }

    /// Drops the oldest `num_positions` tokens, or everything when fewer are held.
    pub fn forget(&mut self, num_positions: usize) {
        let count = num_positions.min(self.buffer.len());
        self.buffer.drain(..count);
    }

    /// Returns `true` once `window_size` tokens are held.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.window_size
    }

    /// Returns `true` when no token is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Copies the held ids into a window.
    #[must_use]
    pub fn snapshot(&self) -> Window {
        self.buffer.iter().copied().collect()
    }

    /// Configured window size.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Configured skip size.
    #[must_use]
    pub fn skip_size(&self) -> usize {
        self.skip_size
    }

    /// Configured start phase.
    #[must_use]
    pub fn start_position(&self) -> usize {
        self.start_position
    }

    fn pad(&mut self, id: TokenId) {
        while !self.is_full() {
            self.append(id);
        }
    }
}

/// Lazy window generator.
///
/// Windows of all buffers are yielded in the order the buffers fill; buffers are ordered by
/// window size, then skip size, then start position.
#[derive(Debug)]
pub struct WindowStream<'v, I> {
    tokens: I,
    vocabulary: &'v Vocabulary,
    eos_token: String,
    eos_chars: BTreeSet<char>,
    padding: Option<TokenId>,
    stride: usize,
    buffers: Vec<WindowBuffer>,
    pending: VecDeque<Window>,
    exhausted: bool,
    stats: WindowStats,
}

impl<'v, I, S> WindowStream<'v, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    /// Validates `cfg` against `vocabulary` and prepares one buffer per phase.
    pub fn new(tokens: I, vocabulary: &'v Vocabulary, cfg: WindowConfig) -> Result<Self> {
        cfg.validate()?;
        if !vocabulary.contains(&cfg.eos_token) {
            return Err(WordwinError::InvalidConfig(format!(
                "end-of-sequence token {:?} is not in the vocabulary",
                cfg.eos_token
            )));
        }
        let padding = match &cfg.padding_token {
            Some(token) => Some(vocabulary.id_of(token).ok_or_else(|| {
                WordwinError::InvalidConfig(format!(
                    "padding token {token:?} is not in the vocabulary"
                ))
            })?),
            None => None,
        };

        let buffers: Vec<WindowBuffer> = cfg
            .window_sizes
            .iter()
            .flat_map(|&size| {
                cfg.skips.iter().flat_map(move |&skip| {
                    (0..=skip).map(move |start| WindowBuffer::new(size, skip, start))
                })
            })
            .collect();
        debug!(
            "windowing with {} buffers (sizes {:?}, skips {:?}, stride {})",
            buffers.len(),
            cfg.window_sizes,
            cfg.skips,
            cfg.stride
        );

        Ok(Self {
            tokens,
            vocabulary,
            eos_token: cfg.eos_token,
            eos_chars: cfg.eos_chars,
            padding,
            stride: cfg.stride,
            buffers,
            pending: VecDeque::new(),
            exhausted: false,
            stats: WindowStats::default(),
        })
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Buffers in emission priority order.
    #[must_use]
    pub fn buffers(&self) -> &[WindowBuffer] {
        &self.buffers
    }

    fn is_eos(&self, token: &str) -> bool {
        if token == self.eos_token {
            return true;
        }
        let mut chars = token.chars();
        matches!((chars.next(), chars.next()), (Some(ch), None) if self.eos_chars.contains(&ch))
    }

    fn feed(&mut self, token: &str) {
        if self.is_eos(token) {
            self.buffers.iter_mut().for_each(WindowBuffer::clear);
            return;
        }
        let Some(id) = self.vocabulary.id_of(token) else {
            return;
        };
        for buffer in &mut self.buffers {
            buffer.append(id);
            if buffer.is_full() {
                self.pending.push_back(buffer.snapshot());
                self.stats.emitted += 1;
                buffer.forget(self.stride);
            }
        }
    }

    fn finish(&mut self) {
        self.exhausted = true;
        let Some(padding) = self.padding else {
            return;
        };
        for buffer in &mut self.buffers {
            buffer.pad(padding);
            self.pending.push_back(buffer.snapshot());
            self.stats.emitted += 1;
            self.stats.padded += 1;
            buffer.clear();
        }
    }
}

impl<'v, I, S> Iterator for WindowStream<'v, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        loop {
            if let Some(window) = self.pending.pop_front() {
                return Some(window);
            }
            if self.exhausted {
                return None;
            }
            match self.tokens.next() {
                Some(token) => self.feed(token.as_ref()),
                None => self.finish(),
            }
        }
    }
}

/// Generates windows over `tokens` with the given configuration.
pub fn window<'v, I, S>(
    tokens: I,
    vocabulary: &'v Vocabulary,
    cfg: WindowConfig,
) -> Result<WindowStream<'v, I::IntoIter>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    WindowStream::new(tokens.into_iter(), vocabulary, cfg)
}
