//! Metrics describing extraction runs and stream stages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-chunk observations reported by a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetrics {
    /// Zero-based chunk index within its file.
    pub chunk: usize,
    /// Byte range actually read after boundary alignment.
    pub byte_range: (u64, u64),
    /// Tokens counted in the chunk.
    pub tokens: u64,
    /// Distinct tokens counted in the chunk.
    pub unique_tokens: usize,
}

/// Aggregate metrics produced by a vocabulary extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionMetrics {
    /// Number of input files.
    pub files: usize,
    /// Number of chunk payloads dispatched.
    pub chunks: usize,
    /// Worker threads actually used.
    pub workers: usize,
    /// Tokens counted across all chunks before filtering.
    pub observed_tokens: u64,
    /// Distinct tokens observed before filtering.
    pub unique_tokens: usize,
    /// Words retained after filtering, truncation, and reserved-token injection.
    pub retained_words: usize,
    /// Total duration of the extraction.
    pub total_duration: Duration,
    /// Resident set size sample captured after aggregation.
    pub rss_kb: Option<usize>,
    /// Observations of each chunk in payload order.
    pub per_chunk: Vec<ChunkMetrics>,
}

impl ExtractionMetrics {
    /// Creates an empty metrics container.
    #[must_use]
    pub fn new(files: usize, chunks: usize, workers: usize) -> Self {
        Self {
            files,
            chunks,
            workers,
            observed_tokens: 0,
            unique_tokens: 0,
            retained_words: 0,
            total_duration: Duration::ZERO,
            rss_kb: None,
            per_chunk: Vec::with_capacity(chunks),
        }
    }
}

/// Counters exposed by the subsampler.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubsampleStats {
    /// In-vocabulary tokens examined.
    pub examined: u64,
    /// Tokens discarded by the random draw.
    pub discarded: u64,
}

impl SubsampleStats {
    /// Tokens passed through.
    #[must_use]
    pub fn retained(&self) -> u64 {
        self.examined - self.discarded
    }
}

/// Counters exposed by the window generator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowStats {
    /// Windows emitted, including padded ones.
    pub emitted: u64,
    /// Windows completed with padding at end of stream.
    pub padded: u64,
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
