//! Parallel vocabulary extraction over a set of corpus files.
//!
//! Each file is divided into byte-range chunks that are counted independently on a dedicated
//! `rayon` pool.  Chunk results are merged sequentially in payload order, then filtered,
//! sorted, truncated, and assigned dense ids.

mod chunk;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use std::{cmp::Reverse, fmt};

use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use rustc_hash::FxHashMap;

use crate::config::{IngestConfig, VocabularyBuilder, VocabularyConfig};
use crate::corpus::{chunks_per_file, collect_paths};
use crate::error::{Result, WordwinError};
use crate::metrics::{sample_rss_kb, ExtractionMetrics};
use crate::vocabulary::Vocabulary;

use self::chunk::{count_chunk, ChunkCounts, ChunkParams, ChunkPayload};

/// High-level façade configuring and executing vocabulary extraction runs.
#[derive(Debug, Clone)]
pub struct VocabularyExtractor {
    cfg: VocabularyConfig,
}

/// Artifacts returned after an extraction completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct VocabularyArtifacts {
    /// Extracted vocabulary.
    pub vocabulary: Vocabulary,
    /// Metrics captured during extraction.
    pub metrics: ExtractionMetrics,
}

impl VocabularyExtractor {
    /// Creates a new extractor for the supplied configuration.
    #[must_use]
    pub fn new(cfg: VocabularyConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`VocabularyBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> VocabularyBuilder {
        VocabularyConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &VocabularyConfig {
        &self.cfg
    }

    /// Discovers files under `inputs` and extracts a vocabulary from them.
    pub fn extract_from_inputs<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<VocabularyArtifacts> {
        let files = collect_paths(inputs, ingest)?;
        self.extract_from_paths(&files)
    }

    /// Extracts a vocabulary from the given files.
    pub fn extract_from_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<VocabularyArtifacts> {
        self.cfg.validate()?;
        if paths.is_empty() {
            return Err(WordwinError::InvalidConfig(
                "vocabulary extraction requires at least one file".into(),
            ));
        }

        let start = Instant::now();
        let num_chunks = chunks_per_file(self.cfg.num_workers, paths.len());
        if self.cfg.encoding.is_multi_byte() && num_chunks != 1 {
            return Err(WordwinError::InvalidConfig(format!(
                "{} workers over {} file(s) would split files into {num_chunks} chunks, which is \
                 unsupported for multi-byte encoding {}; use at most one worker per file",
                self.cfg.num_workers,
                paths.len(),
                self.cfg.encoding
            )));
        }

        let params = Arc::new(ChunkParams::from(&self.cfg));
        let payloads: Vec<ChunkPayload> = paths
            .iter()
            .flat_map(|path| {
                let params = Arc::clone(&params);
                (0..num_chunks).map(move |index| ChunkPayload {
                    path: path.as_ref().to_path_buf(),
                    index,
                    num_chunks,
                    params: Arc::clone(&params),
                })
            })
            .collect();
        let workers = self.cfg.num_workers.min(payloads.len()).max(1);
        info!(
            "extracting vocabulary from {} file(s) in {} chunk(s) using {workers} worker(s)",
            paths.len(),
            payloads.len()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("wordwin-worker-{idx}"))
            .build()
            .map_err(|err| WordwinError::Internal(format!("unable to build worker pool: {err}")))?;
        let results: Vec<ChunkCounts> = pool.install(|| {
            payloads
                .par_iter()
                .map(count_chunk)
                .collect::<Result<Vec<_>>>()
        })?;

        let mut metrics = ExtractionMetrics::new(paths.len(), payloads.len(), workers);
        let mut counts: FxHashMap<String, u64> = FxHashMap::default();
        let total = results.len();
        for (idx, (payload, result)) in payloads.iter().zip(results).enumerate() {
            debug!(
                "chunk {} of {} observed {} tokens ({} unique)",
                payload.index,
                payload.path.display(),
                result.num_tokens,
                result.counts.len()
            );
            if self.cfg.show_progress && (idx + 1) % 5 == 0 {
                info!(
                    "processed {} out of {total} chunks ({:.4}%)",
                    idx + 1,
                    100.0 * (idx + 1) as f64 / total as f64
                );
            }
            metrics.per_chunk.push(result.metrics(payload.index));
            metrics.observed_tokens += result.num_tokens;
            for (token, count) in result.counts {
                *counts.entry(token).or_insert(0) += count;
            }
        }
        metrics.unique_tokens = counts.len();
        info!(
            "observed {} tokens (of which {} unique)",
            metrics.observed_tokens, metrics.unique_tokens
        );

        let vocabulary = assemble_vocabulary(counts, &self.cfg);
        metrics.retained_words = vocabulary.len();
        metrics.rss_kb = sample_rss_kb();
        metrics.total_duration = start.elapsed();
        info!(
            "retained {} unique words in {:.2?}",
            vocabulary.len(),
            metrics.total_duration
        );
        Ok(VocabularyArtifacts {
            vocabulary,
            metrics,
        })
    }
}

/// Applies ignore, frequency, and size filters to merged counts and assigns ids.
///
/// Equal counts are ordered by token so the result does not depend on merge order.
fn assemble_vocabulary(counts: FxHashMap<String, u64>, cfg: &VocabularyConfig) -> Vocabulary {
    let mut entries: Vec<(String, u64)> = counts
        .into_iter()
        .filter(|(token, _)| !cfg.ignore_tokens.contains(token))
        .collect();

    if cfg.min_count >= 1 {
        info!("filtering words that occur less than {} times", cfg.min_count);
        entries.retain(|&(_, count)| count >= cfg.min_count);
    }

    entries.sort_unstable_by(|(left_token, left), (right_token, right)| {
        (Reverse(left), left_token).cmp(&(Reverse(right), right_token))
    });

    if cfg.max_vocab_size >= 1 {
        entries.truncate(cfg.max_vocab_size);
    }

    let mut vocabulary = Vocabulary::from_sorted(entries);
    inject_reserved(&mut vocabulary, cfg.eos_token(), "end-of-sequence");
    if let Some(placeholder) = &cfg.numeric_placeholder {
        inject_reserved(&mut vocabulary, placeholder, "numeric placeholder");
    }
    vocabulary
}

fn inject_reserved(vocabulary: &mut Vocabulary, token: &str, role: &str) {
    match vocabulary.get(token) {
        Some(word) => info!("{role} token {token:?} with statistics {word:?}"),
        None => {
            info!("{role} token {token:?} not found in vocabulary; appending it");
            vocabulary.ensure_token(token);
        }
    }
}

/// Extracts a vocabulary from `paths` with `cfg`.
pub fn build_vocabulary<P: AsRef<Path>>(paths: &[P], cfg: VocabularyConfig) -> Result<Vocabulary> {
    VocabularyExtractor::new(cfg)
        .extract_from_paths(paths)
        .map(|artifacts| artifacts.vocabulary)
}

impl fmt::Display for VocabularyArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.vocabulary)?;
        writeln!(
            f,
            "Observed tokens: {} ({} unique)",
            self.metrics.observed_tokens, self.metrics.unique_tokens
        )?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
