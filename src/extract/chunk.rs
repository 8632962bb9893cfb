use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error};
use rustc_hash::FxHashMap;

use crate::config::{TokenizerConfig, VocabularyConfig};
use crate::corpus::{align_offset, chunk_bounds};
use crate::encoding::{CharacterStream, Encoding};
use crate::error::{Result, WordwinError};
use crate::metrics::ChunkMetrics;
use crate::normalize::{normalize, NormalizationOrder};
use crate::tokenize::{is_numeric_token, tokenize};

/// Immutable settings shared by every chunk task of one extraction.
#[derive(Debug, Clone)]
pub(crate) struct ChunkParams {
    pub(crate) encoding: Encoding,
    pub(crate) min_word_size: usize,
    pub(crate) numeric_placeholder: Option<String>,
    pub(crate) normalization: NormalizationOrder,
    pub(crate) tokenizer: TokenizerConfig,
}

impl From<&VocabularyConfig> for ChunkParams {
    fn from(cfg: &VocabularyConfig) -> Self {
        Self {
            encoding: cfg.encoding,
            min_word_size: cfg.min_word_size,
            numeric_placeholder: cfg.numeric_placeholder.clone(),
            normalization: cfg.normalization,
            tokenizer: TokenizerConfig {
                ignore_words: Default::default(),
                ..cfg.tokenizer.clone()
            },
        }
    }
}

/// One unit of work: chunk `index` of `num_chunks` of `path`.
#[derive(Debug, Clone)]
pub(crate) struct ChunkPayload {
    pub(crate) path: PathBuf,
    pub(crate) index: usize,
    pub(crate) num_chunks: usize,
    pub(crate) params: Arc<ChunkParams>,
}

/// Token counts produced by a single chunk.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChunkCounts {
    pub(crate) num_tokens: u64,
    pub(crate) counts: FxHashMap<String, u64>,
    pub(crate) byte_range: (u64, u64),
}

impl ChunkCounts {
    pub(crate) fn metrics(&self, chunk: usize) -> ChunkMetrics {
        ChunkMetrics {
            chunk,
            byte_range: self.byte_range,
            tokens: self.num_tokens,
            unique_tokens: self.counts.len(),
        }
    }
}

/// Counts the tokens of one chunk, wrapping any failure as a worker error.
pub(crate) fn count_chunk(payload: &ChunkPayload) -> Result<ChunkCounts> {
    count_chunk_inner(payload).map_err(|err| {
        error!(
            "worker failed on chunk {} of {}: {err}",
            payload.index,
            payload.path.display()
        );
        WordwinError::Worker {
            path: payload.path.clone(),
            chunk: payload.index,
            message: err.to_string(),
        }
    })
}

fn count_chunk_inner(payload: &ChunkPayload) -> Result<ChunkCounts> {
    let params = payload.params.as_ref();
    if payload.index >= payload.num_chunks {
        return Err(WordwinError::Internal(format!(
            "chunk index {} out of range for {} chunks",
            payload.index, payload.num_chunks
        )));
    }
    if params.encoding.is_multi_byte() && payload.num_chunks != 1 {
        return Err(WordwinError::InvalidConfig(format!(
            "cannot split files into chunks with multi-byte encoding {}",
            params.encoding
        )));
    }

    let path = &payload.path;
    let with_path = |err: std::io::Error| WordwinError::io(err, Some(path.clone()));
    let mut file = File::open(path).map_err(with_path)?;
    let file_size = file.metadata().map_err(with_path)?.len();

    let (nominal_start, nominal_end) = chunk_bounds(file_size, payload.index, payload.num_chunks);
    let boundary = params.tokenizer.boundary_bytes();
    let start = align_offset(&mut file, nominal_start, file_size, &boundary)?;
    let end = align_offset(&mut file, nominal_end, file_size, &boundary)?;
    debug!(
        "[{}:{}] reading from {start} to {end} (file size={file_size})",
        path.display(),
        payload.index
    );

    let mut counts = ChunkCounts {
        byte_range: (start, end),
        ..ChunkCounts::default()
    };
    if end <= start {
        return Ok(counts);
    }

    file.seek(SeekFrom::Start(start)).map_err(with_path)?;
    let chars = CharacterStream::new(file, params.encoding, Some(end - start));
    let tokens = tokenize(
        normalize(chars, params.normalization),
        params.tokenizer.clone(),
    );
    for token in tokens {
        if token.chars().count() < params.min_word_size {
            continue;
        }
        let token = match &params.numeric_placeholder {
            Some(placeholder) if is_numeric_token(&token) => placeholder.clone(),
            _ => token,
        };
        *counts.counts.entry(token).or_insert(0) += 1;
        counts.num_tokens += 1;
    }

    debug!(
        "[{}:{}] done: {} tokens ({} unique)",
        path.display(),
        payload.index,
        counts.num_tokens,
        counts.counts.len()
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn params(encoding: Encoding) -> Arc<ChunkParams> {
        Arc::new(ChunkParams {
            encoding,
            min_word_size: 1,
            numeric_placeholder: None,
            normalization: NormalizationOrder::Composed,
            tokenizer: TokenizerConfig::default(),
        })
    }

    fn payloads(path: &std::path::Path, num_chunks: usize, encoding: Encoding) -> Vec<ChunkPayload> {
        let params = params(encoding);
        (0..num_chunks)
            .map(|index| ChunkPayload {
                path: path.to_path_buf(),
                index,
                num_chunks,
                params: Arc::clone(&params),
            })
            .collect()
    }

    fn merged(payloads: &[ChunkPayload]) -> (u64, FxHashMap<String, u64>) {
        let mut total = 0;
        let mut counts = FxHashMap::default();
        for payload in payloads {
            let chunk = count_chunk(payload).expect("chunk counts");
            total += chunk.num_tokens;
            for (token, count) in chunk.counts {
                *counts.entry(token).or_insert(0) += count;
            }
        }
        (total, counts)
    }

    #[test]
    fn chunked_counts_match_whole_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("corpus.txt");
        let text = "the quick brown fox\njumps over the lazy dog\nthe end of <doc> text\n".repeat(7);
        fs::write(&path, text).expect("write corpus");

        let whole = merged(&payloads(&path, 1, Encoding::Latin1));
        for num_chunks in [2, 3, 5, 16] {
            let chunked = merged(&payloads(&path, num_chunks, Encoding::Latin1));
            assert_eq!(chunked, whole, "mismatch with {num_chunks} chunks");
        }
        assert_eq!(whole.1["the"], 21);
        assert_eq!(whole.1["</s>"], 21);
    }

    #[test]
    fn multi_byte_chunking_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "ünïcode text").expect("write corpus");
        let err = count_chunk(&payloads(&path, 2, Encoding::Utf8)[0]).expect_err("must fail");
        assert!(matches!(err, WordwinError::Worker { chunk: 0, .. }));
    }

    #[test]
    fn missing_file_reports_worker_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("absent.txt");
        let err = count_chunk(&payloads(&path, 1, Encoding::Latin1)[0]).expect_err("must fail");
        assert!(matches!(err, WordwinError::Worker { message, .. } if message.contains("io error")));
    }

    #[test]
    fn numeric_placeholder_and_min_size_apply() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "a bb ccc 42 7").expect("write corpus");
        let params = Arc::new(ChunkParams {
            min_word_size: 2,
            numeric_placeholder: Some("<num>".into()),
            ..(*params(Encoding::Latin1)).clone()
        });
        let payload = ChunkPayload {
            path,
            index: 0,
            num_chunks: 1,
            params,
        };
        let counts = count_chunk(&payload).expect("counts");
        // Digits are not LATIN/SIGN characters and are removed before tokenization.
        assert_eq!(counts.counts.get("<num>"), None);
        assert_eq!(counts.counts["bb"], 1);
        assert_eq!(counts.counts["ccc"], 1);
        assert_eq!(counts.counts.get("a"), None);
        assert_eq!(counts.num_tokens, 2);
    }
}
