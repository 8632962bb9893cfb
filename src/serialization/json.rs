//! JSON persistence for [`Vocabulary`] plus a plain-text listing.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordwinError};
use crate::vocabulary::{Vocabulary, Word};

/// On-disk layout: token to `(id, count)` plus the explicit total count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyFile {
    /// Total number of word impressions.
    pub total_count: u64,
    /// Entries keyed by token, sorted for stable output.
    pub words: BTreeMap<String, Word>,
}

impl From<&Vocabulary> for VocabularyFile {
    fn from(vocabulary: &Vocabulary) -> Self {
        Self {
            total_count: vocabulary.num_word_impressions(),
            words: vocabulary
                .iter()
                .map(|(token, word)| (token.to_string(), word))
                .collect(),
        }
    }
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = WordwinError;

    fn try_from(file: VocabularyFile) -> Result<Self> {
        let words: AHashMap<String, Word> = file.words.into_iter().collect();
        Vocabulary::with_total_count(words, file.total_count)
    }
}

/// Serialises `vocabulary` to a JSON string.
pub fn vocabulary_json(vocabulary: &Vocabulary, pretty: bool) -> Result<String> {
    let file = VocabularyFile::from(vocabulary);
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(json)
}

/// Parses a vocabulary from JSON, validating the id bijection.
pub fn vocabulary_from_json(json: &str) -> Result<Vocabulary> {
    let file: VocabularyFile = serde_json::from_str(json)?;
    Vocabulary::try_from(file)
}

/// Writes `vocabulary` as JSON to `path`.
pub fn save_vocabulary<P: AsRef<Path>>(vocabulary: &Vocabulary, path: P, pretty: bool) -> Result<()> {
    let json = vocabulary_json(vocabulary, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| WordwinError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a vocabulary previously written by [`save_vocabulary`].
pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
    let json = fs::read_to_string(path.as_ref())
        .map_err(|err| WordwinError::io(err, Some(path.as_ref().to_path_buf())))?;
    vocabulary_from_json(&json)
}

/// Writes one `token id` line per entry in id order.
pub fn write_listing<W: Write>(vocabulary: &Vocabulary, mut writer: W) -> std::io::Result<()> {
    for (token, word) in vocabulary.iter() {
        writeln!(writer, "{token} {}", word.id)?;
    }
    writer.flush()
}

/// Writes the `token id` listing to `path`.
pub fn save_listing<P: AsRef<Path>>(vocabulary: &Vocabulary, path: P) -> Result<()> {
    let with_path = |err: std::io::Error| WordwinError::io(err, Some(path.as_ref().to_path_buf()));
    let file = File::create(path.as_ref()).map_err(with_path)?;
    write_listing(vocabulary, BufWriter::new(file)).map_err(with_path)
}
