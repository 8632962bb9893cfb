//! Built-in ignore sets and loaders for user-provided ones.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Result, WordwinError};

const ENGLISH: &str = include_str!("../references/stopwords_en.txt");
const DUTCH: &str = include_str!("../references/stopwords_nl.txt");

/// Markup tokens of TREC text collections.
pub const TREC_TOKENS: [&str; 5] = ["<doc>", "</doc>", "<docno>", "<text>", "</text>"];

static STOPWORDS: OnceLock<BTreeSet<String>> = OnceLock::new();

fn parse_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Returns the bundled English and Dutch stopword lists.
pub fn stopwords() -> &'static BTreeSet<String> {
    STOPWORDS.get_or_init(|| {
        parse_list(ENGLISH)
            .chain(parse_list(DUTCH))
            .map(str::to_string)
            .collect()
    })
}

/// Builds the default ignore set, optionally including TREC markup tokens.
#[must_use]
pub fn default_ignore_words(include_trec_markup: bool) -> BTreeSet<String> {
    let mut words = stopwords().clone();
    if include_trec_markup {
        words.extend(TREC_TOKENS.iter().map(|token| token.to_string()));
    }
    words
}

/// Reads one ignore word per line; blank lines and `#` comments are skipped.
pub fn load_ignore_file<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
    let raw = fs::read_to_string(path.as_ref())
        .map_err(|err| WordwinError::io(err, Some(path.as_ref().to_path_buf())))?;
    Ok(parse_list(&raw).map(str::to_string).collect())
}
