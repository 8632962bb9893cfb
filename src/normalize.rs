//! Character-level normalisation stages.
//!
//! Every stage is an independent iterator adapter over `char`s so callers can compose them in
//! whichever order their context requires.  [`NormalizationOrder`] names the two orderings used
//! by the crate itself.

use std::io::Read;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::encoding::{CharacterStream, Encoding};

/// Characters that survive the alphanumeric filter besides letters, digits, and whitespace.
const MARKUP_CHARS: [char; 3] = ['<', '/', '>'];

/// Ordering of the normalisation stages applied to a character stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationOrder {
    /// NFKC, alphanumeric filter, script filter, lowercase.  Used for ad hoc text.
    #[default]
    Composed,
    /// Script filter, alphanumeric filter, lowercase.  No compatibility normalisation.
    Raw,
}

/// Memoised answers to "is this character Latin (or a sign)?".
///
/// Character-name lookups are comparatively expensive, so filters keep one of these and callers
/// may carry it across streams with [`LatinFilter::into_cache`].
#[derive(Debug, Clone, Default)]
pub struct ScriptCache {
    entries: FxHashMap<char, bool>,
}

impl ScriptCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `ch` is kept by the script filter, consulting the cache first.
    pub fn is_latin(&mut self, ch: char) -> bool {
        if ch.is_whitespace() {
            return true;
        }
        *self.entries.entry(ch).or_insert_with(|| classify(ch))
    }

    /// Number of memoised characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been classified yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn classify(ch: char) -> bool {
    unicode_names2::name(ch).map_or(false, |name| {
        let name = name.to_string();
        name.contains("LATIN") || name.contains("SIGN")
    })
}

/// Drops characters whose Unicode name mentions neither `LATIN` nor `SIGN`.
#[derive(Debug, Clone)]
pub struct LatinFilter<I> {
    inner: I,
    cache: ScriptCache,
}

impl<I> LatinFilter<I> {
    /// Returns the cache so a later stream can reuse it.
    pub fn into_cache(self) -> ScriptCache {
        self.cache
    }
}

impl<I: Iterator<Item = char>> Iterator for LatinFilter<I> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        let cache = &mut self.cache;
        self.inner.by_ref().find(|&ch| cache.is_latin(ch))
    }
}

/// Script filter with a fresh cache.
pub fn filter_non_latin<I: Iterator<Item = char>>(chars: I) -> LatinFilter<I> {
    filter_non_latin_with(chars, ScriptCache::default())
}

/// Script filter reusing an existing cache.
pub fn filter_non_latin_with<I: Iterator<Item = char>>(
    chars: I,
    cache: ScriptCache,
) -> LatinFilter<I> {
    LatinFilter {
        inner: chars,
        cache,
    }
}

/// Keeps alphanumeric characters, whitespace, and `<`, `/`, `>`.
pub fn filter_non_alphanumeric<I: Iterator<Item = char>>(
    chars: I,
) -> impl Iterator<Item = char> {
    chars.filter(|&ch| ch.is_alphanumeric() || ch.is_whitespace() || MARKUP_CHARS.contains(&ch))
}

/// Applies NFKC to each character independently; one input may expand to several outputs.
pub fn unicode_normalize<I: Iterator<Item = char>>(chars: I) -> impl Iterator<Item = char> {
    chars.flat_map(|ch| std::iter::once(ch).nfkc())
}

/// Lowercases every character.
pub fn lowercase<I: Iterator<Item = char>>(chars: I) -> impl Iterator<Item = char> {
    chars.flat_map(char::to_lowercase)
}

/// Runs the full normalisation chain for `order`, ending with lowercasing.
pub fn normalize<'a, I>(chars: I, order: NormalizationOrder) -> Box<dyn Iterator<Item = char> + 'a>
where
    I: Iterator<Item = char> + 'a,
{
    normalize_with_cache(chars, order, ScriptCache::default())
}

/// Same as [`normalize`] but seeds the script filter with `cache`.
pub fn normalize_with_cache<'a, I>(
    chars: I,
    order: NormalizationOrder,
    cache: ScriptCache,
) -> Box<dyn Iterator<Item = char> + 'a>
where
    I: Iterator<Item = char> + 'a,
{
    match order {
        NormalizationOrder::Composed => Box::new(lowercase(filter_non_latin_with(
            filter_non_alphanumeric(unicode_normalize(chars)),
            cache,
        ))),
        NormalizationOrder::Raw => Box::new(lowercase(filter_non_alphanumeric(
            filter_non_latin_with(chars, cache),
        ))),
    }
}

/// Decodes `reader` with `encoding` and normalises the resulting characters.
pub fn normalize_reader<'a, R: Read + 'a>(
    reader: R,
    encoding: Encoding,
    order: NormalizationOrder,
) -> Box<dyn Iterator<Item = char> + 'a> {
    normalize(CharacterStream::new(reader, encoding, None), order)
}

/// Normalises an in-memory string.
#[must_use]
pub fn normalize_text(text: &str, order: NormalizationOrder) -> String {
    normalize(text.chars(), order).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_filter_keeps_latin_signs_and_whitespace() {
        let kept: String = filter_non_latin("aé\tП<1 >€".chars()).collect();
        // Digits are named DIGIT ..., Cyrillic is not Latin; `<`, `>` and `€` are signs.
        assert_eq!(kept, "aé\t< >€");
    }

    #[test]
    fn latin_cache_is_reused() {
        let mut filter = filter_non_latin("abca".chars());
        assert_eq!(filter.by_ref().count(), 4);
        let cache = filter.into_cache();
        assert_eq!(cache.len(), 3);
        let again: String = filter_non_latin_with("cab".chars(), cache).collect();
        assert_eq!(again, "cab");
    }

    #[test]
    fn alphanumeric_filter_keeps_markup() {
        let kept: String = filter_non_alphanumeric("<a href='x'>hi, there!</a>".chars()).collect();
        assert_eq!(kept, "<a hrefx>hi there</a>");
    }

    #[test]
    fn nfkc_expands_compatibility_characters() {
        let normalized: String = unicode_normalize("ﬁ①".chars()).collect();
        assert_eq!(normalized, "fi1");
    }

    #[test]
    fn composed_order_normalises_before_filtering() {
        assert_eq!(
            normalize_text("Ｆｏｏ, Bar!", NormalizationOrder::Composed),
            "foo bar"
        );
    }

    #[test]
    fn raw_order_skips_compatibility_normalisation() {
        // Fullwidth letters are still LATIN, so they pass untouched apart from lowercasing.
        assert_eq!(normalize_text("Ｆoo", NormalizationOrder::Raw), "ｆoo");
    }

    #[test]
    fn reader_pipeline_spaces_markup() {
        let text: String = normalize_reader(
            &b"<DOC>Caf\xe9</DOC>"[..],
            Encoding::Latin1,
            NormalizationOrder::Composed,
        )
        .collect();
        // `/` is named SOLIDUS and therefore removed by the script filter.
        assert_eq!(text, " <doc> café <doc> ");
    }
}
