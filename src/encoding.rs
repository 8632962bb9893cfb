//! Character decoding of raw corpus bytes.
//!
//! [`CharacterStream`] turns any [`Read`] into a lazy sequence of characters according to a
//! declared [`Encoding`].  Decode failures are logged and the offending bytes skipped; the stream
//! itself never fails.  Markup boundaries receive extra spacing so that `<tag>word` does not fuse
//! into a single token further down the pipeline.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufReader, Bytes, Read, Take};
use std::str::FromStr;

use log::{error, warn};
use serde::{Deserialize, Serialize};

/// Text encodings understood by the corpus readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// ISO-8859-1; every byte maps to the code point of the same value.
    #[default]
    Latin1,
    /// 7-bit ASCII; bytes above `0x7F` are decode failures.
    Ascii,
    /// UTF-8, decoded incrementally.
    Utf8,
}

impl Encoding {
    /// Returns `true` when a character may span more than one byte.
    ///
    /// Byte-offset chunking is only sound for encodings where this is `false`.
    #[must_use]
    pub fn is_multi_byte(self) -> bool {
        matches!(self, Self::Utf8)
    }

    /// Canonical lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Latin1 => "latin1",
            Self::Ascii => "ascii",
            Self::Utf8 => "utf-8",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            other => Err(format!(
                "unsupported encoding {other:?} (expected latin1, ascii or utf-8)"
            )),
        }
    }
}

/// Lazy character decoder over a byte source.
///
/// Emits a space before every `<` and after every `>`.
pub struct CharacterStream<R: Read> {
    bytes: Bytes<BufReader<Take<R>>>,
    encoding: Encoding,
    pending: VecDeque<char>,
    partial: Vec<u8>,
    exhausted: bool,
}

impl<R: Read> CharacterStream<R> {
    /// Wraps `reader`, decoding at most `limit` bytes when given.
    pub fn new(reader: R, encoding: Encoding, limit: Option<u64>) -> Self {
        let limited = reader.take(limit.unwrap_or(u64::MAX));
        Self {
            bytes: BufReader::new(limited).bytes(),
            encoding,
            pending: VecDeque::with_capacity(4),
            partial: Vec::with_capacity(4),
            exhausted: false,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.exhausted {
            return None;
        }
        match self.bytes.next() {
            Some(Ok(byte)) => Some(byte),
            Some(Err(err)) => {
                error!("encountered exhausted byte stream before end of input: {err}");
                self.exhausted = true;
                None
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    fn decode_next(&mut self) -> Option<char> {
        loop {
            let Some(byte) = self.next_byte() else {
                if !self.partial.is_empty() {
                    warn!(
                        "dropping truncated {} sequence {:02x?} at end of input",
                        self.encoding, self.partial
                    );
                    self.partial.clear();
                }
                return None;
            };
            match self.encoding {
                Encoding::Latin1 => return Some(char::from(byte)),
                Encoding::Ascii => {
                    if byte.is_ascii() {
                        return Some(char::from(byte));
                    }
                    warn!("unable to decode byte 0x{byte:02x} as ascii; skipping");
                }
                Encoding::Utf8 => {
                    if self.partial.is_empty() && byte.is_ascii() {
                        return Some(char::from(byte));
                    }
                    self.partial.push(byte);
                    if let Some(ch) = self.decode_partial_utf8() {
                        return Some(ch);
                    }
                }
            }
        }
    }

    fn decode_partial_utf8(&mut self) -> Option<char> {
        loop {
            match std::str::from_utf8(&self.partial) {
                Ok(decoded) => {
                    let ch = decoded.chars().next();
                    self.partial.clear();
                    return ch;
                }
                // Incomplete sequence; wait for more bytes.
                Err(err) if err.error_len().is_none() => return None,
                Err(err) => {
                    let invalid = err.error_len().unwrap_or(1).max(1);
                    warn!(
                        "unable to decode bytes {:02x?} as utf-8; skipping",
                        &self.partial[..invalid]
                    );
                    self.partial.drain(..invalid);
                    if self.partial.is_empty() {
                        return None;
                    }
                }
            }
        }
    }
}

impl<R: Read> Iterator for CharacterStream<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if let Some(ch) = self.pending.pop_front() {
            return Some(ch);
        }
        let ch = self.decode_next()?;
        match ch {
            '<' => {
                self.pending.push_back('<');
                Some(' ')
            }
            '>' => {
                self.pending.push_back(' ');
                Some('>')
            }
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], encoding: Encoding) -> String {
        CharacterStream::new(bytes, encoding, None).collect()
    }

    #[test]
    fn latin1_maps_every_byte() {
        assert_eq!(decode(b"caf\xe9", Encoding::Latin1), "café");
    }

    #[test]
    fn ascii_skips_high_bytes() {
        assert_eq!(decode(b"ab\xffcd", Encoding::Ascii), "abcd");
    }

    #[test]
    fn utf8_skips_invalid_and_truncated_sequences() {
        let mut bytes = "né".as_bytes().to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice("x".as_bytes());
        bytes.extend_from_slice(&[0xe2, 0x82]);
        assert_eq!(decode(&bytes, Encoding::Utf8), "néx");
    }

    #[test]
    fn markup_boundaries_are_spaced() {
        assert_eq!(decode(b"a<b>c", Encoding::Latin1), "a <b> c");
    }

    #[test]
    fn limit_truncates_input() {
        let stream = CharacterStream::new(&b"hello world"[..], Encoding::Ascii, Some(5));
        assert_eq!(stream.collect::<String>(), "hello");
    }

    #[test]
    fn encoding_parses_common_labels() {
        assert_eq!("ISO-8859-1".parse::<Encoding>(), Ok(Encoding::Latin1));
        assert_eq!("utf_8".parse::<Encoding>(), Ok(Encoding::Utf8));
        assert!("ebcdic".parse::<Encoding>().is_err());
        assert!(Encoding::Utf8.is_multi_byte());
        assert!(!Encoding::Latin1.is_multi_byte());
    }
}
