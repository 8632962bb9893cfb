//! Corpus vocabulary extraction and skip-gram window generation.
//!
//! The crate exposes a streaming text pipeline and a `wordwin` command line interface.  Raw
//! documents are decoded and normalised character by character, split into tokens, counted in
//! parallel into a [`Vocabulary`], and finally turned into fixed-size id windows, optionally
//! after frequency-based subsampling.
//!
//! ```no_run
//! use wordwin::{window, VocabularyConfig, VocabularyExtractor, WindowConfig};
//!
//! # fn main() -> wordwin::Result<()> {
//! let cfg = VocabularyConfig::builder()
//!     .min_count(2)
//!     .num_workers(4)
//!     .show_progress(false)
//!     .build()?;
//! let artifacts = VocabularyExtractor::new(cfg).extract_from_paths(&["corpus.txt"])?;
//! let vocabulary = artifacts.vocabulary;
//!
//! let tokens = wordwin::tokenize_text("the cat sat on the mat", Vec::<String>::new());
//! let windows = window(tokens, &vocabulary, WindowConfig::default())?;
//! for ids in windows {
//!     println!("{ids:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Library-only users can disable
//! default features: `wordwin = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod corpus;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod normalize;
pub mod serialization;
pub mod stopwords;
pub mod subsample;
pub mod tokenize;
pub mod vocabulary;
pub mod window;

pub use config::{
    IngestConfig, SubsampleConfig, TokenizerConfig, VocabularyBuilder, VocabularyConfig,
    WindowBuilder, WindowConfig,
};
pub use encoding::{CharacterStream, Encoding};
pub use error::{Result, WordwinError};
pub use extract::{build_vocabulary, VocabularyArtifacts, VocabularyExtractor};
pub use metrics::{ChunkMetrics, ExtractionMetrics, SubsampleStats, WindowStats};
pub use normalize::{normalize, NormalizationOrder, ScriptCache};
pub use subsample::{subsample, Subsampler};
pub use tokenize::{tokenize, tokenize_text, TokenStream};
pub use vocabulary::{TokenId, Vocabulary, Word};
pub use window::{window, Window, WindowBuffer, WindowStream};
