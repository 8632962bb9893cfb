//! Helpers for persisting vocabularies.

pub mod json;

pub use json::{
    load_vocabulary, save_listing, save_vocabulary, vocabulary_from_json, vocabulary_json,
    write_listing, VocabularyFile,
};
