// src/pipeline/readers/mod.rs

pub mod corpus_reader;

pub use corpus_reader::{CorpusReader, CorpusRecord};
