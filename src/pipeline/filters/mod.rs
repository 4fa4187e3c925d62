// src/pipeline/filters/mod.rs

mod length_ratio;
mod phrase_checks;
pub mod stats;
mod unaligned_sequences;

pub use length_ratio::LengthRatioFilter;
pub use phrase_checks::{EmptyPhraseFilter, IdenticalPhraseFilter};
pub use unaligned_sequences::{fragmentation_ratio, UnalignedSequencesFilter};
