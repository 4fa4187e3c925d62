// src/pipeline/filters/phrase_checks.rs

use crate::data_model::{TranslationUnit, Verdict};
use crate::error::Result;
use crate::executor::TuFilter;

/// Rejects TUs where either side tokenizes to nothing.
///
/// Decision-only: it never asks for a learning pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPhraseFilter;

impl EmptyPhraseFilter {
    pub const NAME: &'static str = "EmptyPhraseFilter";
}

impl TuFilter for EmptyPhraseFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, _source_language: &str, _target_language: &str) -> Result<()> {
        Ok(())
    }

    fn number_of_scans(&self) -> usize {
        0
    }

    fn process_tu(&mut self, _tu: TranslationUnit, _pass_index: usize) -> Result<()> {
        Ok(())
    }

    fn decide(&self, tu: &TranslationUnit) -> Result<Verdict> {
        if tu.has_empty_side() {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Accept)
        }
    }
}

/// Rejects TUs whose target is just a copy of the source (untranslated
/// segments), compared case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdenticalPhraseFilter;

impl IdenticalPhraseFilter {
    pub const NAME: &'static str = "IdenticalPhraseFilter";
}

impl TuFilter for IdenticalPhraseFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, _source_language: &str, _target_language: &str) -> Result<()> {
        Ok(())
    }

    fn number_of_scans(&self) -> usize {
        0
    }

    fn process_tu(&mut self, _tu: TranslationUnit, _pass_index: usize) -> Result<()> {
        Ok(())
    }

    fn decide(&self, tu: &TranslationUnit) -> Result<Verdict> {
        if tu.src_phrase.to_lowercase() == tu.trg_phrase.to_lowercase() {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Accept)
        }
    }
}
