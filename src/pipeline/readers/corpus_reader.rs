// src/pipeline/readers/corpus_reader.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data_model::{AlignmentPair, TranslationUnit};
use crate::error::{PipelineError, Result};

/// Number of tab-separated fields in a corpus line: id, source, target.
const FIELD_COUNT: usize = 3;

/// One corpus line as read from disk, with the TU built from it when the line
/// is well formed.
#[derive(Debug)]
pub struct CorpusRecord {
    /// 1-based line number in the corpus file.
    pub line_no: usize,
    /// The line bytes without the terminator, as written to the outputs.
    pub raw: Vec<u8>,
    pub tu: Result<TranslationUnit>,
}

/// Streams a tab-separated corpus, reading the optional alignment file in
/// lockstep.
///
/// The iterator yields `Err` only for conditions that end the scan (I/O
/// failure, alignment file shorter than the corpus) and stops afterwards.
/// Malformed lines come back as records whose `tu` is an error.
pub struct CorpusReader {
    corpus: BufReader<File>,
    alignment: Option<BufReader<File>>,
    line_no: usize,
    finished: bool,
}

impl CorpusReader {
    pub fn open(corpus_path: &Path, alignment_path: Option<&Path>) -> Result<Self> {
        let corpus = open_input("Corpus", corpus_path)?;
        let alignment = alignment_path
            .map(|path| open_input("Alignment", path))
            .transpose()?;
        Ok(CorpusReader {
            corpus,
            alignment,
            line_no: 0,
            finished: false,
        })
    }

    fn next_record(&mut self) -> Result<Option<CorpusRecord>> {
        let mut raw = Vec::new();
        if self.corpus.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        strip_line_terminator(&mut raw);
        self.line_no += 1;

        let alignment = match self.alignment.as_mut() {
            Some(reader) => {
                let mut align_raw = Vec::new();
                if reader.read_until(b'\n', &mut align_raw)? == 0 {
                    return Err(PipelineError::AlignmentExhausted { line: self.line_no });
                }
                strip_line_terminator(&mut align_raw);
                Some(align_raw)
            }
            None => None,
        };

        let tu = parse_record(&raw, alignment.as_deref(), self.line_no);
        Ok(Some(CorpusRecord {
            line_no: self.line_no,
            raw,
            tu,
        }))
    }
}

impl Iterator for CorpusReader {
    type Item = Result<CorpusRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn open_input(kind: &'static str, path: &Path) -> Result<BufReader<File>> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}

fn strip_line_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Builds a TU from one corpus line and its alignment line.
pub fn parse_record(
    raw: &[u8],
    alignment: Option<&[u8]>,
    line_no: usize,
) -> Result<TranslationUnit> {
    let record_error = |reason: String| PipelineError::RecordError {
        line: line_no,
        reason,
    };

    let line = std::str::from_utf8(raw)
        .map_err(|e| record_error(format!("corpus line is not valid UTF-8: {}", e)))?;
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(record_error(format!(
            "expected {} tab-separated fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let alignment = alignment
        .map(|bytes| {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| record_error(format!("alignment line is not valid UTF-8: {}", e)))?;
            parse_alignment(text).map_err(record_error)
        })
        .transpose()?;

    Ok(TranslationUnit::new(
        fields[1].trim(),
        fields[2].trim(),
        alignment,
    ))
}

/// Parses whitespace-separated `src-trg` index pairs.
pub fn parse_alignment(line: &str) -> std::result::Result<Vec<AlignmentPair>, String> {
    line.split_whitespace()
        .map(|token| {
            let (src, trg) = token
                .split_once('-')
                .ok_or_else(|| format!("alignment token '{}' is not of the form s-t", token))?;
            let src = src
                .parse::<usize>()
                .map_err(|e| format!("bad source index in '{}': {}", token, e))?;
            let trg = trg
                .parse::<usize>()
                .map_err(|e| format!("bad target index in '{}': {}", token, e))?;
            Ok((src, trg))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_records_and_strips_terminators() {
        let corpus = temp_file(b"1\tHello world\tBonjour le monde\r\n2\t  Yes \tOui\n");
        let records: Vec<CorpusRecord> = CorpusReader::open(corpus.path(), None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_no, 1);
        assert_eq!(records[0].raw, b"1\tHello world\tBonjour le monde".to_vec());
        let tu = records[0].tu.as_ref().unwrap();
        assert_eq!(tu.src_tokens, vec!["hello", "world"]);
        assert!(tu.alignment.is_none());

        let second = records[1].tu.as_ref().unwrap();
        assert_eq!(second.src_phrase, "Yes");
        assert_eq!(records[1].raw, b"2\t  Yes \tOui".to_vec());
    }

    #[test]
    fn test_last_line_without_newline() {
        let corpus = temp_file(b"1\ta\tb");
        let records: Vec<_> = CorpusReader::open(corpus.path(), None).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().raw, b"1\ta\tb".to_vec());
    }

    #[test]
    fn test_malformed_lines_are_records_with_errors() {
        let corpus = temp_file(b"only\ttwo\n1\ta\tb\tc\n1\t\xff\tb\n");
        let records: Vec<CorpusRecord> = CorpusReader::open(corpus.path(), None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(matches!(
                record.tu,
                Err(PipelineError::RecordError { .. })
            ));
        }
        assert_eq!(records[2].raw, b"1\t\xff\tb".to_vec());
    }

    #[test]
    fn test_alignment_read_in_lockstep() {
        let corpus = temp_file(b"1\ta b\tx y\n2\tc\tz\n");
        let alignment = temp_file(b"0-0 1-1\n\n");
        let records: Vec<CorpusRecord> =
            CorpusReader::open(corpus.path(), Some(alignment.path()))
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
        let first = records[0].tu.as_ref().unwrap();
        assert_eq!(first.alignment, Some(vec![(0, 0), (1, 1)]));
        let second = records[1].tu.as_ref().unwrap();
        assert_eq!(second.alignment, Some(vec![]));
    }

    #[test]
    fn test_bad_alignment_makes_record_undecodable() {
        let corpus = temp_file(b"1\ta\tx\n");
        let alignment = temp_file(b"0-x\n");
        let mut reader = CorpusReader::open(corpus.path(), Some(alignment.path())).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert!(record.tu.is_err());
    }

    #[test]
    fn test_short_alignment_file_is_terminal() {
        let corpus = temp_file(b"1\ta\tx\n2\tb\ty\n");
        let alignment = temp_file(b"0-0\n");
        let mut reader = CorpusReader::open(corpus.path(), Some(alignment.path())).unwrap();
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(PipelineError::AlignmentExhausted { line })) => assert_eq!(line, 2),
            other => panic!("expected AlignmentExhausted, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_files() {
        let missing = Path::new("/definitely/not/here.tsv");
        assert!(matches!(
            CorpusReader::open(missing, None),
            Err(PipelineError::MissingInput { kind: "Corpus", .. })
        ));
        let corpus = temp_file(b"1\ta\tb\n");
        assert!(matches!(
            CorpusReader::open(corpus.path(), Some(missing)),
            Err(PipelineError::MissingInput {
                kind: "Alignment",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_alignment() {
        assert_eq!(parse_alignment("  0-1   2-2 ").unwrap(), vec![(0, 1), (2, 2)]);
        assert!(parse_alignment("").unwrap().is_empty());
        assert!(parse_alignment("0:1").is_err());
        assert!(parse_alignment("-1-2").is_err());
    }
}
