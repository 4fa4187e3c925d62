// src/pipeline/writers/output_router.rs

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::data_model::{Verdict, SKIPPED_LOG_CODE};
use crate::error::Result;

/// Identifies one output file of a decision scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputKey {
    Verdict { verdict: String, policy: String },
    Skipped,
    DecisionLog,
}

impl OutputKey {
    pub fn for_verdict(verdict: &Verdict, policy: &str) -> Self {
        OutputKey::Verdict {
            verdict: verdict.label().to_string(),
            policy: policy.to_string(),
        }
    }

    /// File name inside the output folder, suffixed with the corpus name.
    pub fn file_name(&self, input_file_name: &str) -> String {
        match self {
            OutputKey::Verdict { verdict, policy } => {
                format!("{}_{}__{}", verdict, policy, input_file_name)
            }
            OutputKey::Skipped => format!("skipped__{}", input_file_name),
            OutputKey::DecisionLog => format!("decision_log__{}", input_file_name),
        }
    }
}

/// Owns every file handle written during one decision scan.
///
/// Files are truncated when opened, so a fresh router per scan rewrites the
/// outputs from scratch. `close` flushes and closes each file once; anything
/// still open when the router is dropped is flushed then.
pub struct OutputRouter {
    output_dir: PathBuf,
    input_file_name: String,
    writers: HashMap<OutputKey, BufWriter<File>>,
}

impl OutputRouter {
    /// Creates the output folder if needed and opens the skipped and
    /// decision-log files up front; verdict files open on first use.
    pub fn create(output_dir: &Path, input_file_name: &str) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        let mut router = OutputRouter {
            output_dir: output_dir.to_path_buf(),
            input_file_name: input_file_name.to_string(),
            writers: HashMap::new(),
        };
        router.writer(OutputKey::Skipped)?;
        router.writer(OutputKey::DecisionLog)?;
        Ok(router)
    }

    fn writer(&mut self, key: OutputKey) -> Result<&mut BufWriter<File>> {
        match self.writers.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self
                    .output_dir
                    .join(entry.key().file_name(&self.input_file_name));
                debug!(path = %path.display(), "Opening output file");
                let file = File::create(&path)?;
                Ok(entry.insert(BufWriter::new(file)))
            }
        }
    }

    /// Appends `raw_line` to the file of `(verdict, policy)`.
    pub fn write(&mut self, verdict: &Verdict, policy: &str, raw_line: &[u8]) -> Result<()> {
        let writer = self.writer(OutputKey::for_verdict(verdict, policy))?;
        writer.write_all(raw_line)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_skipped(&mut self, raw_line: &[u8]) -> Result<()> {
        let writer = self.writer(OutputKey::Skipped)?;
        writer.write_all(raw_line)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes one decision-log line: `code\tverdict\t` per policy.
    pub fn log_decision(&mut self, verdicts: &[Verdict]) -> Result<()> {
        let mut line = String::new();
        for verdict in verdicts {
            line.push_str(&format!("{}\t{}\t", verdict.log_code(), verdict.label()));
        }
        line.push('\n');
        self.writer(OutputKey::DecisionLog)?
            .write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn log_skipped(&mut self) -> Result<()> {
        let line = format!("{}\tskipped\n", SKIPPED_LOG_CODE);
        self.writer(OutputKey::DecisionLog)?
            .write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn open_files(&self) -> usize {
        self.writers.len()
    }

    /// Flushes and closes every open file. Returns the first flush error,
    /// after attempting all of them.
    pub fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for (key, mut writer) in self.writers.drain() {
            if let Err(e) = writer.flush() {
                warn!(file = ?key, error = %e, "Failed to flush output file");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for OutputRouter {
    fn drop(&mut self) {
        if !self.writers.is_empty() {
            debug!(open = self.writers.len(), "Closing output files left open");
            if let Err(e) = self.close() {
                warn!(error = %e, "Output files not fully flushed on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_names() {
        let key = OutputKey::for_verdict(&Verdict::Accept, "OneNoPolicy");
        assert_eq!(key.file_name("corpus.tsv"), "accept_OneNoPolicy__corpus.tsv");
        assert_eq!(
            OutputKey::Skipped.file_name("corpus.tsv"),
            "skipped__corpus.tsv"
        );
        assert_eq!(
            OutputKey::DecisionLog.file_name("corpus.tsv"),
            "decision_log__corpus.tsv"
        );
    }

    #[test]
    fn test_routes_lines_and_logs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let mut router = OutputRouter::create(&out, "c.tsv").unwrap();
        assert_eq!(router.open_files(), 2);

        router.write(&Verdict::Accept, "P", b"1\ta\tb").unwrap();
        router.write(&Verdict::Reject, "P", b"2\tc\td").unwrap();
        router.write(&Verdict::Accept, "P", b"3\te\tf").unwrap();
        router
            .log_decision(&[Verdict::Accept, Verdict::Other("neutral".into())])
            .unwrap();
        router.write_skipped(b"broken").unwrap();
        router.log_skipped().unwrap();
        assert_eq!(router.open_files(), 4);
        router.close().unwrap();
        assert_eq!(router.open_files(), 0);

        let read = |name: &str| fs::read_to_string(out.join(name)).unwrap();
        assert_eq!(read("accept_P__c.tsv"), "1\ta\tb\n3\te\tf\n");
        assert_eq!(read("reject_P__c.tsv"), "2\tc\td\n");
        assert_eq!(read("skipped__c.tsv"), "broken\n");
        assert_eq!(
            read("decision_log__c.tsv"),
            "2\taccept\t1\tneutral\t\n-1\tskipped\n"
        );
    }

    #[test]
    fn test_drop_flushes_and_reopen_truncates() {
        let dir = tempdir().unwrap();
        {
            let mut router = OutputRouter::create(dir.path(), "c.tsv").unwrap();
            router.write(&Verdict::Reject, "P", b"old").unwrap();
        }
        let path = dir.path().join("reject_P__c.tsv");
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");

        let mut router = OutputRouter::create(dir.path(), "c.tsv").unwrap();
        router.write(&Verdict::Reject, "P", b"new").unwrap();
        router.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }
}
