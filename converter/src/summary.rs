use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CorruptedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub corrupted: Vec<CorruptedFile>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            corrupted: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, outcome: extraction::ConversionOutcome) {
        match outcome.result {
            Ok(_) => self.processed += 1,
            Err(e) => self.corrupted.push(CorruptedFile {
                path: outcome.input,
                reason: e.to_string(),
            }),
        };
    }

    pub fn corrupted_paths(&self) -> Vec<&Path> {
        self.corrupted.iter().map(|c| c.path.as_path()).collect()
    }

    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut file, self)?;
        file.flush()
    }
}

impl core::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed {} of {} files in {:.2?}",
            self.processed, self.total, self.elapsed
        )?;

        if !self.corrupted.is_empty() {
            write!(f, "\n\nCorrupted demo files:")?;
            for file in self.corrupted.iter() {
                write!(f, "\n{}", file.path.display())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn report_write_failure_is_returned() {
        let summary = BatchSummary::new(0);

        let err = summary.write_report(Path::new("/dev/full")).unwrap_err();
        // ENOSPC
        assert_eq!(Some(28), err.raw_os_error());
    }

    #[test]
    fn report_has_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut summary = BatchSummary::new(2);
        summary.processed = 1;
        summary.write_report(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(2, value["total"]);
        assert_eq!(1, value["processed"]);
    }
}
