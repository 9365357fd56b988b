use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single file that could not be processed, with the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Results of the file conditioning stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditioningReport {
    /// Regular files seen during the walk
    pub scanned: usize,
    /// Audio files copied verbatim into the working directory
    pub copied: usize,
    /// Audio files split into segments
    pub split: usize,
    /// Total segment files written
    pub segments_written: usize,
    /// Files skipped because their content is not audio
    pub skipped: usize,
    /// Files that failed probing or export
    pub failures: Vec<FileFailure>,
}

/// Results of the transcription stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionReport {
    /// Transcripts written to the output directory
    pub transcribed: usize,
    /// Working files skipped because their content is not audio
    pub skipped: usize,
    /// Files that failed transcription or transcript writing
    pub failures: Vec<FileFailure>,
}

/// Combined results of a full conditioning plus transcription run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub total_time: Duration,
    pub conditioning: ConditioningReport,
    pub transcription: TranscriptionReport,
}

impl RunReport {
    /// All per-file failures across both stages, in stage order.
    pub fn failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.conditioning
            .failures
            .iter()
            .chain(self.transcription.failures.iter())
    }

    pub fn failure_count(&self) -> usize {
        self.conditioning.failures.len() + self.transcription.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> RunReport {
        RunReport {
            started_at: Utc::now(),
            total_time: Duration::from_secs(1),
            conditioning: ConditioningReport::default(),
            transcription: TranscriptionReport::default(),
        }
    }

    #[test]
    fn test_clean_report() {
        let report = empty_report();
        assert!(report.is_clean());
        assert_eq!(report.failure_count(), 0);
    }

    #[test]
    fn test_failures_span_both_stages() {
        let mut report = empty_report();
        report
            .conditioning
            .failures
            .push(FileFailure::new("a.mp3", "probe failed"));
        report
            .transcription
            .failures
            .push(FileFailure::new("b.mp3", "transcription failed"));

        assert!(!report.is_clean());
        assert_eq!(report.failure_count(), 2);

        let reasons: Vec<&str> = report.failures().map(|f| f.reason.as_str()).collect();
        assert_eq!(reasons, vec!["probe failed", "transcription failed"]);
    }
}
