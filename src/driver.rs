use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::report::{FileFailure, TranscriptionReport};
use crate::sniff::MediaScanner;
use crate::transcription::TranscriptionBackend;

/// Stage two: transcribe every audio file in the working directory.
///
/// The backend handle is acquired by the caller once per traversal and
/// reused for every file. One transcript is written per audio file,
/// named `<filename>.txt`, overwriting any previous transcript.
pub struct TranscriptionDriver {
    scanner: MediaScanner,
}

impl TranscriptionDriver {
    pub fn new() -> Self {
        Self {
            scanner: MediaScanner::new(),
        }
    }

    pub async fn transcribe_directory(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        backend: &dyn TranscriptionBackend,
    ) -> Result<TranscriptionReport> {
        tokio::fs::create_dir_all(output_dir).await?;

        let scan = self.scanner.scan(working_dir)?;
        let mut report = TranscriptionReport {
            failures: scan.failures,
            ..Default::default()
        };

        for entry in scan.entries {
            if !entry.is_audio() {
                debug!(
                    "Not an audio file, skipping: {} ({})",
                    entry.path.display(),
                    entry.mime
                );
                report.skipped += 1;
                continue;
            }

            let file_name = match entry.path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };

            info!("Processing file: {}", entry.path.display());

            let transcript = match backend.transcribe(&entry.path).await {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!("Transcription failed for {}: {:#}", entry.path.display(), e);
                    report.failures.push(FileFailure::new(
                        &entry.path,
                        format!("transcription failed: {e:#}"),
                    ));
                    continue;
                }
            };

            let dest = output_dir.join(format!("{}.txt", file_name));
            match tokio::fs::write(&dest, transcript.render()).await {
                Ok(()) => {
                    debug!("Transcript written: {}", dest.display());
                    report.transcribed += 1;
                }
                Err(e) => {
                    report.failures.push(FileFailure::new(
                        &entry.path,
                        format!("writing transcript failed: {e}"),
                    ));
                }
            }
        }

        Ok(report)
    }
}

impl Default for TranscriptionDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::Transcript;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    struct ScriptedBackend;

    #[async_trait]
    impl TranscriptionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn transcribe(&self, _audio_path: &Path) -> Result<Transcript> {
            let mut transcript = Transcript::new();
            transcript.push("text", "hello world");
            transcript.push("segments", "[]");
            transcript.push("language", "en");
            Ok(transcript)
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl TranscriptionBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
            if audio_path.file_name().unwrap() == "bad.mp3" {
                return Err(anyhow!("model exploded"));
            }
            let mut transcript = Transcript::new();
            transcript.push("text", "ok");
            Ok(transcript)
        }
    }

    fn mp3_bytes() -> Vec<u8> {
        let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        bytes.extend(std::iter::repeat(0xAAu8).take(256));
        bytes
    }

    #[tokio::test]
    async fn test_one_transcript_per_audio_file() {
        let working = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(working.path().join("a.mp3"), mp3_bytes()).unwrap();
        fs::write(working.path().join("b.mp3"), mp3_bytes()).unwrap();
        fs::write(working.path().join("readme.txt"), "not audio\n").unwrap();

        let report = TranscriptionDriver::new()
            .transcribe_directory(working.path(), output.path(), &ScriptedBackend)
            .await
            .unwrap();

        assert_eq!(report.transcribed, 2);
        assert_eq!(report.skipped, 1);
        assert!(report.failures.is_empty());

        let rendered = fs::read_to_string(output.path().join("a.mp3.txt")).unwrap();
        assert_eq!(rendered, "text: hello worldsegments: []language: en");
        assert!(output.path().join("b.mp3.txt").exists());
        assert!(!output.path().join("readme.txt.txt").exists());
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_stop_the_batch() {
        let working = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(working.path().join("bad.mp3"), mp3_bytes()).unwrap();
        fs::write(working.path().join("good.mp3"), mp3_bytes()).unwrap();

        let report = TranscriptionDriver::new()
            .transcribe_directory(working.path(), output.path(), &FailingBackend)
            .await
            .unwrap();

        assert_eq!(report.transcribed, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("model exploded"));
        assert!(output.path().join("good.mp3.txt").exists());
        assert!(!output.path().join("bad.mp3.txt").exists());
    }

    #[tokio::test]
    async fn test_existing_transcript_is_overwritten() {
        let working = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(working.path().join("a.mp3"), mp3_bytes()).unwrap();
        fs::write(output.path().join("a.mp3.txt"), "stale contents").unwrap();

        TranscriptionDriver::new()
            .transcribe_directory(working.path(), output.path(), &ScriptedBackend)
            .await
            .unwrap();

        let rendered = fs::read_to_string(output.path().join("a.mp3.txt")).unwrap();
        assert!(rendered.starts_with("text: hello world"));
    }

    #[tokio::test]
    async fn test_empty_working_directory() {
        let working = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let report = TranscriptionDriver::new()
            .transcribe_directory(working.path(), output.path(), &ScriptedBackend)
            .await
            .unwrap();

        assert_eq!(report.transcribed, 0);
        assert_eq!(report.skipped, 0);
        assert!(report.failures.is_empty());
    }
}
