use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::conditioner::FileConditioner;
use crate::config::Config;
use crate::driver::TranscriptionDriver;
use crate::report::RunReport;
use crate::transcription::{TranscriptionBackend, WhisperBackend};

/// Runs both stages in order over the three directories.
///
/// Conditioning finishes completely before transcription starts, and
/// each stage handles its files one at a time. Data flows input
/// directory to working directory to output directory only.
pub struct BatchPipeline {
    config: Config,
}

impl BatchPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Condition and transcribe using an auto-detected Whisper backend.
    ///
    /// The backend is loaded only after conditioning has finished, right
    /// before the transcription traversal that uses it.
    pub async fn run(
        &self,
        input_dir: &Path,
        working_dir: &Path,
        output_dir: &Path,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let conditioning = self.condition(input_dir, working_dir).await?;

        let backend = WhisperBackend::load(&self.config.transcription).await?;
        let transcription = self.transcribe(&backend, working_dir, output_dir).await?;

        self.finish(RunReport {
            started_at,
            total_time: start.elapsed(),
            conditioning,
            transcription,
        })
        .await
    }

    /// Same as [`run`](Self::run) with a caller-provided backend.
    pub async fn run_with_backend(
        &self,
        backend: &dyn TranscriptionBackend,
        input_dir: &Path,
        working_dir: &Path,
        output_dir: &Path,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let conditioning = self.condition(input_dir, working_dir).await?;
        let transcription = self.transcribe(backend, working_dir, output_dir).await?;

        self.finish(RunReport {
            started_at,
            total_time: start.elapsed(),
            conditioning,
            transcription,
        })
        .await
    }

    async fn condition(
        &self,
        input_dir: &Path,
        working_dir: &Path,
    ) -> Result<crate::report::ConditioningReport> {
        info!("Conditioning input files from {}", input_dir.display());
        let conditioner = FileConditioner::new(self.config.conditioning.clone());
        let report = conditioner.condition_directory(input_dir, working_dir).await?;
        info!(
            "Conditioning done: {} copied, {} split into {} segments, {} skipped",
            report.copied, report.split, report.segments_written, report.skipped
        );
        Ok(report)
    }

    async fn transcribe(
        &self,
        backend: &dyn TranscriptionBackend,
        working_dir: &Path,
        output_dir: &Path,
    ) -> Result<crate::report::TranscriptionReport> {
        info!(
            "Transcribing working files with the {} backend",
            backend.name()
        );
        let driver = TranscriptionDriver::new();
        let report = driver
            .transcribe_directory(working_dir, output_dir, backend)
            .await?;
        info!("Transcription done: {} transcripts written", report.transcribed);
        Ok(report)
    }

    async fn finish(&self, report: RunReport) -> Result<RunReport> {
        if let Some(path) = &self.config.output.report_file {
            let json = serde_json::to_string_pretty(&report)?;
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write run report to {}", path.display()))?;
            info!("Run report saved to: {}", path.display());
        }
        Ok(report)
    }
}
