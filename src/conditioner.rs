use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audio::{AudioError, AudioSegmenter, SegmentPlan};
use crate::config::ConditioningConfig;
use crate::report::{ConditioningReport, FileFailure};
use crate::sniff::MediaScanner;

/// Stage one: normalize input recordings into the working directory.
///
/// Audio files within the size threshold are copied verbatim; oversized
/// ones are split into duration-bounded MP3 segments at their original
/// bitrate. Files whose content is not audio are skipped without error.
pub struct FileConditioner {
    config: ConditioningConfig,
    scanner: MediaScanner,
    segmenter: AudioSegmenter,
}

impl FileConditioner {
    pub fn new(config: ConditioningConfig) -> Self {
        Self {
            config,
            scanner: MediaScanner::new(),
            segmenter: AudioSegmenter::new(),
        }
    }

    /// Walk the input tree and produce size-normalized files in the
    /// working directory. The input tree is never modified.
    pub async fn condition_directory(
        &self,
        input_dir: &Path,
        working_dir: &Path,
    ) -> Result<ConditioningReport> {
        tokio::fs::create_dir_all(working_dir).await?;

        let scan = self.scanner.scan(input_dir)?;
        let mut report = ConditioningReport {
            failures: scan.failures,
            ..Default::default()
        };

        for entry in scan.entries {
            report.scanned += 1;

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

            if entry.size <= self.config.max_file_size {
                info!("Copying {} ({} bytes)", entry.path.display(), entry.size);
                let dest = working_dir.join(&file_name);
                match tokio::fs::copy(&entry.path, &dest).await {
                    Ok(_) => report.copied += 1,
                    Err(e) => {
                        warn!("Copy failed for {}: {}", entry.path.display(), e);
                        report
                            .failures
                            .push(FileFailure::new(&entry.path, format!("copy failed: {e}")));
                    }
                }
            } else {
                info!(
                    "Splitting {} ({} bytes exceeds the {} byte limit)",
                    entry.path.display(),
                    entry.size,
                    self.config.max_file_size
                );
                match self.split_file(&entry.path, &file_name, working_dir).await {
                    Ok(segments) => {
                        report.split += 1;
                        report.segments_written += segments;
                    }
                    Err(e) => {
                        warn!("Split failed for {}: {}", entry.path.display(), e);
                        report
                            .failures
                            .push(FileFailure::new(&entry.path, e.to_string()));
                    }
                }
            }
        }

        Ok(report)
    }

    /// Split one oversized file into segments, returning how many were
    /// written.
    async fn split_file(
        &self,
        source: &Path,
        file_name: &str,
        working_dir: &Path,
    ) -> Result<usize, AudioError> {
        let audio_info = self.segmenter.probe(source).await?;

        if audio_info.duration.is_zero() {
            return Err(AudioError::ZeroDuration {
                path: source.to_path_buf(),
            });
        }

        let bitrate = audio_info.bitrate.ok_or_else(|| AudioError::MissingBitrate {
            path: source.to_path_buf(),
        })?;

        let plan = SegmentPlan::new(
            audio_info.duration,
            Duration::from_secs(self.config.max_segment_duration),
        );

        debug!(
            "Split plan for {}: {} segments at {} b/s",
            source.display(),
            plan.len(),
            bitrate
        );

        for segment in plan.segments() {
            let dest = working_dir.join(segment_file_name(file_name, segment.index));
            self.segmenter
                .export_segment(source, segment, bitrate, &dest)
                .await?;
        }

        Ok(plan.len())
    }
}

/// Name for one exported segment, keyed by the source file name and the
/// zero-based segment index: `recording.mp3` becomes
/// `recording.mp3_0000.mp3`, `recording.mp3_0001.mp3`, ...
fn segment_file_name(source_name: &str, index: usize) -> String {
    format!("{}_{:0>4}.mp3", source_name, index)
}
