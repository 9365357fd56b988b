use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from the ffprobe/ffmpeg boundary.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("ffprobe failed for '{}': {}", .path.display(), .detail)]
    Probe { path: PathBuf, detail: String },

    #[error("no audio stream found in '{}'", .path.display())]
    NoAudioStream { path: PathBuf },

    #[error("no bitrate reported for '{}'", .path.display())]
    MissingBitrate { path: PathBuf },

    #[error("audio stream in '{}' reports zero duration", .path.display())]
    ZeroDuration { path: PathBuf },

    #[error("ffmpeg export failed for segment {} of '{}'", .index, .path.display())]
    Export { path: PathBuf, index: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Audio stream information read from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub bitrate: Option<u32>,
    pub sample_rate: u32,
    pub channels: u32,
    pub codec: String,
    pub file_size: u64,
}

/// One time slice of a larger audio file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start: Duration,
    pub duration: Duration,
}

/// Consecutive fixed-duration slices covering a whole audio stream.
///
/// Every segment but the last spans the full window; the last covers
/// whatever remains.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    segments: Vec<Segment>,
}

impl SegmentPlan {
    pub fn new(total: Duration, window: Duration) -> Self {
        let total_secs = total.as_secs_f64();
        let window_secs = window.as_secs_f64();
        let count = (total_secs / window_secs).ceil() as usize;

        let segments = (0..count)
            .map(|index| {
                let start = window_secs * index as f64;
                Segment {
                    index,
                    start: Duration::from_secs_f64(start),
                    duration: Duration::from_secs_f64((total_secs - start).min(window_secs)),
                }
            })
            .collect();

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Probes audio files and exports duration-bounded MP3 segments through
/// the ffmpeg command line tools.
#[derive(Debug, Clone, Default)]
pub struct AudioSegmenter;

impl AudioSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Read stream information with ffprobe.
    pub async fn probe(&self, path: &Path) -> Result<AudioInfo, AudioError> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "a:0",
            ])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(AudioError::Probe {
                path: path.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let format = &data["format"];
        let stream = data["streams"]
            .as_array()
            .and_then(|streams| streams.first())
            .ok_or_else(|| AudioError::NoAudioStream {
                path: path.to_path_buf(),
            })?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .or_else(|| stream["duration"].as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        // MP3 files usually report the bitrate on the container, not the stream
        let bitrate = stream["bit_rate"]
            .as_str()
            .or_else(|| format["bit_rate"].as_str())
            .and_then(|s| s.parse().ok());

        let file_size = tokio::fs::metadata(path).await?.len();

        let info = AudioInfo {
            path: path.to_path_buf(),
            duration: Duration::from_secs_f64(duration_seconds),
            bitrate,
            sample_rate: stream["sample_rate"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            channels: stream["channels"].as_u64().unwrap_or(0) as u32,
            codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
            file_size,
        };

        debug!(
            "Probed {}: {:.1}s, {} b/s, {}Hz",
            path.display(),
            info.duration.as_secs_f64(),
            info.bitrate.map(|b| b.to_string()).unwrap_or_else(|| "?".into()),
            info.sample_rate
        );

        Ok(info)
    }

    /// Export one segment as an independently decodable MP3 file.
    ///
    /// The slice is re-encoded at the given bitrate so every segment
    /// stands alone with the source file's quality.
    pub async fn export_segment(
        &self,
        source: &Path,
        segment: &Segment,
        bitrate: u32,
        dest: &Path,
    ) -> Result<(), AudioError> {
        let status = tokio::process::Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(source)
            .arg("-ss")
            .arg(format!("{:.3}", segment.start.as_secs_f64()))
            .arg("-t")
            .arg(format!("{:.3}", segment.duration.as_secs_f64()))
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(bitrate.to_string())
            .arg("-y")
            .arg(dest)
            .status()
            .await?;

        if !status.success() {
            return Err(AudioError::Export {
                path: source.to_path_buf(),
                index: segment.index,
            });
        }

        debug!("Exported segment {} to {}", segment.index, dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_splits_with_remainder() {
        let plan = SegmentPlan::new(Duration::from_secs(90), Duration::from_secs(60));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.segments()[0].start, Duration::from_secs(0));
        assert_eq!(plan.segments()[0].duration, Duration::from_secs(60));
        assert_eq!(plan.segments()[1].start, Duration::from_secs(60));
        assert_eq!(plan.segments()[1].duration, Duration::from_secs(30));
    }

    #[test]
    fn test_plan_exact_multiple() {
        let plan = SegmentPlan::new(Duration::from_secs(120), Duration::from_secs(60));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.segments()[1].duration, Duration::from_secs(60));
    }

    #[test]
    fn test_plan_shorter_than_window() {
        let plan = SegmentPlan::new(Duration::from_secs(10), Duration::from_secs(60));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.segments()[0].duration, Duration::from_secs(10));
    }

    #[test]
    fn test_plan_one_second_overflow() {
        let plan = SegmentPlan::new(Duration::from_secs(61), Duration::from_secs(60));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.segments()[1].start, Duration::from_secs(60));
        assert_eq!(plan.segments()[1].duration, Duration::from_secs(1));
    }

    #[test]
    fn test_plan_zero_duration_is_empty() {
        let plan = SegmentPlan::new(Duration::ZERO, Duration::from_secs(60));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_segment_indexes_are_ordered() {
        let plan = SegmentPlan::new(Duration::from_secs(250), Duration::from_secs(60));

        assert_eq!(plan.len(), 5);
        for (i, segment) in plan.segments().iter().enumerate() {
            assert_eq!(segment.index, i);
        }
    }
}
