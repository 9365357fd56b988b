use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{Transcript, TranscriptionBackend};
use crate::config::TranscriptionConfig;

/// Whisper command line backends, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhisperFlavor {
    /// whisper.cpp via Homebrew
    WhisperCli,
    /// whisper.cpp
    WhisperCpp,
    /// Python OpenAI Whisper
    PythonWhisper,
}

impl WhisperFlavor {
    const DETECTION_ORDER: [WhisperFlavor; 3] = [
        WhisperFlavor::WhisperCli,
        WhisperFlavor::WhisperCpp,
        WhisperFlavor::PythonWhisper,
    ];

    fn command(self) -> &'static str {
        match self {
            WhisperFlavor::WhisperCli => "whisper-cli",
            WhisperFlavor::WhisperCpp => "whisper-cpp",
            WhisperFlavor::PythonWhisper => "whisper",
        }
    }

    fn is_cpp(self) -> bool {
        !matches!(self, WhisperFlavor::PythonWhisper)
    }
}

/// Transcription through a locally installed Whisper command line tool.
///
/// Loading resolves the backend command and model file once; the handle is
/// then reused for every file in a traversal.
pub struct WhisperBackend {
    config: TranscriptionConfig,
    flavor: WhisperFlavor,
    model_path: Option<PathBuf>,
}

impl WhisperBackend {
    /// Detect an available Whisper backend and resolve the model to use.
    pub async fn load(config: &TranscriptionConfig) -> Result<Self> {
        for flavor in WhisperFlavor::DETECTION_ORDER {
            debug!("Checking for {} command", flavor.command());
            if !check_command_available(flavor.command()).await {
                continue;
            }

            let model_path = if flavor.is_cpp() {
                let resolved = resolve_model_path(config);
                match &resolved {
                    Some(path) => info!("Using model file: {}", path.display()),
                    None => warn!(
                        "No model file found for '{}', relying on the backend default",
                        config.model
                    ),
                }
                resolved
            } else {
                None
            };

            info!("Using {} backend for transcription", flavor.command());
            return Ok(Self {
                config: config.clone(),
                flavor,
                model_path,
            });
        }

        Err(anyhow!(
            "No Whisper backend found. Please install whisper.cpp or openai-whisper"
        ))
    }

    async fn run_whisper_cpp(&self, audio_path: &Path, output_dir: &Path) -> Result<()> {
        let base_name = audio_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let output_file = output_dir.join(&base_name);

        let mut cmd = Command::new(self.flavor.command());
        cmd.arg("-f")
            .arg(audio_path)
            .arg("-oj")
            .arg("-of")
            .arg(&output_file);

        if let Some(model_path) = &self.model_path {
            cmd.arg("-m").arg(model_path);
        }

        if let Some(language) = &self.config.language {
            cmd.arg("-l").arg(language);
        }

        self.run_with_timeout(cmd).await
    }

    async fn run_python_whisper(&self, audio_path: &Path, output_dir: &Path) -> Result<()> {
        let mut cmd = Command::new(self.flavor.command());
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False");

        if let Some(language) = &self.config.language {
            cmd.arg("--language").arg(language);
        }

        self.run_with_timeout(cmd).await
    }

    async fn run_with_timeout(&self, mut cmd: Command) -> Result<()> {
        cmd.kill_on_drop(true);
        debug!("Executing command: {:?}", cmd);

        let timeout = Duration::from_secs(self.config.timeout);
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {} seconds",
                    self.flavor.command(),
                    self.config.timeout
                )
            })?
            .with_context(|| format!("failed to run {}", self.flavor.command()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed with exit code {}: {}",
                self.flavor.command(),
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperBackend {
    fn name(&self) -> &str {
        self.flavor.command()
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let output_dir = tempfile::tempdir().context("failed to create temp output dir")?;

        if self.flavor.is_cpp() {
            self.run_whisper_cpp(audio_path, output_dir.path()).await?;
        } else {
            self.run_python_whisper(audio_path, output_dir.path()).await?;
        }

        let json_path = find_json_output(output_dir.path()).await?;
        let content = tokio::fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("failed to read {}", json_path.display()))?;

        parse_whisper_json(&content)
            .with_context(|| format!("unparsable whisper output for {}", audio_path.display()))
    }
}

/// Check if a command is available
async fn check_command_available(cmd_name: &str) -> bool {
    Command::new(cmd_name)
        .arg("--help")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Locate a whisper.cpp model file for the configured model name.
fn resolve_model_path(config: &TranscriptionConfig) -> Option<PathBuf> {
    if let Some(path) = &config.model_path {
        return Some(path.clone());
    }

    let candidates = [
        format!("models/ggml-{}.bin", config.model),
        format!("/usr/local/share/whisper-cpp/ggml-{}.bin", config.model),
        format!("/opt/homebrew/share/whisper-cpp/ggml-{}.bin", config.model),
    ];

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

async fn find_json_output(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            return Ok(path);
        }
    }

    Err(anyhow!("no JSON output found in {}", dir.display()))
}

/// A segment normalized out of whatever JSON shape the backend produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Parse Whisper JSON into transcript fields.
///
/// Both the whisper.cpp shape (a `transcription` array with
/// `HH:MM:SS,mmm` timestamps) and the Python shape (`text`, `segments`,
/// `language`) are handled. Fields come out in the order the collaborator
/// reports them: text, segments, language.
fn parse_whisper_json(content: &str) -> Result<Transcript> {
    let output: WhisperOutput = serde_json::from_str(content)?;

    let (segments, full_text, language) = if !output.transcription.is_empty() {
        let segments: Vec<TranscribedSegment> = output
            .transcription
            .into_iter()
            .enumerate()
            .map(|(i, seg)| {
                Ok(TranscribedSegment {
                    id: i as u32,
                    start: parse_timestamp(&seg.timestamps.from)?,
                    end: parse_timestamp(&seg.timestamps.to)?,
                    text: seg.text.trim().to_string(),
                })
            })
            .collect::<Result<_>>()?;

        let full_text = segments
            .iter()
            .map(|seg| seg.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let language = output
            .result
            .map(|r| r.language)
            .or(output.language)
            .unwrap_or_else(|| "en".to_string());

        (segments, full_text, language)
    } else {
        let segments: Vec<TranscribedSegment> = output
            .segments
            .into_iter()
            .map(|seg| TranscribedSegment {
                id: seg.id,
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect();

        let full_text = output.text.unwrap_or_else(|| {
            segments
                .iter()
                .map(|seg| seg.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });

        let language = output.language.unwrap_or_else(|| "en".to_string());

        (segments, full_text, language)
    };

    let mut transcript = Transcript::new();
    transcript.push("text", full_text.trim());
    transcript.push("segments", serde_json::to_string(&segments)?);
    transcript.push("language", language);

    Ok(transcript)
}

/// Parse a timestamp in "HH:MM:SS,mmm" format to seconds.
fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let (time_part, millis_part) = timestamp
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid timestamp format: {}", timestamp))?;

    let milliseconds: f64 = millis_part.parse::<f64>()? / 1000.0;

    let components: Vec<&str> = time_part.split(':').collect();
    if components.len() != 3 {
        return Err(anyhow!("invalid time format: {}", time_part));
    }

    let hours: f64 = components[0].parse()?;
    let minutes: f64 = components[1].parse()?;
    let seconds: f64 = components[2].parse()?;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds + milliseconds)
}

/// Whisper JSON output, covering both backend shapes.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperCppSegment>,
    #[serde(default)]
    result: Option<WhisperResultBlock>,
}

#[derive(Debug, Deserialize)]
struct WhisperResultBlock {
    language: String,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    id: u32,
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperCppSegment {
    timestamps: WhisperTimestamps,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperTimestamps {
    from: String,
    to: String,
}
