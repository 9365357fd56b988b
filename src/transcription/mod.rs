pub mod transcript;
pub mod whisper;

pub use transcript::{Transcript, TranscriptField};
pub use whisper::WhisperBackend;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// A speech-to-text engine that turns one audio file into transcript fields.
///
/// Acquiring an implementation is the expensive part (model resolution,
/// backend detection); a handle is expected to live for a whole directory
/// traversal and be reused across files.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Short backend identifier for logging.
    fn name(&self) -> &str;

    /// Transcribe a single audio file.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}
