//! Batch audio recording transcription.
//!
//! Conditions a directory tree of recordings into size-normalized MP3
//! files in a working directory, then transcribes each one through a
//! Whisper backend, writing one text transcript per audio file.

pub mod audio;
pub mod conditioner;
pub mod config;
pub mod driver;
pub mod pipeline;
pub mod report;
pub mod sniff;
pub mod transcription;

// Re-export main types for easy access
pub use crate::audio::{AudioInfo, AudioSegmenter, Segment, SegmentPlan};
pub use crate::conditioner::FileConditioner;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::driver::TranscriptionDriver;
pub use crate::pipeline::BatchPipeline;
pub use crate::report::{ConditioningReport, FileFailure, RunReport, TranscriptionReport};
pub use crate::sniff::{MediaEntry, MediaScanner};
pub use crate::transcription::{Transcript, TranscriptionBackend, WhisperBackend};
