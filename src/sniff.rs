use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::report::FileFailure;

/// MIME type of MP3 audio.
pub const MIME_MP3: &str = "audio/mpeg";
/// Fallback type for content with no recognizable signature. MP3 streams
/// without an ID3 tag or a leading frame sync land here, so it qualifies
/// as audio.
pub const MIME_BINARY: &str = "application/octet-stream";
/// Content that reads as plain text.
pub const MIME_TEXT: &str = "text/plain";
/// Zero-byte files.
pub const MIME_EMPTY: &str = "application/x-empty";

/// Bytes inspected per file when sniffing.
const SNIFF_LEN: usize = 8192;

/// True for MIME types this system treats as transcribable audio.
pub fn is_audio_mime(mime: &str) -> bool {
    mime == MIME_MP3 || mime == MIME_BINARY
}

/// A regular file found during a scan, with its content-sniffed MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub size: u64,
    pub mime: String,
}

impl MediaEntry {
    pub fn is_audio(&self) -> bool {
        is_audio_mime(&self.mime)
    }
}

/// All entries under a directory plus the files that could not be sniffed.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub entries: Vec<MediaEntry>,
    pub failures: Vec<FileFailure>,
}

/// Classifies files by content and enumerates audio candidates.
///
/// Classification inspects the leading bytes of each file rather than its
/// extension, so mislabeled or extensionless recordings are still found.
#[derive(Debug, Clone, Default)]
pub struct MediaScanner;

impl MediaScanner {
    pub fn new() -> Self {
        Self
    }

    /// Determine a file's MIME type from its content.
    ///
    /// Recognized magic bytes win. Content with no signature is classified
    /// as plain text when it looks like text, otherwise as a generic
    /// binary stream.
    pub fn classify(&self, path: &Path) -> io::Result<String> {
        let mut head = [0u8; SNIFF_LEN];
        let mut file = File::open(path)?;
        let mut read = 0;
        while read < SNIFF_LEN {
            let n = file.read(&mut head[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        let head = &head[..read];

        if head.is_empty() {
            return Ok(MIME_EMPTY.to_string());
        }

        if let Some(kind) = infer::get(head) {
            return Ok(kind.mime_type().to_string());
        }

        if looks_like_text(head) {
            Ok(MIME_TEXT.to_string())
        } else {
            Ok(MIME_BINARY.to_string())
        }
    }

    /// Walk a directory tree and classify every regular file.
    ///
    /// Walk-level errors (unreadable directories) abort the scan; a file
    /// that cannot be opened or read is recorded as a failure and the scan
    /// continues.
    pub fn scan(&self, root: &Path) -> anyhow::Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    outcome
                        .failures
                        .push(FileFailure::new(&path, format!("metadata failed: {e}")));
                    continue;
                }
            };

            match self.classify(&path) {
                Ok(mime) => {
                    debug!("Classified {} as {}", path.display(), mime);
                    outcome.entries.push(MediaEntry { path, size, mime });
                }
                Err(e) => {
                    outcome
                        .failures
                        .push(FileFailure::new(&path, format!("content sniffing failed: {e}")));
                }
            }
        }

        Ok(outcome)
    }
}

/// Heuristic for signatureless content: text has no NUL bytes and no
/// control characters besides ordinary whitespace.
fn looks_like_text(head: &[u8]) -> bool {
    head.iter()
        .all(|&b| !b.is_ascii_control() || matches!(b, b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// ID3v2 tag followed by filler, enough for the sniffer to commit.
    fn mp3_bytes() -> Vec<u8> {
        let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        bytes.extend(std::iter::repeat(0xAAu8).take(256));
        bytes
    }

    #[test]
    fn test_mp3_by_id3_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("speech.mp3");
        fs::write(&path, mp3_bytes()).unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, MIME_MP3);
        assert!(is_audio_mime(&mime));
    }

    #[test]
    fn test_mp3_by_frame_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw-recording");
        let mut bytes = vec![0xFFu8, 0xFB, 0x90, 0x64];
        bytes.extend(std::iter::repeat(0x55u8).take(128));
        fs::write(&path, bytes).unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, MIME_MP3);
    }

    #[test]
    fn test_plain_text_is_not_audio() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "meeting notes from tuesday\nfollow up later\n").unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, MIME_TEXT);
        assert!(!is_audio_mime(&mime));
    }

    #[test]
    fn test_unknown_binary_falls_back_to_octet_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mystery.bin");
        fs::write(&path, b"\x13\x37\x00headerless\x00payload").unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, MIME_BINARY);
        assert!(is_audio_mime(&mime));
    }

    #[test]
    fn test_recognized_non_audio_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cover.png");
        let mut bytes = vec![0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend(std::iter::repeat(0u8).take(64));
        fs::write(&path, bytes).unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, "image/png");
        assert!(!is_audio_mime(&mime));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let mime = MediaScanner::new().classify(&path).unwrap();
        assert_eq!(mime, MIME_EMPTY);
        assert!(!is_audio_mime(&mime));
    }

    #[test]
    fn test_scan_recurses_and_classifies() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp3"), mp3_bytes()).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b.mp3"), mp3_bytes()).unwrap();
        fs::write(dir.path().join("notes.txt"), "just text\n").unwrap();

        let outcome = MediaScanner::new().scan(dir.path()).unwrap();
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.entries.len(), 3);
        assert_eq!(outcome.entries.iter().filter(|e| e.is_audio()).count(), 2);
    }
}
