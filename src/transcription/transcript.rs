use serde::{Deserialize, Serialize};

/// One named field returned by a transcription backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptField {
    pub key: String,
    pub value: String,
}

/// The ordered key/value fields a backend produced for one audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    fields: Vec<TranscriptField>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push(TranscriptField {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize every field as `key: value` in insertion order.
    ///
    /// Pairs are concatenated with no separator between them; consumers of
    /// the existing transcript files depend on this exact layout.
    pub fn render(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}: {}", f.key, f.value))
            .collect()
    }
}
