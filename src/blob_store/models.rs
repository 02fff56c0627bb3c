/// Blob storage data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a stored blob (its generated file name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub name: String,
}

impl BlobRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A blob as seen by a backend listing
#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub name: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// A file received in a multipart upload, not yet stored
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name as sent by the client
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: None,
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
