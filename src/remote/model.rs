use serde::{Deserialize, Serialize};

/// Metadata the backend attaches to every file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileMetadata {
    /// Non-empty on every usable record; only checked, never verified.
    pub checksum: String,
    /// Creation timestamp as sent by the backend (RFC 3339 in practice).
    pub created_at: String,
    /// Size in bytes.
    pub size: u64,
}

/// One remote file as returned by `POST /api/file`.
///
/// `path` and `checksum` default to empty strings so that a record with a
/// missing field still decodes and is rejected by [`validate_file`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    /// Slash-delimited path, unique within a collection.
    pub path: String,
    pub metadata: FileMetadata,
}

#[cfg(test)]
impl FileRecord {
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata: FileMetadata {
                checksum: checksum.into(),
                ..Default::default()
            },
        }
    }
}

/// A record is usable iff both its checksum and its path are non-empty.
pub fn validate_file(record: &FileRecord) -> bool {
    !record.metadata.checksum.is_empty() && !record.path.is_empty()
}
