//! File registry domain models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Accepted office document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pptx,
    Docx,
    Xlsx,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Pptx, FileType::Docx, FileType::Xlsx];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pptx => "pptx",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
        }
    }

    /// MIME type used when writing the object.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Derive the type from a file name's last extension (case-insensitive).
    ///
    /// Returns `None` for names without a dot or with a disallowed extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.to_ascii_lowercase().parse().ok()
    }

    /// Comma-separated list of allowed extensions, for error messages.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(FileType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pptx" => Ok(FileType::Pptx),
            "docx" => Ok(FileType::Docx),
            "xlsx" => Ok(FileType::Xlsx),
            other => Err(format!("unsupported file type '{other}'")),
        }
    }
}

/// Persisted file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    /// Name as supplied by the uploader.
    pub file_name: String,
    /// Durable storage reference.
    pub file_path: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub owner_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for registering a newly stored file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_name: String,
    pub file_path: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub owner_id: i64,
}
