use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a conversion job.
///
/// `Processing` and `Converting` are both pre-terminal: `Processing` means
/// the upload was accepted and text extraction has not finished yet,
/// `Converting` means extraction succeeded and audio synthesis is underway.
/// `Completed` and `Failed` are terminal; a job never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConversionStatus {
    Processing,
    Converting,
    Completed,
    Failed,
}

impl ConversionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Processing => "processing",
            Self::Converting => "converting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One document-to-audio conversion job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversion {
    pub id: Uuid,
    /// Name of the stored upload on disk (`{id}-{original_filename}`).
    pub filename: String,
    /// Filename as uploaded, for display and download naming.
    pub original_filename: String,
    pub status: ConversionStatus,
    pub created_at: DateTime<Utc>,
    /// Final audio artifact filename, set only on completion.
    pub audio_file: Option<String>,
    /// Character count of the extracted text, set once extraction succeeds.
    pub text_length: Option<i64>,
}

/// One bounded-length slice of extracted text destined for speech synthesis.
/// `index` defines the final audio ordering and must be preserved downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub index: usize,
    pub content: String,
}
