pub mod error;
pub mod model;
pub mod segmenter;
pub mod service;

pub use error::PipelineError;
pub use model::{Conversion, ConversionStatus, TextUnit};
pub use service::ConversionService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Response for POST /api/upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub status: ConversionStatus,
    pub message: String,
}

/// One row of GET /api/conversions
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ConversionSummary {
    pub id: Uuid,
    pub original_filename: String,
    pub status: ConversionStatus,
    pub created_at: DateTime<Utc>,
    pub text_length: Option<i64>,
}
