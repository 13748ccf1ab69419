use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::conversion::{
        Conversion, ConversionService, ConversionStatus, ConversionSummary, UploadResponse,
    },
    error::{AppError, AppResult},
};

/// Upload size cap, enforced again here in case the body limit layer is
/// configured differently.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub struct ConversionController {
    service: Arc<ConversionService>,
    uploads_dir: PathBuf,
}

impl ConversionController {
    pub fn new(service: Arc<ConversionService>, uploads_dir: PathBuf) -> Self {
        Self {
            service,
            uploads_dir,
        }
    }

    /// POST /api/upload - Accept a PDF and start its conversion
    pub async fn upload(
        State(controller): State<Arc<ConversionController>>,
        mut multipart: Multipart,
    ) -> AppResult<(StatusCode, Json<UploadResponse>)> {
        let mut upload = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload body: {e}")))?
        {
            if field.name() == Some("pdf") {
                let original_filename = sanitize_filename(field.file_name());
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
                upload = Some((original_filename, content_type, data));
                break;
            }
        }

        let (original_filename, content_type, data) = upload.ok_or_else(|| {
            AppError::BadRequest(
                "No file uploaded. Please select a PDF file using the \"pdf\" field.".to_string(),
            )
        })?;

        if data.is_empty() {
            return Err(AppError::BadRequest(
                "No file uploaded. Please select a PDF file.".to_string(),
            ));
        }
        if !is_pdf(&original_filename, content_type.as_deref()) {
            return Err(AppError::BadRequest(
                "Only PDF files are allowed!".to_string(),
            ));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge(
                "File too large. Maximum size is 50MB.".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let stored_filename = format!("{id}-{original_filename}");
        let upload_path = controller.uploads_dir.join(&stored_filename);

        tokio::fs::write(&upload_path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;

        tracing::info!(
            job_id = %id,
            filename = %original_filename,
            size = data.len(),
            "File uploaded"
        );

        controller
            .service
            .enqueue(id, &stored_filename, &original_filename, upload_path)
            .await?;

        Ok((
            StatusCode::OK,
            Json(UploadResponse {
                id,
                filename: original_filename,
                status: ConversionStatus::Processing,
                message: "File uploaded successfully. Processing...".to_string(),
            }),
        ))
    }

    /// GET /api/status/:id - Poll one conversion job
    pub async fn status(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<Conversion>> {
        let conversion = controller.service.find(id).await?;
        Ok(Json(conversion))
    }

    /// GET /api/audio/:id - Download the finished narration
    pub async fn audio(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let path = controller.service.audio_artifact(id).await?;
        let audio = tokio::fs::read(&path)
            .await
            .map_err(|_| AppError::NotFound("Audio file not found on disk".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "audio/mpeg".parse().unwrap());
        if let Ok(disposition) = format!("inline; filename=\"{id}.mp3\"").parse() {
            headers.insert(header::CONTENT_DISPOSITION, disposition);
        }

        Ok((StatusCode::OK, headers, Body::from(audio)))
    }

    /// GET /api/conversions - Most recent conversions, newest first
    pub async fn list(
        State(controller): State<Arc<ConversionController>>,
    ) -> AppResult<Json<Vec<ConversionSummary>>> {
        let summaries = controller.service.list_recent().await?;
        Ok(Json(summaries))
    }
}

fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    content_type == Some("application/pdf") || filename.to_lowercase().ends_with(".pdf")
}

/// Keep only the final path component of the client-supplied filename.
fn sanitize_filename(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| {
            std::path::Path::new(name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string())
}
