use crate::error::AppError;

/// Failures inside one conversion run. Any of these is terminal for the job:
/// the orchestrator logs the cause and persists only the `failed` status.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("text is empty after normalization")]
    EmptyInput,

    #[error("document contains no text content")]
    NoTextContent,

    #[error("failed to extract text from document: {0}")]
    Extraction(String),

    #[error("speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("audio fetch failed: {0}")]
    FetchFailed(String),

    #[error("audio assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("conversion task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyInput | PipelineError::NoTextContent => {
                AppError::BadRequest(err.to_string())
            }
            PipelineError::SynthesisUnavailable(_) | PipelineError::FetchFailed(_) => {
                AppError::ExternalService(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}
