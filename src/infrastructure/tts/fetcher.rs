use super::SynthesisReference;
use crate::domain::conversion::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolves a synthesis reference to a local audio file.
///
/// Implementations must guarantee that a successful fetch leaves a complete
/// file at the destination and a failed fetch leaves nothing at all.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Retrieve the referenced audio resource into `dest`.
    ///
    /// # Errors
    /// Returns `PipelineError::FetchFailed` if the resource is unreachable,
    /// answers with a non-success status, or the transfer is interrupted.
    async fn fetch(
        &self,
        reference: &SynthesisReference,
        dest: &Path,
    ) -> Result<(), PipelineError>;
}

/// HTTP fetcher. Downloads into a `.part` sibling and renames it into place,
/// so callers never observe a partially written destination.
pub struct HttpAudioFetcher {
    client: reqwest::Client,
}

impl HttpAudioFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, part: &Path) -> Result<(), PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::FetchFailed(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| PipelineError::FetchFailed(format!("non-success status: {e}")))?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| PipelineError::FetchFailed(format!("transfer interrupted: {e}")))?;

        tokio::fs::write(part, &audio)
            .await
            .map_err(|e| PipelineError::FetchFailed(format!("failed to write audio: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl AudioFetcher for HttpAudioFetcher {
    async fn fetch(
        &self,
        reference: &SynthesisReference,
        dest: &Path,
    ) -> Result<(), PipelineError> {
        let part = part_path(dest);

        if let Err(err) = self.download(&reference.url, &part).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&part, dest).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(PipelineError::FetchFailed(format!(
                "failed to finalize audio file: {err}"
            )));
        }

        tracing::debug!(
            unit = reference.unit_index,
            dest = %dest.display(),
            "Audio segment fetched"
        );

        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
