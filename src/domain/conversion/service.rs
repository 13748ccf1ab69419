use super::error::PipelineError;
use super::segmenter;
use super::{Conversion, ConversionSummary};
use crate::error::{AppError, AppResult};
use crate::infrastructure::extract::TextExtractor;
use crate::infrastructure::repositories::ConversionRepository;
use crate::infrastructure::tts::{assembler, AudioFetcher, SynthesisClient, VoiceConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

const LIST_LIMIT: i64 = 20;

/// Drives one conversion job through its lifecycle:
/// extract text, segment it, synthesize and fetch every segment
/// concurrently, assemble the audio, and persist each transition.
///
/// Each accepted upload gets one background run of this service; runs for
/// different jobs share nothing but the job store. Store writes during a run
/// are best effort: a failed write is logged and the run continues, so a job
/// can finish even if a transition was lost.
pub struct ConversionService {
    store: Arc<ConversionRepository>,
    extractor: Arc<dyn TextExtractor>,
    synthesis: Arc<dyn SynthesisClient>,
    fetcher: Arc<dyn AudioFetcher>,
    voice: VoiceConfig,
    audio_dir: PathBuf,
    temp_dir: PathBuf,
    max_unit_chars: usize,
}

impl ConversionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<ConversionRepository>,
        extractor: Arc<dyn TextExtractor>,
        synthesis: Arc<dyn SynthesisClient>,
        fetcher: Arc<dyn AudioFetcher>,
        voice: VoiceConfig,
        audio_dir: PathBuf,
        temp_dir: PathBuf,
        max_unit_chars: usize,
    ) -> Self {
        Self {
            store,
            extractor,
            synthesis,
            fetcher,
            voice,
            audio_dir,
            temp_dir,
            max_unit_chars,
        }
    }

    /// Record the accepted upload and kick off its background conversion.
    pub async fn enqueue(
        self: &Arc<Self>,
        id: Uuid,
        stored_filename: &str,
        original_filename: &str,
        upload_path: PathBuf,
    ) -> AppResult<()> {
        self.store
            .create(id, stored_filename, original_filename)
            .await?;

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run(id, upload_path).await;
        });

        Ok(())
    }

    /// One full conversion run. Always leaves the job in a terminal state
    /// and never leaves per-job intermediate files behind.
    async fn run(self: Arc<Self>, id: Uuid, upload_path: PathBuf) {
        tracing::info!(job_id = %id, "Conversion started");

        let outcome = self.convert(id, &upload_path).await;

        // The assembler removes its inputs itself; this sweep covers every
        // earlier exit path (extraction, synthesis, fetch, assembly failure).
        self.cleanup_intermediates(id).await;

        match outcome {
            Ok(artifact) => {
                self.persist(id, self.store.mark_completed(id, &artifact).await)
                    .await;
                tracing::info!(job_id = %id, artifact = %artifact, "Conversion completed");
            }
            Err(err) => {
                // Only the terminal state is persisted; the cause stays in
                // the logs and callers just see `failed`.
                tracing::error!(job_id = %id, error = %err, "Conversion failed");
                self.persist(id, self.store.mark_failed(id).await).await;
            }
        }
    }

    async fn convert(&self, id: Uuid, upload_path: &Path) -> Result<String, PipelineError> {
        let document = tokio::fs::read(upload_path)
            .await
            .map_err(|e| PipelineError::Extraction(format!("failed to read upload: {e}")))?;

        let text = self.extractor.extract(document).await?;
        if text.trim().is_empty() {
            return Err(PipelineError::NoTextContent);
        }
        let text_length = text.chars().count() as i64;

        self.persist(id, self.store.mark_converting(id, text_length).await)
            .await;

        let units = segmenter::segment(&text, self.max_unit_chars)?;
        let unit_count = units.len();
        tracing::info!(
            job_id = %id,
            text_length,
            unit_count,
            "Text extracted and segmented"
        );

        // Synthesize and fetch every unit concurrently. Completion order is
        // irrelevant; each task carries its unit's ordinal index and writes
        // to a destination keyed by it.
        let mut tasks = JoinSet::new();
        for unit in units {
            let synthesis = Arc::clone(&self.synthesis);
            let fetcher = Arc::clone(&self.fetcher);
            let voice = self.voice.clone();
            let dest = self.segment_path(id, unit.index);
            tasks.spawn(async move {
                let index = unit.index;
                let result = match synthesis.reference(&unit, &voice).await {
                    Ok(reference) => fetcher.fetch(&reference, &dest).await,
                    Err(err) => Err(err),
                };
                (index, dest, result)
            });
        }

        // Assembly barrier: let every outstanding task finish before acting
        // on the first failure, so cleanup sees a quiescent temp directory.
        let mut segments: Vec<Option<PathBuf>> = vec![None; unit_count];
        let mut first_error: Option<PipelineError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, dest, Ok(()))) => segments[index] = Some(dest),
                Ok((index, _, Err(err))) => {
                    tracing::warn!(job_id = %id, unit = index, error = %err, "Segment failed");
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    first_error.get_or_insert(PipelineError::TaskFailed(err.to_string()));
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let ordered: Vec<PathBuf> = segments.into_iter().flatten().collect();
        if ordered.len() != unit_count {
            return Err(PipelineError::TaskFailed(
                "one or more audio segments went missing".to_string(),
            ));
        }

        let artifact_name = format!("{id}.mp3");
        let output = self.audio_dir.join(&artifact_name);
        let list_path = self.temp_dir.join(format!("{id}_concat_list.txt"));
        assembler::assemble(&ordered, &list_path, &output).await?;

        Ok(artifact_name)
    }

    /// Current record for a job, for status polling.
    pub async fn find(&self, id: Uuid) -> AppResult<Conversion> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversion not found".to_string()))
    }

    /// Path of the final artifact, only once the job completed and the file
    /// is still on disk.
    pub async fn audio_artifact(&self, id: Uuid) -> AppResult<PathBuf> {
        let audio_file = self
            .store
            .find_completed_audio(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Audio file not found".to_string()))?;

        let path = self.audio_dir.join(&audio_file);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            _ => Err(AppError::NotFound(
                "Audio file not found on disk".to_string(),
            )),
        }
    }

    /// Most recent job summaries, newest first.
    pub async fn list_recent(&self) -> AppResult<Vec<ConversionSummary>> {
        self.store.list_recent(LIST_LIMIT).await
    }

    fn segment_path(&self, id: Uuid, index: usize) -> PathBuf {
        self.temp_dir.join(format!("{id}_chunk_{index}.mp3"))
    }

    /// Best-effort store write; failures are logged and the run continues.
    async fn persist(&self, id: Uuid, result: AppResult<()>) {
        if let Err(err) = result {
            tracing::error!(job_id = %id, error = %err, "Job store write failed, continuing");
        }
    }

    /// Remove every temp file belonging to this job (segment files and the
    /// concat scratch list).
    async fn cleanup_intermediates(&self, id: Uuid) {
        let prefix = format!("{id}_");
        let mut entries = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(job_id = %id, error = %err, "Failed to scan temp directory");
                return;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                    tracing::warn!(
                        job_id = %id,
                        file = %entry.path().display(),
                        error = %err,
                        "Failed to remove intermediate file"
                    );
                }
            }
        }
    }
}
