// Orchestrator tests driving full conversion runs against a scratch SQLite
// database with mocked pipeline collaborators. Synthesis and fetching are
// stubbed so runs are deterministic and offline; assembly is exercised for
// real (single-segment move, multi-segment fallback concatenation).

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use readaloud_backend::domain::conversion::{
    Conversion, ConversionService, ConversionStatus, PipelineError, TextUnit,
};
use readaloud_backend::infrastructure::db::{self, DbPool};
use readaloud_backend::infrastructure::extract::TextExtractor;
use readaloud_backend::infrastructure::repositories::ConversionRepository;
use readaloud_backend::infrastructure::tts::{
    AudioFetcher, SynthesisClient, SynthesisReference, VoiceConfig, VoiceSpeed,
};

struct FixedTextExtractor(String);

#[async_trait]
impl TextExtractor for FixedTextExtractor {
    async fn extract(&self, _document: Vec<u8>) -> Result<String, PipelineError> {
        Ok(self.0.clone())
    }
}

struct FailingExtractor;

#[async_trait]
impl TextExtractor for FailingExtractor {
    async fn extract(&self, _document: Vec<u8>) -> Result<String, PipelineError> {
        Err(PipelineError::Extraction("unreadable document".to_string()))
    }
}

struct StubSynthesis;

#[async_trait]
impl SynthesisClient for StubSynthesis {
    async fn reference(
        &self,
        unit: &TextUnit,
        _voice: &VoiceConfig,
    ) -> Result<SynthesisReference, PipelineError> {
        Ok(SynthesisReference {
            unit_index: unit.index,
            url: format!("mock://audio/{}", unit.index),
        })
    }
}

/// Writes `SEG{index}` to the destination. Optionally fails one index, and
/// delays low indexes so completion order is the reverse of unit order.
struct StubFetcher {
    fail_index: Option<usize>,
    scramble_completion: bool,
}

#[async_trait]
impl AudioFetcher for StubFetcher {
    async fn fetch(
        &self,
        reference: &SynthesisReference,
        dest: &Path,
    ) -> Result<(), PipelineError> {
        let index = reference.unit_index;
        if self.scramble_completion {
            let delay = 50u64.saturating_sub(index as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_index == Some(index) {
            return Err(PipelineError::FetchFailed(format!(
                "stubbed failure for unit {index}"
            )));
        }
        tokio::fs::write(dest, format!("SEG{index}"))
            .await
            .map_err(|e| PipelineError::FetchFailed(e.to_string()))?;
        Ok(())
    }
}

struct Harness {
    service: Arc<ConversionService>,
    store: Arc<ConversionRepository>,
    dir: TempDir,
    _pool: Arc<DbPool>,
}

impl Harness {
    fn audio_dir(&self) -> PathBuf {
        self.dir.path().join("audio")
    }

    fn temp_dir(&self) -> PathBuf {
        self.dir.path().join("temp")
    }

    async fn start_job(&self, id: Uuid) {
        let upload_path = self.dir.path().join(format!("{id}-input.pdf"));
        tokio::fs::write(&upload_path, b"%PDF- stub").await.unwrap();
        self.service
            .enqueue(id, &format!("{id}-input.pdf"), "input.pdf", upload_path)
            .await
            .unwrap();
    }

    async fn wait_for_terminal(&self, id: Uuid) -> Conversion {
        for _ in 0..200 {
            let conversion = self.store.find_by_id(id).await.unwrap().unwrap();
            if conversion.status.is_terminal() {
                return conversion;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    async fn remaining_temp_files(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.temp_dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names
    }
}

async fn harness(
    extractor: Arc<dyn TextExtractor>,
    fetcher: StubFetcher,
    max_unit_chars: usize,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let temp_dir = dir.path().join("temp");
    tokio::fs::create_dir_all(&audio_dir).await.unwrap();
    tokio::fs::create_dir_all(&temp_dir).await.unwrap();

    let database_url = format!("sqlite://{}/jobs.db", dir.path().display());
    let pool = Arc::new(db::create_pool(&database_url).await.unwrap());
    db::init_schema(&pool).await.unwrap();

    let store = Arc::new(ConversionRepository::new(pool.clone()));
    let service = Arc::new(ConversionService::new(
        store.clone(),
        extractor,
        Arc::new(StubSynthesis),
        Arc::new(fetcher),
        VoiceConfig {
            language: "en".to_string(),
            speed: VoiceSpeed::Normal,
        },
        audio_dir,
        temp_dir,
        max_unit_chars,
    ));

    Harness {
        service,
        store,
        dir,
        _pool: pool,
    }
}

fn no_failures() -> StubFetcher {
    StubFetcher {
        fail_index: None,
        scramble_completion: false,
    }
}

#[tokio::test]
async fn it_should_complete_a_single_unit_job_by_moving_the_segment() {
    let text = "Hello world. This is a test.";
    let h = harness(Arc::new(FixedTextExtractor(text.to_string())), no_failures(), 200).await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let conversion = h.wait_for_terminal(id).await;

    assert_eq!(conversion.status, ConversionStatus::Completed);
    assert_eq!(conversion.text_length, Some(text.chars().count() as i64));
    assert_eq!(conversion.audio_file, Some(format!("{id}.mp3")));

    let artifact = h.audio_dir().join(format!("{id}.mp3"));
    assert_eq!(tokio::fs::read(&artifact).await.unwrap(), b"SEG0");
    assert!(h.remaining_temp_files().await.is_empty());
}

#[tokio::test]
async fn it_should_assemble_segments_in_unit_order_despite_completion_order() {
    // Five sentences, each its own unit at this limit. The stub fetcher
    // finishes them in reverse order; the artifact must still follow the
    // ordinal indexes.
    let text = "One one one. Two two two. Three three. Four four. Five five.";
    let h = harness(
        Arc::new(FixedTextExtractor(text.to_string())),
        StubFetcher {
            fail_index: None,
            scramble_completion: true,
        },
        15,
    )
    .await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let conversion = h.wait_for_terminal(id).await;

    assert_eq!(conversion.status, ConversionStatus::Completed);
    let artifact = h.audio_dir().join(format!("{id}.mp3"));
    assert_eq!(
        tokio::fs::read(&artifact).await.unwrap(),
        b"SEG0SEG1SEG2SEG3SEG4"
    );
    assert!(h.remaining_temp_files().await.is_empty());
}

#[tokio::test]
async fn it_should_fail_the_job_and_clean_up_when_one_fetch_fails() {
    let text = "One one one. Two two two. Three three. Four four. Five five.";
    let h = harness(
        Arc::new(FixedTextExtractor(text.to_string())),
        StubFetcher {
            fail_index: Some(2),
            scramble_completion: false,
        },
        15,
    )
    .await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let conversion = h.wait_for_terminal(id).await;

    assert_eq!(conversion.status, ConversionStatus::Failed);
    assert_eq!(conversion.audio_file, None);
    // Units 0, 1, 3 and 4 were fetched successfully; everything must be gone.
    assert!(h.remaining_temp_files().await.is_empty());
    assert!(!h.audio_dir().join(format!("{id}.mp3")).exists());
}

#[tokio::test]
async fn it_should_fail_without_converting_when_document_has_no_text() {
    let h = harness(
        Arc::new(FixedTextExtractor("   \n  ".to_string())),
        no_failures(),
        200,
    )
    .await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let conversion = h.wait_for_terminal(id).await;

    assert_eq!(conversion.status, ConversionStatus::Failed);
    assert_eq!(conversion.text_length, None);
    assert_eq!(conversion.audio_file, None);
}

#[tokio::test]
async fn it_should_fail_when_extraction_itself_fails() {
    let h = harness(Arc::new(FailingExtractor), no_failures(), 200).await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let conversion = h.wait_for_terminal(id).await;

    assert_eq!(conversion.status, ConversionStatus::Failed);
    assert_eq!(conversion.text_length, None);
}

#[tokio::test]
async fn it_should_keep_a_terminal_state_despite_late_writes() {
    let text = "Hello world. This is a test.";
    let h = harness(Arc::new(FixedTextExtractor(text.to_string())), no_failures(), 200).await;
    let id = Uuid::new_v4();

    h.start_job(id).await;
    let completed = h.wait_for_terminal(id).await;
    assert_eq!(completed.status, ConversionStatus::Completed);

    // A stray write after completion must not move the job.
    h.store.mark_failed(id).await.unwrap();
    h.store.mark_converting(id, 1).await.unwrap();

    let after = h.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(after.status, ConversionStatus::Completed);
    assert_eq!(after.audio_file, completed.audio_file);
}
