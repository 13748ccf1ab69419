// Job store tests against a scratch SQLite database.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use readaloud_backend::domain::conversion::ConversionStatus;
use readaloud_backend::infrastructure::db::{self, DbPool};
use readaloud_backend::infrastructure::repositories::ConversionRepository;

async fn repository() -> (ConversionRepository, Arc<DbPool>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite://{}/jobs.db", dir.path().display());
    let pool = Arc::new(db::create_pool(&database_url).await.unwrap());
    db::init_schema(&pool).await.unwrap();
    (ConversionRepository::new(pool.clone()), pool, dir)
}

#[tokio::test]
async fn it_should_create_and_find_a_processing_job() {
    let (repo, _pool, _dir) = repository().await;
    let id = Uuid::new_v4();

    repo.create(id, "stored.pdf", "report.pdf").await.unwrap();

    let conversion = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(conversion.id, id);
    assert_eq!(conversion.filename, "stored.pdf");
    assert_eq!(conversion.original_filename, "report.pdf");
    assert_eq!(conversion.status, ConversionStatus::Processing);
    assert_eq!(conversion.text_length, None);
    assert_eq!(conversion.audio_file, None);
}

#[tokio::test]
async fn it_should_return_none_for_an_unknown_job() {
    let (repo, _pool, _dir) = repository().await;

    let conversion = repo.find_by_id(Uuid::new_v4()).await.unwrap();
    assert!(conversion.is_none());
}

#[tokio::test]
async fn it_should_record_the_converting_transition_with_text_length() {
    let (repo, _pool, _dir) = repository().await;
    let id = Uuid::new_v4();
    repo.create(id, "stored.pdf", "report.pdf").await.unwrap();

    repo.mark_converting(id, 1234).await.unwrap();

    let conversion = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(conversion.status, ConversionStatus::Converting);
    assert_eq!(conversion.text_length, Some(1234));
}

#[tokio::test]
async fn it_should_expose_the_audio_file_only_once_completed() {
    let (repo, _pool, _dir) = repository().await;
    let id = Uuid::new_v4();
    repo.create(id, "stored.pdf", "report.pdf").await.unwrap();
    repo.mark_converting(id, 10).await.unwrap();

    assert_eq!(repo.find_completed_audio(id).await.unwrap(), None);

    repo.mark_completed(id, "artifact.mp3").await.unwrap();

    let conversion = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(conversion.status, ConversionStatus::Completed);
    assert_eq!(conversion.audio_file, Some("artifact.mp3".to_string()));
    assert_eq!(
        repo.find_completed_audio(id).await.unwrap(),
        Some("artifact.mp3".to_string())
    );
}

#[tokio::test]
async fn it_should_not_expose_audio_for_a_failed_job() {
    let (repo, _pool, _dir) = repository().await;
    let id = Uuid::new_v4();
    repo.create(id, "stored.pdf", "report.pdf").await.unwrap();

    repo.mark_failed(id).await.unwrap();

    assert_eq!(repo.find_completed_audio(id).await.unwrap(), None);
}

#[tokio::test]
async fn it_should_keep_terminal_states_final() {
    let (repo, _pool, _dir) = repository().await;
    let id = Uuid::new_v4();
    repo.create(id, "stored.pdf", "report.pdf").await.unwrap();
    repo.mark_failed(id).await.unwrap();

    // None of these may take effect on a terminal job.
    repo.mark_converting(id, 99).await.unwrap();
    repo.mark_completed(id, "late.mp3").await.unwrap();

    let conversion = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(conversion.status, ConversionStatus::Failed);
    assert_eq!(conversion.audio_file, None);
    assert_eq!(conversion.text_length, None);
}

#[tokio::test]
async fn it_should_list_recent_jobs_newest_first_with_a_limit() {
    let (repo, _pool, _dir) = repository().await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = Uuid::new_v4();
        repo.create(id, &format!("stored_{i}.pdf"), &format!("doc_{i}.pdf"))
            .await
            .unwrap();
        ids.push(id);
        // Distinct creation timestamps for a stable ordering
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let summaries = repo.list_recent(10).await.unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].id, ids[2]);
    assert_eq!(summaries[1].id, ids[1]);
    assert_eq!(summaries[2].id, ids[0]);

    let limited = repo.list_recent(2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, ids[2]);
}
