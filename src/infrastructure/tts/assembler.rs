//! Merges ordered audio segments into the final artifact.
//!
//! Multiple segments are concatenated with ffmpeg's concat demuxer in stream
//! copy mode, so the encoded audio is never re-encoded. If ffmpeg is missing
//! or exits non-zero, the segments are concatenated byte for byte instead;
//! MP3 frame streams tolerate that in practice, but the result is a best
//! effort artifact rather than a guaranteed-valid encoding.

use crate::domain::conversion::PipelineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Stream-copy concatenation is I/O bound; a merge running longer than this
/// is stuck and treated as failed.
const MERGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Merge `segments` (already in ordinal order) into `output`.
///
/// Post-condition on success: every segment file and the scratch list file
/// are gone and exactly one artifact exists at `output`. Fails with
/// `AssemblyFailed` only when both the ffmpeg merge and the byte fallback
/// fail; intermediate cleanup is not guaranteed in that case.
pub async fn assemble(
    segments: &[PathBuf],
    list_path: &Path,
    output: &Path,
) -> Result<(), PipelineError> {
    match segments {
        [] => Err(PipelineError::AssemblyFailed(
            "no segments to assemble".to_string(),
        )),
        // A single segment is moved as-is, skipping the merge entirely.
        [only] => move_file(only, output).await,
        _ => {
            write_concat_list(segments, list_path).await?;

            if let Err(err) = run_ffmpeg_concat(list_path, output).await {
                tracing::warn!(
                    error = %err,
                    "ffmpeg merge failed, falling back to byte concatenation"
                );
                concat_bytes(segments, output).await?;
            }

            cleanup(segments, list_path).await;
            Ok(())
        }
    }
}

async fn write_concat_list(segments: &[PathBuf], list_path: &Path) -> Result<(), PipelineError> {
    let list = segments
        .iter()
        .map(|p| format!("file '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    tokio::fs::write(list_path, list)
        .await
        .map_err(|e| PipelineError::AssemblyFailed(format!("failed to write concat list: {e}")))
}

async fn run_ffmpeg_concat(list_path: &Path, output: &Path) -> Result<(), String> {
    let command = Command::new("ffmpeg")
        .arg("-y")
        .args(["-f", "concat", "-safe", "0"])
        .arg("-i")
        .arg(list_path)
        .args(["-c", "copy"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    let result = tokio::time::timeout(MERGE_TIMEOUT, command)
        .await
        .map_err(|_| format!("ffmpeg timed out after {}s", MERGE_TIMEOUT.as_secs()))?
        .map_err(|e| format!("failed to spawn ffmpeg: {e}"))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(format!(
            "ffmpeg exited with {}: {}",
            result.status,
            stderr.lines().last().unwrap_or_default()
        ));
    }

    Ok(())
}

/// Raw byte-level concatenation of the segment files, in order.
async fn concat_bytes(segments: &[PathBuf], output: &Path) -> Result<(), PipelineError> {
    let mut combined = Vec::new();
    for segment in segments {
        let bytes = tokio::fs::read(segment).await.map_err(|e| {
            PipelineError::AssemblyFailed(format!(
                "failed to read segment {}: {e}",
                segment.display()
            ))
        })?;
        combined.extend_from_slice(&bytes);
    }

    tokio::fs::write(output, combined)
        .await
        .map_err(|e| PipelineError::AssemblyFailed(format!("failed to write artifact: {e}")))
}

/// Move a file, falling back to copy+remove when rename crosses filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from, to)
        .await
        .map_err(|e| PipelineError::AssemblyFailed(format!("failed to move segment: {e}")))?;
    if let Err(err) = tokio::fs::remove_file(from).await {
        tracing::warn!(file = %from.display(), error = %err, "Failed to remove moved segment");
    }

    Ok(())
}

async fn cleanup(segments: &[PathBuf], list_path: &Path) {
    for segment in segments {
        if let Err(err) = tokio::fs::remove_file(segment).await {
            tracing::warn!(file = %segment.display(), error = %err, "Failed to remove segment");
        }
    }
    if let Err(err) = tokio::fs::remove_file(list_path).await {
        tracing::warn!(file = %list_path.display(), error = %err, "Failed to remove concat list");
    }
}
