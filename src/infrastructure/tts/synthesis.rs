use super::{SynthesisReference, VoiceConfig, VoiceSpeed};
use crate::domain::conversion::{PipelineError, TextUnit};
use async_trait::async_trait;

/// Obtains a synthesis reference for one text unit.
/// Abstracts the TTS backend (Google Translate, Polly, ...). Calls are
/// independent and safe to issue concurrently.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Resolve one text unit to a fetchable audio reference.
    ///
    /// # Errors
    /// Returns `PipelineError::SynthesisUnavailable` on transport or backend
    /// error; the orchestrator fails the whole job on any single unit.
    async fn reference(
        &self,
        unit: &TextUnit,
        voice: &VoiceConfig,
    ) -> Result<SynthesisReference, PipelineError>;
}

/// The unofficial Google Translate TTS endpoint. It takes the text in the
/// query string (which is why units are capped around 200 characters) and
/// returns an MP3 stream.
pub struct GoogleTtsClient {
    host: String,
}

impl GoogleTtsClient {
    pub fn new() -> Self {
        Self {
            host: "https://translate.google.com".to_string(),
        }
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Default for GoogleTtsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesisClient for GoogleTtsClient {
    async fn reference(
        &self,
        unit: &TextUnit,
        voice: &VoiceConfig,
    ) -> Result<SynthesisReference, PipelineError> {
        if unit.content.is_empty() {
            return Err(PipelineError::SynthesisUnavailable(
                "cannot synthesize an empty text unit".to_string(),
            ));
        }

        let speed = match voice.speed {
            VoiceSpeed::Normal => "1",
            VoiceSpeed::Slow => "0.24",
        };
        let url = format!(
            "{}/translate_tts?ie=UTF-8&q={}&tl={}&total=1&idx=0&textlen={}&client=tw-ob&prev=input&ttsspeed={}",
            self.host,
            urlencoding::encode(&unit.content),
            urlencoding::encode(&voice.language),
            unit.content.chars().count(),
            speed,
        );

        tracing::debug!(unit = unit.index, url_length = url.len(), "Synthesis reference built");

        Ok(SynthesisReference {
            unit_index: unit.index,
            url,
        })
    }
}
