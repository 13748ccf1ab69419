pub mod assembler;
pub mod fetcher;
pub mod synthesis;

pub use fetcher::{AudioFetcher, HttpAudioFetcher};
pub use synthesis::{GoogleTtsClient, SynthesisClient};

/// Voice options applied to every synthesis request of a job.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Locale code, e.g. "en" or "es".
    pub language: String,
    pub speed: VoiceSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSpeed {
    Normal,
    Slow,
}

/// A resolvable pointer to the synthesized audio of one text unit.
#[derive(Debug, Clone)]
pub struct SynthesisReference {
    pub unit_index: usize,
    pub url: String,
}
