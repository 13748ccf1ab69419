use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Frontend origin allowed through CORS (exact match)
    pub frontend_url: Option<String>,
    // Directories for uploads, final audio and per-job scratch files
    pub uploads_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub temp_dir: PathBuf,
    // TTS voice selection
    pub tts_language: String,
    pub tts_slow: bool,
    // Per-request timeout for audio retrieval, seconds
    pub fetch_timeout_secs: u64,
    // Upper bound on characters per synthesis request
    pub max_unit_chars: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database.sqlite".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            frontend_url: env::var("FRONTEND_URL").ok(),
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            audio_dir: env::var("AUDIO_DIR")
                .unwrap_or_else(|_| "audio".to_string())
                .into(),
            temp_dir: env::var("TEMP_DIR")
                .unwrap_or_else(|_| "temp".to_string())
                .into(),
            tts_language: env::var("TTS_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            tts_slow: env::var("TTS_SLOW")
                .unwrap_or_else(|_| "false".to_string())
                .parse::<String>()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            max_unit_chars: env::var("MAX_UNIT_CHARS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
