use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readaloud_backend::controllers::conversion::ConversionController;
use readaloud_backend::domain::conversion::ConversionService;
use readaloud_backend::infrastructure::config::{Config, LogFormat};
use readaloud_backend::infrastructure::db::{check_connection, create_pool, init_schema};
use readaloud_backend::infrastructure::extract::PdfTextExtractor;
use readaloud_backend::infrastructure::http::start_http_server;
use readaloud_backend::infrastructure::repositories::ConversionRepository;
use readaloud_backend::infrastructure::tts::{
    GoogleTtsClient, HttpAudioFetcher, VoiceConfig, VoiceSpeed,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting ReadAloud Backend on {}:{}",
        config.host,
        config.port
    );

    // Working directories for uploads, final audio and per-job scratch files
    for dir in [&config.uploads_dir, &config.audio_dir, &config.temp_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }

    // Create database connection pool and schema
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    check_connection(&pool).await?;
    init_schema(&pool).await?;
    tracing::info!("Database schema ready");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate the job store (inject db pool)
    let conversion_repo = Arc::new(ConversionRepository::new(pool.clone()));

    // 2. Instantiate pipeline collaborators
    let extractor = Arc::new(PdfTextExtractor);
    let synthesis_client = Arc::new(GoogleTtsClient::new());
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()?;
    let fetcher = Arc::new(HttpAudioFetcher::new(http_client));
    let voice = VoiceConfig {
        language: config.tts_language.clone(),
        speed: if config.tts_slow {
            VoiceSpeed::Slow
        } else {
            VoiceSpeed::Normal
        },
    };

    // 3. Instantiate the orchestrating service (inject store and collaborators)
    let conversion_service = Arc::new(ConversionService::new(
        conversion_repo,
        extractor,
        synthesis_client,
        fetcher,
        voice,
        config.audio_dir.clone(),
        config.temp_dir.clone(),
        config.max_unit_chars,
    ));

    // 4. Instantiate the controller (inject service)
    let conversion_controller = Arc::new(ConversionController::new(
        conversion_service,
        config.uploads_dir.clone(),
    ));

    // Start HTTP server with all routes
    start_http_server(pool, config, conversion_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "readaloud_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "readaloud_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
