use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use skill_match::config::{EmbeddingBackend, Settings};
use skill_match::core::{
    EmbeddingSimilarity, MatchEngine, Matcher, SimilarityProvider, TimeoutSimilarity,
};
use skill_match::routes::{self, AppState};
use skill_match::services::{load_population, HttpEmbeddingClient, LexicalEmbedder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn io_error(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

/// Select the embedding backend and wrap it with the per-call timeout
fn build_similarity(settings: &Settings) -> std::io::Result<Arc<dyn SimilarityProvider>> {
    let embedding = &settings.embedding;

    let provider: Arc<dyn SimilarityProvider> = match embedding.backend {
        EmbeddingBackend::Lexical => {
            info!("Using lexical embedder ({} dims)", embedding.lexical_dimensions);
            Arc::new(EmbeddingSimilarity::new(
                LexicalEmbedder::new(embedding.lexical_dimensions),
                embedding.cache_capacity,
            ))
        }
        EmbeddingBackend::Http => {
            let endpoint = embedding
                .endpoint
                .clone()
                .ok_or_else(|| io_error("embedding.endpoint is required for the http backend".to_string()))?;
            info!("Using HTTP embeddings at {} (model {})", endpoint, embedding.model);

            let client = HttpEmbeddingClient::new(
                endpoint,
                embedding.model.clone(),
                embedding.api_key.clone(),
                Duration::from_secs(embedding.request_timeout_secs.unwrap_or(30)),
            )
            .map_err(|e| io_error(format!("Failed to create embedding client: {}", e)))?;

            Arc::new(EmbeddingSimilarity::new(client, embedding.cache_capacity))
        }
    };

    match settings.engine.similarity_timeout_ms {
        0 => Ok(provider),
        ms => Ok(Arc::new(TimeoutSimilarity::new(provider, Duration::from_millis(ms)))),
    }
}

// Multi-threaded runtime: the match table build spreads pair scoring over all workers
#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load()
        .map_err(|e| io_error(format!("Configuration error: {}", e)))?;

    // Initialize logging; LOG_LEVEL / LOG_FORMAT override the configured values
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting SkillMatch engine...");
    info!("Configuration loaded successfully");

    // Weights and categorical rules are validated before anything is scored
    let weights = settings.scoring.weights.to_weights().map_err(|e| {
        error!("{}", e);
        io_error(e.to_string())
    })?;
    let rules = settings.categories.to_rules().map_err(|e| {
        error!("{}", e);
        io_error(e.to_string())
    })?;
    let matcher = Matcher::new(weights, rules)
        .with_concurrency(settings.engine.concurrency)
        .map_err(|e| io_error(e.to_string()))?;

    info!(
        "Matcher initialized with weights: {:?}, concurrency {}",
        weights, settings.engine.concurrency
    );

    let similarity = build_similarity(&settings)?;
    let engine = MatchEngine::new(similarity, matcher);

    let population = load_population(&settings.dataset.path).map_err(|e| {
        error!("Failed to load dataset: {}", e);
        io_error(e.to_string())
    })?;

    let app_state = AppState::build(engine, population, settings.matching.clone())
        .await
        .map_err(|e| {
            error!("Failed to build match table: {}", e);
            io_error(e.to_string())
        })?;

    info!("Match table ready: {} pairs", app_state.table.len());

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
