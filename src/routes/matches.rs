use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::{EngineError, MatchEngine, MatchTable};
use crate::models::{
    EntityRecord, ErrorResponse, HealthResponse, Population, Role, TopMatchesQuery,
    TopMatchesResponse,
};

/// Application state shared across all handlers
///
/// The table is built once before the server starts and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub population: Arc<Population>,
    pub table: Arc<MatchTable>,
    pub matching: MatchingSettings,
}

impl AppState {
    /// Compute the match table for `population` and wrap everything for sharing
    pub async fn build(
        engine: MatchEngine,
        population: Population,
        matching: MatchingSettings,
    ) -> Result<Self, EngineError> {
        let table = engine
            .compute_all_matches(&population.seekers, &population.providers)
            .await?;

        Ok(Self {
            engine: Arc::new(engine),
            population: Arc::new(population),
            table,
            matching,
        })
    }
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/profiles/{identity}", web::get().to(get_profile))
        .route("/matches/top/{identity}", web::get().to(top_matches))
        .route("/matches/explain/{seeker}/{provider}", web::get().to(explain_pair))
        .route("/matches/matrix", web::get().to(score_matrix))
        .route("/matches/export.csv", web::get().to(export_csv));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        seekers: state.population.seekers.len(),
        providers: state.population.providers.len(),
        pairs: state.table.len(),
    })
}

/// Profile lookup
///
/// GET /api/v1/profiles/{identity}
async fn get_profile(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let identity = path.into_inner();

    match state.population.find(&identity) {
        Some(record) => HttpResponse::Ok().json(record),
        None => error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "Profile not found",
            format!("No seeker or provider with identity {}", identity),
        ),
    }
}

/// Top matches endpoint
///
/// GET /api/v1/matches/top/{identity}?n=3
///
/// Response body:
/// ```json
/// {
///   "identity": "F1",
///   "role": "seeker",
///   "matches": [{ "counterpart_id": "S4", "final_score": 91 }]
/// }
/// ```
async fn top_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<TopMatchesQuery>,
) -> impl Responder {
    let identity = path.into_inner();

    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for top matches of {}: {:?}", identity, errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let n = query.n.unwrap_or(state.matching.default_top_n);
    if n > state.matching.max_top_n {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            format!("n must be at most {}", state.matching.max_top_n),
        );
    }

    let Some(role) = Role::from_identity(&identity) else {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Unknown role",
            format!(
                "Identity {} must start with '{}' or '{}'",
                identity,
                Role::Seeker.prefix(),
                Role::Provider.prefix()
            ),
        );
    };

    let matches = state.engine.get_top_matches(&identity, &state.table, n);

    tracing::debug!("Returning {} matches for {}", matches.len(), identity);

    HttpResponse::Ok().json(TopMatchesResponse {
        identity,
        role,
        matches,
    })
}

/// Score breakdown for one pair
///
/// GET /api/v1/matches/explain/{seeker}/{provider}
async fn explain_pair(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (seeker_id, provider_id) = path.into_inner();

    let seeker = match state.population.find(&seeker_id) {
        Some(EntityRecord::Seeker(seeker)) => seeker,
        _ => {
            return error_response(
                actix_web::http::StatusCode::NOT_FOUND,
                "Seeker not found",
                format!("No seeker with identity {}", seeker_id),
            )
        }
    };
    let provider = match state.population.find(&provider_id) {
        Some(EntityRecord::Provider(provider)) => provider,
        _ => {
            return error_response(
                actix_web::http::StatusCode::NOT_FOUND,
                "Provider not found",
                format!("No provider with identity {}", provider_id),
            )
        }
    };

    match state.engine.explain(&seeker, &provider).await {
        Ok(breakdown) => HttpResponse::Ok().json(breakdown),
        Err(e) => {
            tracing::error!("Failed to score {} x {}: {}", seeker_id, provider_id, e);
            error_response(
                actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                "Scoring failed",
                e.to_string(),
            )
        }
    }
}

/// Full seeker x provider score matrix
///
/// GET /api/v1/matches/matrix
async fn score_matrix(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.to_matrix(&state.table))
}

/// Match table download
///
/// GET /api/v1/matches/export.csv
async fn export_csv(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"match_scores.csv\"",
        ))
        .body(state.table.to_csv())
}
