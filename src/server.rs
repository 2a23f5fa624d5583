use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::cli::Args;
use crate::clinical::{ClinicalAssessment, FallbackTable};
use crate::config::Config;
use crate::error::ApiError;
use crate::gemini::{AnalysisError, GeminiClient};
use crate::overpass::OverpassClient;
use crate::providers;
use crate::users::{SignupOutcome, UserStore, issue_token, verify_token};

const DEFAULT_RADIUS_M: u32 = 10_000;
const DEFAULT_LIMIT: usize = 20;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    users: Arc<UserStore>,
    fallback: Arc<FallbackTable>,
    gemini: GeminiClient,
    overpass: OverpassClient,
}

pub async fn run(opts: Args) -> anyhow::Result<()> {
    let config = Config::from_env();
    let fallback = FallbackTable::load().context("load fallback table")?;

    let state = AppState {
        config: Arc::new(config),
        users: Arc::new(UserStore::new()),
        fallback: Arc::new(fallback),
        gemini: GeminiClient::new(),
        overpass: OverpassClient::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/analyze", post(api_analyze))
        .route("/api/find-care", get(api_find_care))
        .route("/api/auth/signup", post(api_signup))
        .route("/api/auth/login", post(api_login))
        .route("/api/auth/me", get(api_auth_me))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    symptoms: String,
    #[serde(default, rename = "apiKey")]
    api_key: Option<String>,
}

async fn api_analyze(
    State(st): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ClinicalAssessment>, ApiError> {
    let symptoms = req.symptoms.trim();
    if symptoms.is_empty() {
        return Err(ApiError::Validation(
            "Please describe your symptoms".to_string(),
        ));
    }
    let user_key = req
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());

    analyze_chain(&st, symptoms, user_key).await.map(Json)
}

/// Prioritized analysis chain: caller key, then server key, then the curated
/// fallback. An invalid caller key is the only failure surfaced as-is;
/// everything else falls through to the next step.
async fn analyze_chain(
    st: &AppState,
    symptoms: &str,
    user_key: Option<&str>,
) -> Result<ClinicalAssessment, ApiError> {
    if let Some(key) = user_key {
        match st.gemini.analyze(key, symptoms).await {
            Ok(assessment) => return Ok(assessment),
            Err(AnalysisError::InvalidCredential) => return Err(ApiError::InvalidCredential),
            Err(err) => tracing::warn!("AI analysis with caller key failed: {err}"),
        }
    }

    if let Some(key) = st.config.gemini_api_key.as_deref() {
        match st.gemini.analyze(key, symptoms).await {
            Ok(assessment) => return Ok(assessment),
            Err(err) => tracing::warn!("AI analysis with server key failed: {err}"),
        }
    }

    Ok(st.fallback.lookup(symptoms).clone())
}

#[derive(Debug, Deserialize)]
struct FindCareParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<u32>,
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct FindCareResponse {
    providers: Vec<providers::ProviderRecord>,
    total: usize,
    /// Search radius echoed back in kilometers.
    radius: f64,
    location: Location,
}

#[derive(Debug, Serialize)]
struct Location {
    lat: f64,
    lon: f64,
}

async fn api_find_care(
    State(st): State<AppState>,
    Query(p): Query<FindCareParams>,
) -> Result<Json<FindCareResponse>, ApiError> {
    let (lat, lon) = match (p.lat, p.lon) {
        (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => (lat, lon),
        _ => {
            return Err(ApiError::Validation(
                "Location coordinates required".to_string(),
            ));
        }
    };
    let radius = p.radius.unwrap_or(DEFAULT_RADIUS_M);
    let query = p.q.unwrap_or_default();
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);

    let elements = st
        .overpass
        .search(lat, lon, radius, &query)
        .await
        .map_err(ApiError::ProviderFetch)?;

    let ranked = providers::rank(&elements, &query, lat, lon, limit);
    Ok(Json(FindCareResponse {
        providers: ranked.providers,
        total: ranked.total,
        radius: radius as f64 / 1000.0,
        location: Location { lat, lon },
    }))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    name: String,
    email: String,
}

async fn api_signup(
    State(st): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("All fields are required.".to_string()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters.".to_string(),
        ));
    }

    match st
        .users
        .insert_if_absent(email, name, &req.password)
        .map_err(ApiError::Internal)?
    {
        SignupOutcome::EmailTaken => Err(ApiError::Conflict(
            "An account with this email already exists.".to_string(),
        )),
        SignupOutcome::Created => {
            let account = st
                .users
                .authenticate(email, &req.password)
                .ok_or(ApiError::Unauthorized)?;
            let token =
                issue_token(&st.config.secret_key, &account).map_err(ApiError::Internal)?;
            Ok(Json(AuthResponse {
                token,
                name: account.name,
                email: account.email,
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn api_login(
    State(st): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let account = st
        .users
        .authenticate(req.email.trim(), &req.password)
        .ok_or(ApiError::Unauthorized)?;
    let token = issue_token(&st.config.secret_key, &account).map_err(ApiError::Internal)?;
    Ok(Json(AuthResponse {
        token,
        name: account.name,
        email: account.email,
    }))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    email: String,
    name: String,
}

async fn api_auth_me(
    State(st): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let claims = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| verify_token(&st.config.secret_key, token))
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(MeResponse {
        email: claims.sub,
        name: claims.name,
    }))
}
