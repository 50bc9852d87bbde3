//! thoughtmarks-api - HTTP API server for Thoughtmarks

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use governor::{
    clock::{Clock, DefaultClock},
    Quota, RateLimiter,
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use thoughtmarks_ai::{
    embedding_text, CategorizationAdvisor, EmbeddingGenerator, InsightsAnalyzer, OpenAIBackend,
};
use thoughtmarks_core::defaults::{
    CORS_MAX_AGE_SECS, MAX_BODY_SIZE_BYTES, RATE_LIMIT_PERIOD_SECS, RATE_LIMIT_REQUESTS,
    SERVER_PORT, SIMILARITY_LIMIT, SIMILARITY_THRESHOLD_ROUTE,
};
use thoughtmarks_core::embedding::encode_embedding;
use thoughtmarks_core::{
    Bin, BinOrderUpdate, BinRepository, CreateBinRequest, CreateThoughtmarkRequest,
    CreateUserRequest, EmbeddingBackend, SuggestionBackend, Thoughtmark, ThoughtmarkRepository,
    UpdateBinRequest, UpdateThoughtmarkRequest, UserRepository,
};
use thoughtmarks_db::Database;
use thoughtmarks_search::{SimilarityOptions, SimilaritySearch};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically and log lines
/// for one request group together.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Global rate limiter type (direct quota, no keyed bucketing).
type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// Best-effort embedding generation for capture and edit paths.
    embedder: EmbeddingGenerator,
    /// Cosine similarity search over a user's stored embeddings.
    similarity: SimilaritySearch,
    /// Bin categorization suggestions.
    advisor: CategorizationAdvisor,
    /// Cross-thoughtmark insight analysis.
    insights: InsightsAnalyzer,
    /// Whether an OpenAI API key is configured. The analyze route refuses
    /// to run without one; everything else degrades gracefully.
    ai_enabled: bool,
    /// Global rate limiter (None if rate limiting is disabled).
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Parse allowed origins from the comma-separated `CORS_ALLOWED_ORIGINS`
/// environment variable. Invalid entries are dropped with a warning.
fn parse_allowed_origins(origins_str: &str) -> Vec<HeaderValue> {
    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

/// Build the CORS layer: an origin whitelist when `CORS_ALLOWED_ORIGINS` is
/// set, permissive otherwise.
fn cors_layer() -> CorsLayer {
    let max_age = std::time::Duration::from_secs(CORS_MAX_AGE_SECS);
    let origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| parse_allowed_origins(&s))
        .filter(|list| !list.is_empty());

    match origins {
        Some(list) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(USER_ID_HEADER),
            ])
            .allow_credentials(true)
            .max_age(max_age),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(max_age),
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "thoughtmarks_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "thoughtmarks_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("thoughtmarks-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/thoughtmarks".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(SERVER_PORT);

    // Rate limiting configuration
    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    info!(
        "Rate limiting: {} ({} requests per {} seconds)",
        if rate_limit_enabled {
            "enabled"
        } else {
            "disabled"
        },
        rate_limit_requests,
        rate_limit_period_secs
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize the AI provider backend. One client serves both the
    // embedding and the suggestion trait.
    let backend = Arc::new(OpenAIBackend::from_env()?);
    let ai_enabled = backend.has_api_key();
    if ai_enabled {
        info!(
            embed_model = EmbeddingBackend::model_name(backend.as_ref()),
            chat_model = SuggestionBackend::model_name(backend.as_ref()),
            "AI backend initialized"
        );
    } else {
        warn!("OPENAI_API_KEY not set; embeddings and suggestions will degrade to empty results");
    }

    let embed_backend: Arc<dyn EmbeddingBackend> = backend.clone();
    let suggest_backend: Arc<dyn SuggestionBackend> = backend;

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .ok_or_else(|| anyhow::anyhow!("Rate limit period must be non-zero"))?
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32)
                    .ok_or_else(|| anyhow::anyhow!("Rate limit must be non-zero"))?,
            );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        None
    };

    // Create app state
    let state = AppState {
        db,
        embedder: EmbeddingGenerator::new(embed_backend.clone()),
        similarity: SimilaritySearch::new(embed_backend),
        advisor: CategorizationAdvisor::new(suggest_backend.clone()),
        insights: InsightsAnalyzer::new(suggest_backend),
        ai_enabled,
        rate_limiter,
    };

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Users
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/by-firebase/:uid", get(get_user_by_firebase))
        // Bins
        .route("/api/v1/bins", get(list_bins).post(create_bin))
        .route("/api/v1/bins/reorder", patch(reorder_bins))
        .route(
            "/api/v1/bins/:id",
            get(get_bin)
                .put(update_bin)
                .patch(update_bin)
                .delete(delete_bin),
        )
        .route("/api/v1/bins/:id/thoughtmarks", get(list_bin_thoughtmarks))
        // Thoughtmarks
        .route(
            "/api/v1/thoughtmarks",
            get(list_thoughtmarks).post(create_thoughtmark),
        )
        .route(
            "/api/v1/thoughtmarks/deleted",
            get(list_deleted_thoughtmarks),
        )
        .route(
            "/api/v1/thoughtmarks/:id",
            get(get_thoughtmark)
                .put(update_thoughtmark)
                .patch(update_thoughtmark)
                .delete(delete_thoughtmark),
        )
        .route(
            "/api/v1/thoughtmarks/:id/restore",
            post(restore_thoughtmark),
        )
        // Search
        .route("/api/v1/search", get(search_thoughtmarks))
        // AI
        .route("/api/v1/ai/categorize", post(ai_categorize))
        .route("/api/v1/ai/similar", post(ai_similar))
        .route("/api/v1/ai/analyze", post(ai_analyze))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE_BYTES))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// RATE LIMITING MIDDLEWARE
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if let Some(limiter) = &state.rate_limiter {
        if let Err(not_until) = limiter.check() {
            let wait_secs = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            warn!(retry_after_secs = wait_secs, "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, wait_secs.to_string())],
                Json(serde_json::json!({
                    "error": "Too many requests. Please wait before retrying."
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Header carrying the authenticated user id. Token verification happens in
/// the upstream auth proxy; the backend trusts this header.
const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user id.
struct CurrentUser(i32);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

// =============================================================================
// OWNERSHIP HELPERS
// =============================================================================

/// Fetch a bin, returning 404 when absent and 403 when owned by another user.
async fn load_owned_bin(state: &AppState, user_id: i32, bin_id: i32) -> Result<Bin, ApiError> {
    let bin = state
        .db
        .bins
        .get(bin_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bin not found".to_string()))?;
    if bin.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(bin)
}

/// Fetch a thoughtmark (deleted or not), returning 404 when absent and 403
/// when owned by another user.
async fn load_owned_thoughtmark(
    state: &AppState,
    user_id: i32,
    id: i32,
) -> Result<Thoughtmark, ApiError> {
    let tm = state
        .db
        .thoughtmarks
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Thoughtmark not found".to_string()))?;
    if tm.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(tm)
}

// =============================================================================
// USER HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateUserBody {
    email: Option<String>,
    display_name: Option<String>,
    firebase_uid: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.unwrap_or_default();
    let firebase_uid = body.firebase_uid.unwrap_or_default();
    if email.trim().is_empty() || firebase_uid.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Email and firebase uid are required".to_string(),
        ));
    }

    let user = state
        .db
        .users
        .create(CreateUserRequest {
            email,
            display_name: body.display_name,
            firebase_uid,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user_by_firebase(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users
        .get_by_firebase_uid(&uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

// =============================================================================
// BIN HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateBinBody {
    name: Option<String>,
    description: Option<String>,
    color: Option<String>,
    icon: Option<String>,
}

async fn list_bins(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let bins = state.db.bins.list_for_user(user_id).await?;
    Ok(Json(bins))
}

async fn create_bin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateBinBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("Bin name is required".to_string()));
    }

    let bin = state
        .db
        .bins
        .create(
            user_id,
            CreateBinRequest {
                name,
                description: body.description,
                color: body.color,
                icon: body.icon,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(bin)))
}

async fn get_bin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_bin(&state, user_id, id).await?;
    let bin = state
        .db
        .bins
        .get_with_count(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bin not found".to_string()))?;
    Ok(Json(bin))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateBinBody {
    name: Option<String>,
    /// Tri-state: absent leaves the description untouched, `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    color: Option<String>,
    icon: Option<String>,
    sort_order: Option<i32>,
}

async fn update_bin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateBinBody>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_bin(&state, user_id, id).await?;

    if let Some(ref name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("Bin name is required".to_string()));
        }
    }

    let bin = state
        .db
        .bins
        .update(
            id,
            UpdateBinRequest {
                name: body.name,
                description: body.description,
                color: body.color,
                icon: body.icon,
                sort_order: body.sort_order,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Bin not found".to_string()))?;

    Ok(Json(bin))
}

async fn delete_bin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_bin(&state, user_id, id).await?;

    if !state.db.bins.delete(id).await? {
        return Err(ApiError::NotFound("Bin not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct ReorderBody {
    updates: Vec<BinOrderUpdate>,
}

async fn reorder_bins(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    body: Result<Json<ReorderBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) =
        body.map_err(|_| ApiError::BadRequest("Invalid reorder payload".to_string()))?;

    state.db.bins.reorder(user_id, &body.updates).await?;

    let bins = state.db.bins.list_for_user(user_id).await?;
    Ok(Json(bins))
}

async fn list_bin_thoughtmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_bin(&state, user_id, id).await?;
    let thoughtmarks = state.db.thoughtmarks.list_for_bin(id).await?;
    Ok(Json(thoughtmarks))
}

// =============================================================================
// THOUGHTMARK HANDLERS
// =============================================================================

/// True when an update body would change the embedded text. A field that is
/// absent or carries the stored value verbatim does not count: a full-object
/// PUT with unchanged title and content must not regenerate the embedding,
/// since a provider outage during such an edit would clear a valid one.
fn embedded_text_changed(
    existing: &Thoughtmark,
    title: Option<&str>,
    content: Option<&str>,
) -> bool {
    title.is_some_and(|t| t != existing.title) || content.is_some_and(|c| c != existing.content)
}

/// Deserialize a nullable optional field, distinguishing an absent field
/// (outer `None`) from an explicit `null` (inner `None`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
struct CreateThoughtmarkBody {
    title: Option<String>,
    content: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    bin_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateThoughtmarkBody {
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    /// Tri-state: absent leaves the bin untouched, `null` unfiles.
    #[serde(default, deserialize_with = "double_option")]
    bin_id: Option<Option<i32>>,
}

async fn list_thoughtmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let thoughtmarks = state.db.thoughtmarks.list_for_user(user_id).await?;
    Ok(Json(thoughtmarks))
}

async fn list_deleted_thoughtmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let thoughtmarks = state.db.thoughtmarks.list_deleted(user_id).await?;
    Ok(Json(thoughtmarks))
}

async fn create_thoughtmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateThoughtmarkBody>,
) -> Result<impl IntoResponse, ApiError> {
    let title = body.title.unwrap_or_default();
    let content = body.content.unwrap_or_default();
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    if let Some(bin_id) = body.bin_id {
        load_owned_bin(&state, user_id, bin_id).await?;
    }

    // Best-effort embedding: an empty vector means generation was skipped or
    // failed, and the thoughtmark is stored without one.
    let vector = state
        .embedder
        .generate(&embedding_text(&title, &content))
        .await;
    let embedding = (!vector.is_empty()).then(|| encode_embedding(&vector));

    let tm = state
        .db
        .thoughtmarks
        .create(
            user_id,
            CreateThoughtmarkRequest {
                title,
                content,
                tags: body.tags,
                bin_id: body.bin_id,
            },
            embedding,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(tm)))
}

async fn get_thoughtmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let tm = load_owned_thoughtmark(&state, user_id, id).await?;
    Ok(Json(tm))
}

async fn update_thoughtmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateThoughtmarkBody>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = load_owned_thoughtmark(&state, user_id, id).await?;

    if let Some(ref title) = body.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Title and content cannot be empty".to_string(),
            ));
        }
    }
    if let Some(ref content) = body.content {
        if content.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Title and content cannot be empty".to_string(),
            ));
        }
    }

    if let Some(Some(bin_id)) = body.bin_id {
        load_owned_bin(&state, user_id, bin_id).await?;
    }

    // Regenerate the embedding when the embedded text changes. A failed
    // regeneration clears the stored embedding so a stale vector never
    // shadows the new content in similarity scans.
    let text_changed =
        embedded_text_changed(&existing, body.title.as_deref(), body.content.as_deref());
    let embedding = if text_changed {
        let title = body.title.as_deref().unwrap_or(&existing.title);
        let content = body.content.as_deref().unwrap_or(&existing.content);
        let vector = state
            .embedder
            .generate(&embedding_text(title, content))
            .await;
        Some((!vector.is_empty()).then(|| encode_embedding(&vector)))
    } else {
        None
    };

    let tm = state
        .db
        .thoughtmarks
        .update(
            id,
            UpdateThoughtmarkRequest {
                title: body.title,
                content: body.content,
                tags: body.tags,
                bin_id: body.bin_id,
                embedding,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Thoughtmark not found".to_string()))?;

    Ok(Json(tm))
}

async fn delete_thoughtmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_thoughtmark(&state, user_id, id).await?;

    if !state.db.thoughtmarks.soft_delete(id).await? {
        // Row exists but is already in the trash.
        return Err(ApiError::NotFound("Thoughtmark not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn restore_thoughtmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let not_restorable = || {
        ApiError::NotFound("Thoughtmark not found or not deleted".to_string())
    };

    let tm = state
        .db
        .thoughtmarks
        .get(id)
        .await?
        .ok_or_else(not_restorable)?;
    if tm.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    if !state.db.thoughtmarks.restore(id).await? {
        return Err(not_restorable());
    }

    let restored = state
        .db
        .thoughtmarks
        .get(id)
        .await?
        .ok_or_else(not_restorable)?;
    Ok(Json(restored))
}

// =============================================================================
// SEARCH
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    /// Comma-separated tag filter; matches thoughtmarks carrying any of them.
    tags: Option<String>,
}

/// Split a comma-separated tag list, dropping empty entries.
fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

async fn search_thoughtmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let tags = params.tags.as_deref().map(parse_tags);
    let results = state
        .db
        .thoughtmarks
        .search(user_id, &query, tags.as_deref())
        .await?;

    Ok(Json(results))
}

// =============================================================================
// AI HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CategorizeBody {
    title: Option<String>,
    content: Option<String>,
}

async fn ai_categorize(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CategorizeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let title = body.title.unwrap_or_default();
    let content = body.content.unwrap_or_default();
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    // The advisor only needs the bare bins; counts are a listing concern.
    let bins: Vec<Bin> = state
        .db
        .bins
        .list_for_user(user_id)
        .await?
        .into_iter()
        .map(|b| Bin {
            id: b.id,
            name: b.name,
            description: b.description,
            color: b.color,
            icon: b.icon,
            sort_order: b.sort_order,
            user_id: b.user_id,
            created_at_utc: b.created_at_utc,
        })
        .collect();

    let suggestions = state.advisor.suggest(&title, &content, &bins).await;

    Ok(Json(serde_json::json!({ "suggestions": suggestions })))
}

#[derive(Debug, Deserialize)]
struct SimilarBody {
    query: Option<String>,
    limit: Option<usize>,
    threshold: Option<f32>,
}

/// A thoughtmark joined with its similarity score for the similar route.
#[derive(Debug, Serialize)]
struct SimilarResult {
    #[serde(flatten)]
    thoughtmark: Thoughtmark,
    similarity: f32,
}

async fn ai_similar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<SimilarBody>,
) -> Result<impl IntoResponse, ApiError> {
    let query = body.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let options = SimilarityOptions::default()
        .with_threshold(body.threshold.unwrap_or(SIMILARITY_THRESHOLD_ROUTE))
        .with_limit(body.limit.unwrap_or(SIMILARITY_LIMIT));

    let thoughtmarks = state.db.thoughtmarks.list_for_user(user_id).await?;
    let candidates: Vec<_> = thoughtmarks
        .iter()
        .filter_map(|tm| tm.similarity_candidate())
        .collect();

    let matches = state.similarity.find_similar(&query, &candidates, options).await;

    // Join scores back to the fetched rows, preserving ranked order.
    let results: Vec<SimilarResult> = matches
        .into_iter()
        .filter_map(|m| {
            thoughtmarks
                .iter()
                .find(|tm| tm.id == m.id)
                .map(|tm| SimilarResult {
                    thoughtmark: tm.clone(),
                    similarity: m.score,
                })
        })
        .collect();

    Ok(Json(serde_json::json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    query: Option<String>,
}

async fn ai_analyze(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<AnalyzeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let query = body.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    if !state.ai_enabled {
        return Err(ApiError::ServiceUnavailable(
            "AI analysis requires OpenAI API key configuration".to_string(),
        ));
    }

    let thoughtmarks = state.db.thoughtmarks.list_for_user(user_id).await?;

    match state.insights.analyze(&query, &thoughtmarks).await {
        Ok(document) => Ok(Json(document)),
        Err(e) => {
            warn!(error_msg = %e, "Insight analysis failed");
            Err(ApiError::Internal(
                "Failed to generate AI analysis. Please try again.".to_string(),
            ))
        }
    }
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(thoughtmarks_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<thoughtmarks_core::Error> for ApiError {
    fn from(err: thoughtmarks_core::Error) -> Self {
        match &err {
            thoughtmarks_core::Error::UserNotFound(_) => {
                ApiError::NotFound("User not found".to_string())
            }
            thoughtmarks_core::Error::BinNotFound(_) => {
                ApiError::NotFound("Bin not found".to_string())
            }
            thoughtmarks_core::Error::ThoughtmarkNotFound(_) => {
                ApiError::NotFound("Thoughtmark not found".to_string())
            }
            thoughtmarks_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            thoughtmarks_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly_msg = if msg.contains("email") {
                        "A user with this email already exists".to_string()
                    } else if msg.contains("firebase_uid") {
                        "A user with this firebase uid already exists".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                if msg.contains("foreign key") {
                    return ApiError::BadRequest(msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
