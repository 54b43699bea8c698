use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::Catalog;
use cookbook_core::models::{
    Difficulty, NewRecipe, Recipe, RecipeFilter, validate_new_recipe, validate_rating,
};
use cookbook_core::service::{ExportFormat, RecipeCatalog, SignInRequired};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    catalog: Arc<Mutex<Catalog>>,
    api_key: Option<String>,
}

impl AppState {
    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct FilterQuery {
    category: Option<String>,
    difficulty: Option<String>,
    #[serde(default)]
    bookmarked: bool,
}

impl FilterQuery {
    fn to_filter(&self) -> Result<RecipeFilter, ApiError> {
        RecipeFilter::parse(
            self.category.as_deref(),
            self.difficulty.as_deref(),
            self.bookmarked,
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))
    }
}

#[derive(Deserialize)]
struct CreateRecipeRequest {
    title: String,
    description: String,
    image: Option<String>,
    #[serde(default)]
    prep_time: u32,
    #[serde(default)]
    cook_time: u32,
    servings: Option<u32>,
    difficulty: Option<String>,
    category: String,
    ingredients: Vec<String>,
    instructions: Vec<String>,
}

#[derive(Deserialize)]
struct RateRequest {
    rating: i64,
}

#[derive(Deserialize)]
struct ImportQuery {
    #[serde(default)]
    dry_run: bool,
}

#[derive(Serialize)]
struct RatingResponse {
    recipe_id: String,
    rating: f64,
    rating_count: u32,
    user_rating: Option<u8>,
}

#[derive(Serialize)]
struct BookmarkResponse {
    recipe_id: String,
    bookmarked: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SignInRequired>() {
            Some(sign_in) => Self::Unauthorized(sign_in.to_string()),
            None => Self::Internal(err),
        }
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Recipe '{id}' not found"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filter = query.to_filter()?;
    let recipes = state
        .catalog()
        .filtered(&filter)
        .context("failed to list recipes")?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let difficulty: Difficulty = req
        .difficulty
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?
        .unwrap_or_default();

    let new = validate_new_recipe(&NewRecipe {
        title: req.title,
        description: req.description,
        image: req.image,
        prep_time: req.prep_time,
        cook_time: req.cook_time,
        servings: req.servings.unwrap_or(cookbook_core::models::DEFAULT_SERVINGS),
        difficulty,
        category: req.category,
        ingredients: req.ingredients,
        instructions: req.instructions,
    })
    .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let recipe = state
        .catalog()
        .create_recipe(&new)
        .context("failed to create recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = state
        .catalog()
        .find_recipe(&id)
        .context("failed to load recipe")?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(recipe))
}

async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RatingResponse>, ApiError> {
    let catalog = state.catalog();
    let recipe = catalog
        .find_recipe(&id)
        .context("failed to load recipe")?
        .ok_or_else(|| not_found(&id))?;
    let user_rating = catalog.user_rating(&id).context("failed to load rating")?;
    Ok(Json(RatingResponse {
        recipe_id: recipe.id,
        rating: recipe.rating,
        rating_count: recipe.rating_count,
        user_rating,
    }))
}

async fn rate_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RateRequest>,
) -> Result<Json<RatingResponse>, ApiError> {
    let value = validate_rating(req.rating).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let mut catalog = state.catalog();
    if catalog
        .find_recipe(&id)
        .context("failed to load recipe")?
        .is_none()
    {
        return Err(not_found(&id));
    }
    let summary = catalog
        .rate_recipe(&id, value)
        .context("failed to save rating")?;
    Ok(Json(RatingResponse {
        recipe_id: id,
        rating: summary.mean,
        rating_count: summary.count,
        user_rating: Some(value),
    }))
}

async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookmarkResponse>, ApiError> {
    let mut catalog = state.catalog();
    if catalog
        .find_recipe(&id)
        .context("failed to load recipe")?
        .is_none()
    {
        return Err(not_found(&id));
    }
    let bookmarked = catalog
        .toggle_bookmark(&id)
        .context("failed to update bookmark")?;
    Ok(Json(BookmarkResponse {
        recipe_id: id,
        bookmarked,
    }))
}

async fn list_bookmarks(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state
        .catalog()
        .bookmarked()
        .context("failed to list bookmarks")?;
    Ok(Json(recipes))
}

async fn import_csv(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let summary = state
        .catalog()
        .import_csv(&body, query.dry_run)
        .context("failed to import recipes")?
        .ok_or_else(|| ApiError::BadRequest("No recipes found".to_string()))?;

    let status = if query.dry_run {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(serde_json::json!({
            "dry_run": query.dry_run,
            "rows_parsed": summary.rows_parsed,
            "recipes_imported": summary.recipes_imported,
        })),
    ))
}

async fn export_recipes(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = format
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let filter = query.to_filter()?;

    let content = state
        .catalog()
        .export(format, &filter)
        .context("failed to export recipes")?
        .ok_or_else(|| ApiError::NotFound("No recipes to export".to_string()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                format!("{}; charset=utf-8", format.mime()),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.filename()),
            ),
        ],
        content,
    )
        .into_response())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/{id}", get(get_recipe))
        .route(
            "/api/recipes/{id}/rating",
            get(get_rating).put(rate_recipe),
        )
        .route("/api/recipes/{id}/bookmark", post(toggle_bookmark))
        .route("/api/bookmarks", get(list_bookmarks))
        .route("/api/import/csv", post(import_csv))
        .route("/api/export/{format}", get(export_recipes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key, for the startup banner.
fn key_preview(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    catalog: Catalog,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        catalog: Arc::new(Mutex::new(catalog)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            key_preview(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
        if bind != "127.0.0.1" && bind != "localhost" {
            eprintln!(
                "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
            );
        }
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(bind, port, auth = api_key.is_some(), "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
