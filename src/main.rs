// ABOUTME: Main entry point for the content block service with bearer-token auth
// ABOUTME: Sets up the web server, routes, and initialization logic

use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

mod auth;
mod entities;
mod error;
mod middleware;
mod migration;
mod storage;
mod types;

#[cfg(test)]
mod integration_tests;

use auth::{AuthState, Claims};
use error::AppError;
use storage::Storage;
use types::*;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub storage: Arc<Storage>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:blockforge.db?mode=rwc".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let secret = std::env::var("AUTH_SECRET").context("AUTH_SECRET must be set")?;

    // Initialize storage (connects and runs migrations)
    let storage = Arc::new(Storage::new(&database_url).await?);
    let auth = AuthState::new(&secret);
    let state = AppState { auth, storage };

    let app = app(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "content block service listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the application router. Every block route sits behind the auth
/// middleware; unauthenticated requests never reach the repository.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/blocks", post(create_block))
        .route("/blocks/query", post(query_blocks))
        .route(
            "/blocks/:id",
            get(get_block).put(update_block).delete(delete_block),
        )
        .route("/blocks/:id/versions", get(get_version_history))
        .route("/blocks/:id/tree", get(get_block_tree))
        .route("/blocks/:id/references", post(create_reference))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn create_block(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBlockRequest>,
) -> Result<Json<ContentBlock>, AppError> {
    let block = state.storage.create_block(&req, &claims.sub).await?;
    Ok(Json(block))
}

async fn get_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentBlock>, AppError> {
    match state.storage.find_by_id(id).await? {
        Some(block) => Ok(Json(block)),
        None => Err(AppError::NotFound(format!("block {id}"))),
    }
}

async fn update_block(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBlockRequest>,
) -> Result<Json<ContentBlock>, AppError> {
    let block = state
        .storage
        .update_block(id, req.updates, &claims.sub, req.comment)
        .await?;
    Ok(Json(block))
}

async fn query_blocks(
    State(state): State<AppState>,
    Json(query): Json<BlockQuery>,
) -> Result<Json<BlockListResult>, AppError> {
    let result = state.storage.find_blocks(&query).await?;
    Ok(Json(result))
}

async fn get_version_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BlockVersion>>, AppError> {
    let versions = state.storage.get_version_history(id).await?;
    Ok(Json(versions))
}

async fn get_block_tree(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentBlock>, AppError> {
    let tree = state.storage.get_block_tree(id).await?;
    Ok(Json(tree))
}

async fn create_reference(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateReferenceRequest>,
) -> Result<Json<BlockReference>, AppError> {
    let reference = state
        .storage
        .create_reference(id, req.ref_type, &claims.sub)
        .await?;
    Ok(Json(reference))
}

async fn delete_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.storage.delete_block(id).await?;
    Ok(Json(serde_json::json!({"success": true})))
}
