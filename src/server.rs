use crate::config::RosterConfig;
use crate::data::{RosterInput, RosterOutput};
use crate::engine::HighsEngine;
use crate::solver;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct AppState {
    defaults: Arc<RosterConfig>,
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(input): Json<RosterInput>,
) -> Result<Json<RosterOutput>, (StatusCode, String)> {
    let defaults = *state.defaults;
    // The solve blocks for up to the time limit.
    let result = tokio::task::spawn_blocking(move || {
        solver::solve(&input, &defaults, &HighsEngine::default())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match result {
        Ok(output) => Ok(Json(output)),
        Err(e) if e.is_input_error() => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("{e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub fn router(defaults: RosterConfig) -> Router {
    Router::new()
        .route("/v1/roster/solve", post(solve_handler))
        .with_state(AppState {
            defaults: Arc::new(defaults),
        })
}

pub async fn run_server(addr: SocketAddr, defaults: RosterConfig) -> anyhow::Result<()> {
    let app = router(defaults);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
