use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use service_api::{
    check_inventory, generate_plan, part_locations, submit_sourcing_request, ApiContext,
    InventoryDb, PlanGenerator,
};
use shared::{
    domain::SourcingRequest,
    error::{ApiError, ErrorCode},
    protocol::{
        CheckInventoryRequest, CheckInventoryResponse, GeneratePlanRequest, PartLocationsQuery,
        SourcingAck, CHECK_INVENTORY_ROUTE, GENERATE_PLAN_ROUTE, PART_LOCATIONS_ROUTE,
        SOURCING_REQUESTS_ROUTE,
    },
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod gemini;

use config::{load_settings, normalize_endpoint, Settings};
use gemini::{GeminiConfig, GeminiPlanGenerator};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type ApiRejection = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings();
    let inventory = load_inventory(Path::new(&settings.inventory_path));
    let api = ApiContext {
        inventory: Arc::new(inventory),
        generator: build_generator(&settings),
        factory_locations: settings.factory_locations.clone(),
    };

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// A missing or broken inventory file leaves the service up with no stock.
fn load_inventory(path: &Path) -> InventoryDb {
    match InventoryDb::load(path) {
        Ok(db) => {
            info!(path = %path.display(), records = db.len(), "inventory loaded");
            db
        }
        Err(error) => {
            error!(path = %path.display(), %error, "inventory unavailable; serving empty stock");
            InventoryDb::default()
        }
    }
}

fn build_generator(settings: &Settings) -> Option<Arc<dyn PlanGenerator>> {
    let Some(api_key) = settings.gemini_api_key.clone() else {
        warn!("GOOGLE_API_KEY not set; plan generation disabled");
        return None;
    };
    let generator = normalize_endpoint(&settings.gemini_endpoint).and_then(|endpoint| {
        GeminiPlanGenerator::new(GeminiConfig {
            api_key,
            model: settings.gemini_model.clone(),
            endpoint,
            timeout: settings.gemini_timeout,
        })
    });
    match generator {
        Ok(generator) => {
            info!(model = %settings.gemini_model, "plan generator configured");
            Some(Arc::new(generator))
        }
        Err(error) => {
            error!(%error, "failed to configure plan generator");
            None
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(GENERATE_PLAN_ROUTE, post(http_generate_plan))
        .route(CHECK_INVENTORY_ROUTE, post(http_check_inventory))
        .route(PART_LOCATIONS_ROUTE, get(http_part_locations))
        .route(SOURCING_REQUESTS_ROUTE, post(http_submit_sourcing_request))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Unavailable | ErrorCode::Upstream | ErrorCode::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reject(error: ApiError) -> ApiRejection {
    (status_for(error.code), Json(error))
}

/// Unreadable or incomplete input is answered with a JSON validation error.
fn bad_input(message: String) -> ApiRejection {
    reject(ApiError::new(ErrorCode::Validation, message))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiRejection> {
    body.map(|Json(value)| value)
        .map_err(|rejection| bad_input(rejection.body_text()))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_generate_plan(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GeneratePlanRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiRejection> {
    let req = json_body(body)?;
    let plan = generate_plan(&state.api, &req).await.map_err(|e| {
        warn!(code = ?e.code, message = %e.message, "plan generation failed");
        reject(e)
    })?;
    Ok(Json(plan))
}

async fn http_check_inventory(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CheckInventoryRequest>, JsonRejection>,
) -> Result<Json<CheckInventoryResponse>, ApiRejection> {
    let req = json_body(body)?;
    Ok(Json(check_inventory(&state.api, &req)))
}

async fn http_part_locations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PartLocationsQuery>, QueryRejection>,
) -> Result<Response, ApiRejection> {
    let Query(query) = query.map_err(|rejection| bad_input(rejection.body_text()))?;
    let found = part_locations(&state.api, &query.part_id).map_err(reject)?;
    let status = if found.locations.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Json(found)).into_response())
}

async fn http_submit_sourcing_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SourcingRequest>, JsonRejection>,
) -> Result<Json<SourcingAck>, ApiRejection> {
    let req = json_body(body)?;
    let ack = submit_sourcing_request(&state.api, &req).map_err(|e| match e.code {
        ErrorCode::Validation => (StatusCode::UNPROCESSABLE_ENTITY, Json(e)),
        _ => reject(e),
    })?;
    Ok(Json(ack))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
