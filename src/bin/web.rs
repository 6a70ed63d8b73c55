use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use orbital_density::config::{DEFAULT_GRID_SIZE, DEFAULT_L, DEFAULT_M, DEFAULT_MAX_RADIUS, DEFAULT_N};
use orbital_density::export::{write_png, FieldDocument};
use orbital_density::logging::setup_logging;
use orbital_density::{DensityEngine, DensityError, DensityField, GridSpec, HydrogenEngine, QuantumNumbers};

const MAX_GRID_SIZE: usize = 1024;
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

type SharedEngine = Arc<dyn DensityEngine>;

/// Engines the handlers choose between; `?parallel=true` picks `parallel`.
#[derive(Clone)]
struct Engines {
    sequential: SharedEngine,
    parallel: SharedEngine,
}

impl Engines {
    fn hydrogen() -> Self {
        Engines {
            sequential: Arc::new(HydrogenEngine::sequential()),
            parallel: Arc::new(HydrogenEngine::parallel()),
        }
    }

    fn pick(&self, parallel: bool) -> SharedEngine {
        if parallel {
            Arc::clone(&self.parallel)
        } else {
            Arc::clone(&self.sequential)
        }
    }
}

#[derive(Deserialize)]
struct DensityQuery {
    n: Option<u32>,
    l: Option<u32>,
    m: Option<i32>,
    size: Option<usize>,
    max: Option<f64>,
    parallel: Option<bool>,
}

impl DensityQuery {
    fn resolve(&self) -> Result<(QuantumNumbers, GridSpec), DensityError> {
        let state = QuantumNumbers::new(
            self.n.unwrap_or(DEFAULT_N),
            self.l.unwrap_or(DEFAULT_L),
            self.m.unwrap_or(DEFAULT_M),
        )?;
        let size = self.size.unwrap_or(DEFAULT_GRID_SIZE);
        if size > MAX_GRID_SIZE {
            return Err(DensityError::InvalidParameter(format!(
                "grid size {size} exceeds the limit of {MAX_GRID_SIZE}"
            )));
        }
        let grid = GridSpec::new(size, self.max.unwrap_or(DEFAULT_MAX_RADIUS))?;
        Ok((state, grid))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct ApiError(DensityError);

impl From<DensityError> for ApiError {
    fn from(e: DensityError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            DensityError::Domain { .. } | DensityError::NonFinite { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        } else {
            warn!("rejected request: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn compute(engines: &Engines, q: &DensityQuery) -> Result<DensityField, ApiError> {
    let (state, grid) = q.resolve()?;
    let engine = engines.pick(q.parallel.unwrap_or(false));

    let field = tokio::task::spawn_blocking(move || engine.density_field(state, grid))
        .await
        .map_err(|e| DensityError::Config(format!("worker task failed: {e}")))??;
    Ok(field)
}

async fn density(
    State(engines): State<Engines>,
    Query(q): Query<DensityQuery>,
) -> Result<Response, ApiError> {
    let field = compute(&engines, &q).await?;
    Ok(Json(FieldDocument::from(&field)).into_response())
}

async fn heatmap(
    State(engines): State<Engines>,
    Query(q): Query<DensityQuery>,
) -> Result<Response, ApiError> {
    let field = compute(&engines, &q).await?;
    let mut png = Cursor::new(Vec::new());
    write_png(&field, &mut png)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png.into_inner()).into_response())
}

async fn health() -> &'static str {
    "ok"
}

fn app(engines: Engines) -> Router {
    Router::new()
        .route("/density", get(density))
        .route("/heatmap", get(heatmap))
        .route("/health", get(health))
        .with_state(engines)
}

#[tokio::main]
async fn main() {
    // Show the listening address unless RUST_LOG says otherwise.
    let verbosity = if std::env::var_os("RUST_LOG").is_some() { 0 } else { 1 };
    setup_logging(verbosity, false);

    let addr_str = std::env::var("ORBITAL_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = match addr_str.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid ORBITAL_WEB_ADDR '{addr_str}': {e}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!("Serving on http://{addr}");
    if let Err(e) = axum::serve(listener, app(Engines::hydrogen())).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(n: u32, l: u32, m: i32, size: usize) -> DensityQuery {
        DensityQuery {
            n: Some(n),
            l: Some(l),
            m: Some(m),
            size: Some(size),
            max: None,
            parallel: None,
        }
    }

    #[test]
    fn query_defaults_match_reference_run() {
        let q = DensityQuery {
            n: None,
            l: None,
            m: None,
            size: None,
            max: None,
            parallel: None,
        };
        let (state, grid) = q.resolve().unwrap();
        assert_eq!((state.n, state.l, state.m), (2, 1, 0));
        assert_eq!((grid.size, grid.max_radius), (30, 1.0));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert!(matches!(
            query(1, 0, 0, MAX_GRID_SIZE + 1).resolve(),
            Err(DensityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn error_status_codes() {
        let bad = ApiError(DensityError::InvalidParameter("n".to_string())).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        let domain = ApiError(DensityError::Domain { l: 2, m: 2, k: 2 }).into_response();
        assert_eq!(domain.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn computes_field_off_the_runtime() {
        let engines = Engines::hydrogen();
        let field = compute(&engines, &query(2, 1, 0, 8)).await.ok().unwrap();
        assert_eq!(field.len(), 64);

        let mut q = query(2, 1, 0, 8);
        q.parallel = Some(true);
        let par = compute(&engines, &q).await.ok().unwrap();
        assert_eq!(field, par);
    }

    /// Serves a constant field so tests can tell which engine answered.
    struct FixedEngine(f64);

    impl DensityEngine for FixedEngine {
        fn density_field(&self, state: QuantumNumbers, grid: GridSpec) -> Result<DensityField, DensityError> {
            DensityField::from_values(state, grid, vec![self.0; grid.cell_count()])
        }
    }

    #[tokio::test]
    async fn parallel_flag_uses_the_injected_engine() {
        let engines = Engines {
            sequential: Arc::new(FixedEngine(1.0)),
            parallel: Arc::new(FixedEngine(2.0)),
        };
        let mut q = query(2, 1, 0, 4);
        let seq = compute(&engines, &q).await.ok().unwrap();
        assert!(seq.values().iter().all(|&v| v == 1.0));

        q.parallel = Some(true);
        let par = compute(&engines, &q).await.ok().unwrap();
        assert!(par.values().iter().all(|&v| v == 2.0));
    }
}
