use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use navi::{personas, Upstream};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(upstream: impl Upstream + 'static) -> Self {
        Self {
            upstream: Arc::new(upstream),
        }
    }
}

/// One `POST` route per chat flow, a health check, and optionally the built
/// frontend served from `static_dir`.
pub fn app(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        // allow requests from any origin
        .allow_origin(Any);

    let mut router = Router::new().route("/healthz", get(routes::health));

    for persona in personas::PERSONAS.iter() {
        router = router.route(
            &persona.flow.endpoint(),
            post(move |state: State<AppState>, body: Bytes| {
                routes::chat(state, persona, body)
            }),
        );
    }

    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    router.layer(cors).with_state(state)
}
