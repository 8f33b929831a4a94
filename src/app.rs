use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::etudiants::{self, SharedStore};

/// Build the full application router around a store handle. Pure constructor:
/// nothing here binds a port, so tests can drive the router directly.
pub fn app(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/etudiants", etudiant_routes())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Literal segments are registered ahead of the generic `/:id` group; a
/// request for `/search` or `/disabled` must never be read as an id.
fn etudiant_routes() -> Router<SharedStore> {
    Router::new()
        .route("/", get(etudiants::list).post(etudiants::create))
        .route("/filiere/:filiere", get(etudiants::by_filiere))
        .route("/search", get(etudiants::search))
        .route("/search/advanced", get(etudiants::advanced_search))
        .route("/disabled", get(etudiants::disabled))
        .route(
            "/:id",
            get(etudiants::get_by_id)
                .put(etudiants::update)
                .delete(etudiants::delete),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "message": "API Gestion Étudiants",
        "version": version,
        "endpoints": {
            "liste": "GET /api/etudiants",
            "creer": "POST /api/etudiants",
            "voir": "GET /api/etudiants/:id",
            "modifier": "PUT /api/etudiants/:id",
            "supprimer": "DELETE /api/etudiants/:id",
            "parFiliere": "GET /api/etudiants/filiere/:filiere",
            "recherche": "GET /api/etudiants/search?q=",
            "rechercheAvancee": "GET /api/etudiants/search/advanced",
            "desactives": "GET /api/etudiants/disabled"
        }
    }))
}

async fn health(State(store): State<SharedStore>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "OK",
                "timestamp": now
            })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "status": "degraded",
                "timestamp": now,
                "error": err.to_string()
            })),
        ),
    }
}

/// Catch-all for unmatched routes.
async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} non trouvée", uri)
        })),
    )
}
