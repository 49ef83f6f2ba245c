use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// - `/pagetally/v1/*` is called from third-party pages, so it gets open CORS
///   (any origin, no credentials). Origin checking is done per property by
///   the ingestor instead.
/// - `/api/*` is the management and report API, guarded by
///   [`auth::require_admin`].
/// - `TraceLayer` wraps everything for structured request logging.
pub fn build_app(state: Arc<AppState>) -> Router {
    let tracking = Router::new()
        .route(
            "/pagetally/v1/tracker.js",
            get(routes::tracker_script::tracker_script),
        )
        .route("/pagetally/v1/track", post(routes::track::track))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN]),
        );

    let api = Router::new()
        .route(
            "/api/properties",
            get(routes::properties::list_properties).post(routes::properties::create_property),
        )
        .route(
            "/api/properties/{id}",
            get(routes::properties::get_property)
                .put(routes::properties::update_property)
                .delete(routes::properties::delete_property),
        )
        .route(
            "/api/properties/{id}/reports",
            get(routes::reports::dashboard),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(tracking)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
