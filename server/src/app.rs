use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::config;
use crate::routes::{api, map_colors};
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(config::static_dir())
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let app = Router::new()
        .route(
            "/api/map-colors/{variant}",
            get(map_colors::get_map_colors)
                .post(map_colors::post_map_color)
                .delete(map_colors::delete_map_color),
        )
        .route(
            "/api/map-colors/{variant}/conflicts",
            get(map_colors::get_conflicts),
        )
        .route(
            "/api/map-colors/{variant}/rename",
            post(map_colors::rename_region),
        )
        .route(
            "/api/map-colors/{variant}/seed",
            post(map_colors::seed_defaults),
        )
        .route("/api/health", get(api::health))
        .route("/api/metrics", get(api::metrics));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    // Map images are the pristine source for every highlight render.
    if path.starts_with("/maps/") {
        return Some("public, max-age=86400");
    }

    None
}
