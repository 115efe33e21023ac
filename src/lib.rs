pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::DocumentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState<S: DocumentStore> {
    pub store: S,
    pub config: Arc<Config>,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Allow the configured base URL, its subdomains and localhost.
fn cors_layer(base_url: String) -> CorsLayer {
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        if o == base_url {
            return true;
        }
        if let Some(idx) = base_url.find("://") {
            let after_scheme = &base_url[idx + 3..];
            let domain = after_scheme.split('/').next().unwrap_or(after_scheme);
            let domain = domain.split(':').next().unwrap_or(domain);
            if o.ends_with(&format!(".{domain}")) {
                return true;
            }
        }
        false
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
        .allow_origin(origin)
}

pub fn router<S: DocumentStore>(state: AppState<S>) -> Router {
    let cors = cors_layer(state.config.app_base_url.clone());

    Router::new()
        .route("/health", get(routes::health::health_check::<S>))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .route("/calendar/days", get(routes::calendar::list_days))
        // Combined menus
        .route(
            "/combined-menus/{id}",
            get(routes::combined_menus::get_combined_menu::<S>)
                .delete(routes::combined_menus::delete_combined_menu::<S>),
        )
        .route("/combined-menus/{id}/cells", put(routes::combined_menus::edit_cell::<S>))
        .route("/combined-menus/{id}/generate", post(routes::combined_menus::generate::<S>))
        .route(
            "/combined-menus/{id}/company-menus",
            get(routes::combined_menus::list_company_menus::<S>),
        )
        .route("/combined-menus/{id}/preview", get(routes::combined_menus::preview::<S>))
        // Structures
        .route("/structures", get(routes::structures::get_structures::<S>))
        .route("/structures/service", put(routes::structures::upsert_service::<S>))
        .route("/structures/meal-plan", put(routes::structures::upsert_meal_plan::<S>))
        .route("/structures/copy", post(routes::structures::copy_structures::<S>))
        // Generated company menus
        .route("/company-menus/{id}", get(routes::company_menus::get_company_menu::<S>))
        .route("/company-menus/{id}/cells", put(routes::company_menus::edit_cell::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
