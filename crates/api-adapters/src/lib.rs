//! # api-adapters
//!
//! The web routing and orchestration layer. Routes mirror the public store API
//! (`/api/Games`, `/api/Purchases`) and are served by axum.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;

#[cfg(feature = "web-axum")]
pub use web::*;

#[cfg(feature = "web-axum")]
mod web {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceBuilder;
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
    use tower_http::trace::TraceLayer;

    use domains::{GameRepository, PurchaseRepository};
    use services::{GameService, PurchaseService};

    use crate::handlers::{self, games, purchases};
    use crate::middleware::{self, REQUEST_ID_HEADER};

    /// State shared across all request handlers.
    #[derive(Clone)]
    pub struct AppState {
        pub games: Arc<GameService>,
        pub purchases: Arc<PurchaseService>,
    }

    impl AppState {
        pub fn new(
            game_repo: Arc<dyn GameRepository>,
            purchase_repo: Arc<dyn PurchaseRepository>,
        ) -> Self {
            Self {
                games: Arc::new(GameService::new(game_repo, purchase_repo.clone())),
                purchases: Arc::new(PurchaseService::new(purchase_repo)),
            }
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct RouterOptions {
        pub allow_any_origin: bool,
    }

    /// Configures the routes for the store API.
    pub fn build_router(state: AppState, options: RouterOptions) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/Games", get(games::list_games).post(games::create_game))
            .route("/api/Games/Spotlights", get(games::spotlights))
            .route("/api/Games/Filters", post(games::filter_games))
            .route("/api/Games/User", post(games::owned_games))
            .route("/api/Games/User/Uploaded", post(games::uploaded_games))
            .route(
                "/api/Games/{id}",
                get(games::get_game)
                    .put(games::replace_game)
                    .delete(games::delete_game),
            )
            .route(
                "/api/Purchases",
                get(purchases::list_purchases).post(purchases::create_purchase),
            )
            .route(
                "/api/Purchases/{id}",
                get(purchases::get_purchase)
                    .put(purchases::replace_purchase)
                    .delete(purchases::delete_purchase),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span::<Body>))
                    .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                    .layer(middleware::cors_policy(options.allow_any_origin)),
            )
            .with_state(state)
    }
}
