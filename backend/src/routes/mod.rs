//! Route definitions for the PropMaster platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - property listings and archive
        .nest("/properties", property_routes(state.clone()))
        // Client sharing links (public)
        .nest("/share", share_routes())
        // Protected routes - finance records
        .nest("/finances", finance_routes(state.clone()))
        // Protected routes - account administration
        .nest("/admin", admin_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Signed callback from the OAuth bridge (public)
        .route("/callback", post(handlers::sign_in_callback))
        .route(
            "/session",
            get(handlers::get_session)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// Property routes (protected)
fn property_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_properties).post(handlers::create_property),
        )
        .route("/archive", get(handlers::list_archived))
        .route("/archive/stats", get(handlers::get_archive_stats))
        .route("/bulk", post(handlers::bulk_update))
        .route(
            "/:property_id",
            get(handlers::get_property)
                .put(handlers::update_property)
                .delete(handlers::delete_property),
        )
        .route(
            "/:property_id/share",
            get(handlers::list_shares).post(handlers::create_share),
        )
        .route(
            "/:property_id/share/:share_id",
            delete(handlers::revoke_share),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sharing link routes (public, the token is the credential)
fn share_routes() -> Router<AppState> {
    Router::new().route("/:token", get(handlers::view_shared_property))
}

/// Finance routes (protected)
fn finance_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_finances).post(handlers::create_finance))
        .route("/export", get(handlers::export_finances))
        .route(
            "/:finance_id",
            get(handlers::get_finance)
                .put(handlers::update_finance)
                .delete(handlers::delete_finance),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Account administration routes (protected)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/:user_id", put(handlers::update_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
