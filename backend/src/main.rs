//! PropMaster - Backend Server
//!
//! Property listings, payment tracking, and account administration for a
//! small real-estate team, with access decided by a fixed role table.

use axum::{routing::get, Router};
use shared::access::AccessPolicy;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::middleware::SessionCache;

mod config;
mod error;
mod handlers;
mod middleware;
mod routes;
mod services;

pub use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// Role table and master account, fixed for the life of the process
    pub policy: Arc<AccessPolicy>,
    /// Accounts behind live sessions, re-read after `session.recheck_seconds`
    pub sessions: Arc<SessionCache>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let policy = Arc::new(config.access_policy());
        let sessions = Arc::new(SessionCache::new(Duration::from_secs(
            config.session.recheck_seconds,
        )));
        Self {
            db,
            config: Arc::new(config),
            policy,
            sessions,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propmaster_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting PropMaster Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create application state
    let state = AppState::new(db_pool, config);
    tracing::info!(
        roles = ?state.policy.roles().role_names().collect::<Vec<_>>(),
        default_role = %state.policy.default_role(),
        master_email = %state.policy.master_email(),
        "Access policy loaded"
    );

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "PropMaster API v1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::{encode_session, SessionClaims};
    use crate::services::auth::{sign_body, SIGNATURE_HEADER};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use shared::access::SessionUser;
    use shared::models::{Account, AccountStatus};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state() -> AppState {
        let config = config::test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");
        AppState::new(db, config)
    }

    fn app() -> Router {
        create_app(state())
    }

    /// Router whose session cache already holds `accounts`
    async fn app_for(accounts: &[&Account]) -> Router {
        let state = state();
        for account in accounts {
            state.sessions.remember((*account).clone()).await;
        }
        create_app(state)
    }

    fn token_for(user: &SessionUser) -> String {
        let claims = SessionClaims::for_user(user, 3600);
        encode_session(&claims, "test-session-secret").unwrap()
    }

    fn request(method: Method, uri: &str, user: Option<&SessionUser>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Send a request signed in as `account`, which is known to the router
    async fn send_as(account: &Account, method: Method, uri: &str, body: Option<&str>) -> Response {
        app_for(&[account])
            .await
            .oneshot(request(method, uri, Some(&account.session_user()), body))
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn account(email: &str, role: &str, status: AccountStatus) -> Account {
        let now = chrono::Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            image: None,
            role: Some(role.to_string()),
            status,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn viewer() -> Account {
        account("viewer@example.com", "viewer", AccountStatus::Active)
    }

    fn editor() -> Account {
        account("editor@example.com", "editor", AccountStatus::Active)
    }

    #[tokio::test]
    async fn test_root_banner() {
        let response = app()
            .oneshot(request(Method::GET, "/", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let id = Uuid::new_v4();
        for (method, uri) in [
            (Method::GET, "/api/v1/properties".to_string()),
            (Method::GET, "/api/v1/properties/archive".to_string()),
            (Method::GET, format!("/api/v1/properties/{}/share", id)),
            (Method::GET, "/api/v1/finances".to_string()),
            (Method::GET, "/api/v1/finances/export".to_string()),
            (Method::GET, "/api/v1/admin/users".to_string()),
            (Method::GET, "/api/v1/auth/session".to_string()),
        ] {
            let response = app()
                .oneshot(request(method.clone(), &uri, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_anonymous_rejected_before_request_is_parsed() {
        for (method, uri, body) in [
            (Method::POST, "/api/v1/properties", Some(r#"{"nope": 1}"#)),
            (Method::GET, "/api/v1/properties/not-a-uuid", None),
            (Method::GET, "/api/v1/finances?start_date=garbage", None),
            (Method::POST, "/api/v1/finances", Some("{}")),
        ] {
            let response = app()
                .oneshot(request(method.clone(), uri, None, body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            let body = json_body(response).await;
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/properties")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_token_without_account_rejected() {
        let anonymous = SessionUser::new("editor@example.com").with_role("editor");
        let response = app()
            .oneshot(request(Method::GET, "/api/v1/auth/session", Some(&anonymous), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_suspended_account_token_rejected() {
        let suspended = account("agent@example.com", "editor", AccountStatus::Suspended);

        for (method, uri) in [
            (Method::GET, "/api/v1/auth/session"),
            (Method::GET, "/api/v1/finances"),
            (Method::POST, "/api/v1/properties"),
        ] {
            let response = send_as(&suspended, method.clone(), uri, Some(r#"{"name": "Lake House"}"#)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
            let body = json_body(response).await;
            assert_eq!(body["error"]["message"], "This account has been suspended");
        }
    }

    #[tokio::test]
    async fn test_stored_role_replaces_token_role() {
        let issued_as_editor = editor();
        let mut demoted = issued_as_editor.clone();
        demoted.role = Some("viewer".to_string());

        let token_user = issued_as_editor.session_user();
        let session = app_for(&[&demoted])
            .await
            .oneshot(request(Method::GET, "/api/v1/auth/session", Some(&token_user), None))
            .await
            .unwrap();
        assert_eq!(json_body(session).await["role"], "viewer");

        let create = app_for(&[&demoted])
            .await
            .oneshot(request(
                Method::POST,
                "/api/v1/properties",
                Some(&token_user),
                Some(r#"{"name": "Lake House"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(create.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_viewer_cannot_manage_users() {
        let response = send_as(&viewer(), Method::GET, "/api/v1/admin/users", None).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_property() {
        let response = send_as(
            &viewer(),
            Method::POST,
            "/api/v1/properties",
            Some(r#"{"name": "Lake House"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_editor_cannot_set_private() {
        let response = send_as(
            &editor(),
            Method::POST,
            "/api/v1/properties",
            Some(r#"{"name": "Lake House", "status": "private"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_property_name_required() {
        let response = send_as(
            &editor(),
            Method::POST,
            "/api/v1/properties",
            Some(r#"{"name": "   "}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["field"], "name");
    }

    #[tokio::test]
    async fn test_editor_cannot_reach_archive() {
        let editor = editor();
        for (method, uri, body) in [
            (Method::GET, "/api/v1/properties/archive", None),
            (Method::GET, "/api/v1/properties/archive/stats", None),
            (
                Method::POST,
                "/api/v1/properties/bulk",
                Some(r#"{"action": "archive", "property_ids": []}"#),
            ),
        ] {
            let response = send_as(&editor, method.clone(), uri, body).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_editor_cannot_delete() {
        let editor = editor();
        let id = Uuid::new_v4();
        for uri in [
            format!("/api/v1/properties/{}", id),
            format!("/api/v1/finances/{}", id),
        ] {
            let response = send_as(&editor, Method::DELETE, &uri, None).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_viewer_has_no_finance_access() {
        let response = send_as(&viewer(), Method::GET, "/api/v1/finances", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_viewer_cannot_share_property() {
        let viewer = viewer();
        let id = Uuid::new_v4();
        for (method, uri, body) in [
            (Method::POST, format!("/api/v1/properties/{}/share", id), Some("{}")),
            (Method::GET, format!("/api/v1/properties/{}/share", id), None),
            (
                Method::DELETE,
                format!("/api/v1/properties/{}/share/{}", id, Uuid::new_v4()),
                None,
            ),
        ] {
            let response = send_as(&viewer, method.clone(), &uri, body).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_share_input_checked_before_lookup() {
        let uri = format!("/api/v1/properties/{}/share", Uuid::new_v4());
        let response = send_as(
            &editor(),
            Method::POST,
            &uri,
            Some(r#"{"client_email": "not-an-email"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["field"], "client_email");
    }

    #[tokio::test]
    async fn test_session_reports_role_and_capabilities() {
        let response = send_as(&editor(), Method::GET, "/api/v1/auth/session", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["role"], "editor");
        assert_eq!(
            body["capabilities"],
            serde_json::json!([
                "manage_own_finances",
                "manage_properties",
                "view_available_properties"
            ])
        );
    }

    #[tokio::test]
    async fn test_master_email_overrides_stored_role() {
        let owner = account("owner@propmaster.test", "viewer", AccountStatus::Active);
        let response = send_as(&owner, Method::GET, "/api/v1/auth/session", None).await;

        let body = json_body(response).await;
        assert_eq!(body["role"], "master");
        assert_eq!(body["capabilities"].as_array().map(Vec::len), Some(7));
    }

    #[tokio::test]
    async fn test_unknown_stored_role_falls_back_to_viewer() {
        let user = account("someone@example.com", "superuser", AccountStatus::Active);
        let response = send_as(&user, Method::GET, "/api/v1/auth/session", None).await;

        let body = json_body(response).await;
        assert_eq!(body["role"], "viewer");
    }

    #[tokio::test]
    async fn test_pending_account_keeps_access() {
        let pending = account("new@example.com", "editor", AccountStatus::Pending);
        let response = send_as(&pending, Method::GET, "/api/v1/auth/session", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_callback_rejects_bad_signature() {
        let body = r#"{"email": "owner@propmaster.test", "name": "Owner"}"#;
        let forged = sign_body("not-the-bridge-secret", body.as_bytes()).unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/auth/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(SIGNATURE_HEADER, forged)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_rejects_unsigned_request() {
        let response = app()
            .oneshot(request(
                Method::POST,
                "/api/v1/auth/callback",
                None,
                Some(r#"{"email": "agent@example.com"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signed_callback_with_bad_email_is_rejected() {
        let body = r#"{"email": "not-an-email"}"#;
        let signature = sign_body("test-bridge-secret", body.as_bytes()).unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/auth/callback")
                    .header(SIGNATURE_HEADER, signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
