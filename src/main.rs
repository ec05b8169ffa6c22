use axum::{extract::DefaultBodyLimit, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod services;
mod storage;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();
    tracing::info!("Starting HRM API in {:?} mode", config.environment);

    // Apply pending migrations when the database is reachable. The server
    // still starts without one; /health reports the degraded state.
    match crate::database::manager::DatabaseManager::migrate().await {
        Ok(()) => tracing::info!("Database migrations applied"),
        Err(e) => tracing::warn!("Skipping migrations, database unavailable: {}", e),
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("HRM_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("HRM API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes())
        // Uploads are buffered; the limit leaves headroom over the blob cap
        // for multipart framing and text fields
        .layer(DefaultBodyLimit::max(config::config().storage.max_upload_bytes + 64 * 1024))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::auth;

    Router::new().route("/api/auth/login", post(auth::login))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(session_routes())
        .merge(user_routes())
        .merge(branch_routes())
        .merge(employee_routes())
        .merge(document_routes())
        .merge(branch_document_routes())
        .route_layer(axum::middleware::from_fn(middleware::auth::jwt_auth_middleware))
}

fn session_routes() -> Router {
    use axum::routing::post;
    use handlers::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
}

fn user_routes() -> Router {
    use handlers::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", get(users::get).put(users::update).delete(users::delete))
}

fn branch_routes() -> Router {
    use handlers::branches;

    Router::new()
        .route("/api/branches", get(branches::list).post(branches::create))
        .route(
            "/api/branches/:id",
            get(branches::get).put(branches::update).delete(branches::delete),
        )
}

fn employee_routes() -> Router {
    use handlers::employees;

    Router::new()
        .route("/api/employees", get(employees::list).post(employees::create))
        .route(
            "/api/employees/:id",
            get(employees::get).put(employees::update).delete(employees::delete),
        )
}

fn document_routes() -> Router {
    use axum::routing::post;
    use handlers::documents;

    Router::new()
        .route("/api/documents", get(documents::list).post(documents::upload))
        .route(
            "/api/documents/:id",
            get(documents::get).put(documents::update).delete(documents::delete),
        )
        .route("/api/documents/:id/download", get(documents::download))
        .route("/api/documents/:id/verify", post(documents::verify))
}

fn branch_document_routes() -> Router {
    use axum::routing::post;
    use handlers::branch_documents;

    Router::new()
        .route(
            "/api/branch-documents",
            get(branch_documents::list).post(branch_documents::upload),
        )
        .route(
            "/api/branch-documents/:id",
            get(branch_documents::get)
                .put(branch_documents::update)
                .delete(branch_documents::delete),
        )
        .route("/api/branch-documents/:id/download", get(branch_documents::download))
        .route("/api/branch-documents/:id/verify", post(branch_documents::verify))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "HRM API (Rust)",
            "version": version,
            "description": "Role-based HR record management API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/api/auth/login (public - token acquisition)",
                "auth": "/api/auth/* (protected - session)",
                "users": "/api/users[/:id] (protected - main manager)",
                "branches": "/api/branches[/:id] (protected)",
                "employees": "/api/employees[/:id] (protected)",
                "documents": "/api/documents[/:id] (protected)",
                "branch_documents": "/api/branch-documents[/:id] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
