use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::state::AppState;

/// Build the full HTTP application around a prepared state
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Admin only
        .merge(elevated_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/refresh", post(auth::refresh_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{activity, auth, customers, dashboard, leads, tasks};

    Router::new()
        // Session
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/logout", post(auth::logout_post))
        // Leads
        .route("/api/leads", get(leads::leads_get).post(leads::leads_post))
        .route(
            "/api/leads/:id",
            get(leads::lead_get).patch(leads::lead_patch).delete(leads::lead_delete),
        )
        .route("/api/leads/:id/convert", post(leads::convert_post))
        .route("/api/leads/:id/restore", post(leads::restore_post))
        // Customers
        .route("/api/customers", get(customers::customers_get).post(customers::customers_post))
        .route(
            "/api/customers/:id",
            get(customers::customer_get)
                .patch(customers::customer_patch)
                .delete(customers::customer_delete),
        )
        .route("/api/customers/:id/notes", post(customers::note_post))
        // Tasks
        .route("/api/tasks", get(tasks::tasks_get).post(tasks::tasks_post))
        .route(
            "/api/tasks/:id",
            get(tasks::task_get).patch(tasks::task_patch).delete(tasks::task_delete),
        )
        // Aggregates
        .route("/api/dashboard", get(dashboard::dashboard_get))
        .route("/api/activity", get(activity::activity_get))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::{leads, users};

    Router::new()
        .route("/api/auth/register", post(users::register_post))
        .route("/api/auth/users", get(users::users_get))
        .route(
            "/api/auth/users/:id",
            get(users::user_get).patch(users::user_patch).delete(users::user_delete),
        )
        .route("/api/leads/:id/reassign", post(leads::reassign_post))
        // Layers run outermost-last: authenticate, then check the role
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "CRM API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "public": "/health, /api/auth/login, /api/auth/refresh",
            "auth": "/api/auth/me, /api/auth/logout",
            "leads": "/api/leads[/:id[/convert|/restore]]",
            "customers": "/api/customers[/:id[/notes]]",
            "tasks": "/api/tasks[/:id]",
            "aggregates": "/api/dashboard, /api/activity",
            "admin": "/api/auth/register, /api/auth/users[/:id], /api/leads/:id/reassign",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
