use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
};

use http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod clock;
mod store;

mod crypto {
    pub mod jwt;
    pub mod password;
    pub mod token;
}

mod models {
    pub mod attendance;
    pub mod department;
    pub mod refresh_token;
    pub mod user;
    pub mod verification_code;
}

mod repositories {
    pub mod attendance;
    pub mod code;
    pub mod department;
    pub mod refresh_token;
    pub mod user;

    #[cfg(test)]
    pub mod memory;
}

mod services {
    pub mod attendance;
    pub mod auth;
    pub mod codes;
    pub mod departments;
    pub mod users;
}

mod handlers {
    pub mod attendance;
    pub mod auth;
    pub mod codes;
    pub mod departments;
    pub mod pagination;
    pub mod users;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

/// Liveness probe for load balancers and uptime checks.
async fn health() -> impl IntoResponse {
    Json(sonic_rs::json!({
        "status": "ok",
        "service": "attendance-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized");

    // Fail fast when the database is unreachable at startup.
    match state.db.get().await {
        Ok(client) => {
            if let Err(e) = client.simple_query("SELECT 1").await {
                tracing::error!("❌ Database ping failed: {}", e);
                return Err(e.into());
            }
            tracing::info!("✅ Database connection verified");
        }
        Err(e) => {
            tracing::error!("❌ Failed to acquire a database connection: {}", e);
            return Err(e.into());
        }
    }

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(43200));

    cors = if config.allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        cors.allow_origin(AllowOrigin::list(origins)).allow_credentials(true)
    };

    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .use_headers()
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    // Credential endpoints sit behind the rate limiter; everything else
    // does not.
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .layer(tower_governor::GovernorLayer::new(auth_governor_conf))
        .with_state(state.clone());

    // Department mutations check the admin role in the handler, the reads
    // on the same paths are open to every authenticated user.
    let protected_routes = Router::new()
        .route("/api/v1/users/me", get(handlers::users::me))
        .route(
            "/api/v1/users/me/password",
            put(handlers::users::change_password),
        )
        .route(
            "/api/v1/attendance/check-in",
            post(handlers::attendance::check_in),
        )
        .route(
            "/api/v1/attendance/check-out",
            post(handlers::attendance::check_out),
        )
        .route("/api/v1/attendance/today", get(handlers::attendance::today))
        .route(
            "/api/v1/attendance/history",
            get(handlers::attendance::history),
        )
        .route("/api/v1/attendance/range", get(handlers::attendance::range))
        .route(
            "/api/v1/departments",
            get(handlers::departments::list).post(handlers::departments::create),
        )
        .route(
            "/api/v1/departments/{id}",
            get(handlers::departments::get_by_id)
                .put(handlers::departments::update)
                .delete(handlers::departments::delete),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let staff_routes = Router::new()
        .route(
            "/api/v1/codes/active",
            get(handlers::codes::get_active).delete(handlers::codes::deactivate),
        )
        .route("/api/v1/codes/generate", post(handlers::codes::generate))
        .route(
            "/api/v1/attendance/manual",
            post(handlers::attendance::manual_mark),
        )
        .route(
            "/api/v1/attendance/records/{id}",
            get(handlers::attendance::get_by_id),
        )
        .route_layer(from_fn(middleware_layer::auth::require_staff))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route(
            "/api/v1/users",
            post(handlers::users::create).get(handlers::users::list),
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::users::get_by_id)
                .put(handlers::users::update)
                .delete(handlers::users::delete),
        )
        .route_layer(from_fn(middleware_layer::auth::require_admin))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .route("/health", get(health))
        .merge(auth_routes)
        .merge(protected_routes)
        .merge(staff_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors);

    let sweeper = state.codes.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Sweeping expired verification codes...");
            match sweeper.sweep_expired().await {
                Ok(deleted) => {
                    tracing::info!("✅ Sweep removed {} expired code(s)", deleted);
                }
                Err(e) => {
                    tracing::error!("❌ Expired-code sweep failed: {}", e);
                }
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.bind_port).parse()?;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background code sweeper started (runs every hour)");
    tracing::info!("✅ All systems operational");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
