//! HTTP server setup and application wiring

use crate::api;
use crate::clients::UserServiceClient;
use crate::config::Config;
use crate::email::{EmailSender, LogOnlyEmailSender, SmtpEmailSender};
use crate::events::{
    spawn_activity_defaults_listener, spawn_subscriber, EventPublisher, StaticActivityDefaults,
    LOCAL_BUS_CAPACITY,
};
use crate::jwt::JwtCodec;
use crate::middleware::{
    auth_gateway_middleware, inject_client_ip, rate_limit_middleware, AuthGatewayState,
    HttpTelemetryLayer, RateLimiter,
};
use crate::openapi::ApiDoc;
use crate::telemetry;
use crate::verification::{InMemoryVerificationStore, VerificationService};
use anyhow::{Context, Result};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: Arc<JwtCodec>,
    pub user_client: UserServiceClient,
    pub verification: Arc<VerificationService<InMemoryVerificationStore>>,
    pub rate_limiter: RateLimiter,
    pub metrics_handle: Arc<Option<PrometheusHandle>>,
}

/// Build the HTTP router
///
/// The gateway filter wraps every route, so open paths are decided by the
/// path tables rather than by which routes carry the layer. The verification
/// endpoints additionally sit behind the per-IP rate limiter.
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gateway = AuthGatewayState::new(state.codec.clone());

    let verification_routes = Router::new()
        .route(
            "/api/v1/auth/email-verification/send",
            post(api::verification::send_code),
        )
        .route(
            "/api/v1/auth/email-verification/check",
            post(api::verification::check_code),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        // System endpoints
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::metrics::metrics_handler))
        // Current-user endpoints
        .route("/api/v1/me", get(api::me::me))
        .route("/api/v1/me/friends", get(api::me::my_friends))
        .merge(verification_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::build()))
        .layer(axum_middleware::from_fn_with_state(
            gateway,
            auth_gateway_middleware,
        ))
        .layer(HttpTelemetryLayer)
        .layer(axum_middleware::from_fn(inject_client_ip))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the server with the given configuration
pub async fn run(config: Config) -> Result<()> {
    // Install the metrics recorder before anything records a sample.
    let metrics_handle = telemetry::install_prometheus_recorder();
    telemetry::describe_metrics();

    let config = Arc::new(config);

    // Token codec for the gateway. A missing signing key logs loudly inside
    // the constructor but keeps the process up, rejecting protected traffic.
    let codec = Arc::new(JwtCodec::new(&config.auth));

    // Redis connection shared by the publisher and the rate limiter. The
    // manager reconnects on its own after the initial handshake.
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("invalid Redis URL")?;
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .context("failed to connect to Redis")?;

    let publisher = EventPublisher::new(redis_conn.clone());

    // Local in-process bus, bridged from the Redis channels by a background
    // task. The activity-defaults listener consumes it.
    let (bus_tx, _) = broadcast::channel(LOCAL_BUS_CAPACITY);
    spawn_subscriber(config.redis.url.clone(), bus_tx.clone());
    spawn_activity_defaults_listener(
        bus_tx.subscribe(),
        Arc::new(StaticActivityDefaults),
        publisher.clone(),
    );

    // Outbound verification mail; without SMTP settings codes are logged so
    // local development works end to end.
    let mailer: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::from_config(smtp)?),
        None => {
            warn!("SMTP not configured, verification codes will be logged instead of emailed");
            Arc::new(LogOnlyEmailSender)
        }
    };

    let store = Arc::new(InMemoryVerificationStore::new(&config.verification));
    let verification = Arc::new(VerificationService::new(store, mailer, &config.verification));

    let user_client = UserServiceClient::new(&config.user_service)?;

    let rate_limiter = RateLimiter::new(config.rate_limit.clone(), Some(redis_conn));

    // Create app state
    let state = AppState {
        config: config.clone(),
        codec,
        user_client,
        verification,
        rate_limiter,
        metrics_handle: Arc::new(Some(metrics_handle)),
    };

    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
