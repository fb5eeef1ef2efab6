use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use cvcrm_mcp::cache::{CacheKeys, KeyValueStore, MemoryStore, RedisStore};
use cvcrm_mcp::config::{
    APP_NAME, APP_VERSION, CacheBackend, CacheConfig, CrmConfig, McpTransport, ServerConfig,
};
use cvcrm_mcp::crm::build_http_client;
use cvcrm_mcp::mcp;
use cvcrm_mcp::state::AppState;

fn init_tracing(transport: McpTransport) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json");
    // Stdout belongs to JSON-RPC frames in stdio mode.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match (transport, json) {
        (_, true) => builder.json().init(),
        (McpTransport::Stdio, false) => builder.with_ansi(false).init(),
        (McpTransport::Http, false) => builder.init(),
    }
}

async fn build_state(server: &ServerConfig) -> anyhow::Result<AppState> {
    let crm = CrmConfig::from_env()?;
    let cache = CacheConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match cache.backend {
        CacheBackend::Redis => Arc::new(RedisStore::connect(&cache.url).await?),
        CacheBackend::Memory => {
            tracing::warn!("CACHE_BACKEND=memory: tokens are not shared between processes");
            Arc::new(MemoryStore::new())
        }
    };

    let http = build_http_client()?;
    Ok(AppState::new(
        store,
        CacheKeys::new(cache.namespace),
        crm,
        http,
        server.auth_secret.clone(),
    ))
}

fn build_app(state: AppState) -> anyhow::Result<axum::Router> {
    // CORS: the Luna mirror is called from arbitrary automation platforms
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(86_400));

    // Security headers
    let nosniff: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    let frame_deny: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    let referrer: SetResponseHeaderLayer<HeaderValue> = SetResponseHeaderLayer::overriding(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    // Rate limiting: 30 req burst, replenish 1 per 2 seconds, per IP
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(30)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?;

    let app = cvcrm_mcp::create_router(state)
        .layer(GovernorLayer::new(governor_conf))
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .layer(cors)
        .layer(nosniff)
        .layer(frame_deny)
        .layer(referrer)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CompressionLayer::new());

    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let server = ServerConfig::from_env()?;
    init_tracing(server.transport);

    let state = build_state(&server).await?;

    // ── Startup check: cache reachable ──
    match state.store.ping().await {
        Ok(()) => tracing::info!("startup: cache reachable"),
        Err(e) => tracing::error!("startup: cache ping failed: {}", e),
    }
    state.mark_ready();

    if server.transport == McpTransport::Stdio {
        tracing::info!("{} v{} - Ready (stdio)", APP_NAME, APP_VERSION);
        mcp::stdio::run(state).await?;
        return Ok(());
    }

    let app = build_app(state)?;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], server.port));

    tracing::info!("{} v{} listening on http://{}", APP_NAME, APP_VERSION, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("cannot install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
