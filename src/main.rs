use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_booking_backend::{
    config::Config,
    db,
    middleware::rate_limit::create_global_governor,
    routes,
    services::parameters::ParameterService,
    services::scheduler::ExpirationScheduler,
    utils::clock::{SharedClock, SystemClock},
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_booking_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(timezone = %config.timezone, "Starting server at {}", config.server_addr());

    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    let parameters = ParameterService::load(db.clone())
        .await
        .expect("Failed to load business parameters");

    let clock: SharedClock = Arc::new(SystemClock);
    let state = AppState::new(db, config.clone(), clock.clone(), parameters);

    // Place-order expiry runs beside the server and stops with it
    let shutdown = CancellationToken::new();
    let scheduler = ExpirationScheduler::new(
        state.booking.clone(),
        clock,
        config.expiry_sweep_interval,
        config.expiry_lookahead,
    )
    .spawn(shutdown.child_token());

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_global_governor());

    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("Server listening on {}", addr);

    let signal = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        signal.cancel();
    })
    .await
    .expect("Failed to start server");

    shutdown.cancel();
    if let Err(err) = scheduler.await {
        tracing::error!(error = %err, "Expiration scheduler task panicked");
    }
    tracing::info!("Server stopped");
}
