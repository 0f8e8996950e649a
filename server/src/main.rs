//! AIrena server.
//!
//! Wires PostgreSQL storage, the mail transport, identity services and the
//! reminder scheduler behind the HTTP API, and stops both the server and
//! the scheduled sweeps on Ctrl+C or SIGTERM.

mod config;
mod transport;

use airena_core::environment::{Clock, SystemClock};
use airena_identity::IdentityServices;
use airena_identity::stores::PostgresIdentityRepository;
use airena_mail::{DeliveryPolicy, EmailDispatcher};
use airena_reminders::ReminderScheduler;
use airena_reminders::stores::{PostgresEventDirectory, PostgresReminderLedger};
use airena_web::{AppState, Backend, cors_layer, router};
use anyhow::Context;
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::Transport;

struct Postgres;

impl Backend for Postgres {
    type Identities = PostgresIdentityRepository;
    type Mailer = Transport;
    type Events = PostgresEventDirectory;
    type Ledger = PostgresReminderLedger;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,airena=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AIrena server");

    let config = Config::from_env()?;
    if config.identity.admin_emails.is_empty() {
        warn!("ADMIN_EMAILS is empty, host requests will reach nobody");
    }

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus metrics exposed");
    }

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let identities = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    identities.migrate().await?;
    let ledger = Arc::new(PostgresReminderLedger::new(pool.clone()));
    ledger.migrate().await?;
    let directory = Arc::new(PostgresEventDirectory::new(pool));
    info!("Database ready");

    let mailer = Arc::new(Transport::new(config.smtp.clone())?);
    let dispatcher = EmailDispatcher::new(mailer, DeliveryPolicy::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let identity = IdentityServices::new(identities, dispatcher.clone(), &config.identity, Arc::clone(&clock));
    bootstrap_admins(&identity, &config).await;

    let scheduler = ReminderScheduler::new(directory, ledger, dispatcher, config.reminders.clone(), clock);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let jobs = scheduler.spawn(&shutdown_rx);

    let app = router(AppState::<Postgres>::new(identity, scheduler)).layer(cors_layer(&config.cors_origin));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if shutdown_tx.send(true).is_err() {
        warn!("Scheduled jobs already stopped");
    }
    for job in jobs {
        if let Err(error) = job.await {
            error!(%error, "Scheduled job ended abnormally");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Create the configured administrators when `ADMIN_PASSWORD` is set.
async fn bootstrap_admins(identity: &IdentityServices<PostgresIdentityRepository, Transport>, config: &Config) {
    let Some(password) = &config.admin_password else {
        return;
    };
    for email in &config.identity.admin_emails {
        match identity.machine.ensure_admin(email, password, "Administrator").await {
            Ok(true) => info!(%email, "Administrator created"),
            Ok(false) => info!(%email, "Administrator already present"),
            Err(error) => error!(%email, %error, "Administrator bootstrap failed"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
        () = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}
