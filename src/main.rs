use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use sqlx::postgres::PgPoolOptions;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use support_portal_backend::{
    config::Config,
    db::{
        postgres_activity_log_repository::PostgresActivityLogRepository,
        postgres_system_status_repository::PostgresSystemStatusRepository,
        postgres_ticket_repository::PostgresTicketRepository,
        postgres_user_repository::PostgresUserRepository,
    },
    init_tracing,
    responses::JsonResponse,
    routes::build_router,
    services::{
        attachments::AttachmentStore,
        smtp_mailer::{DisabledMailer, Mailer, SmtpMailer},
    },
    state::{AppState, Repositories},
    utils::jwt::JwtKeys,
};

#[cfg(feature = "tls")]
use axum_server::tls_rustls::RustlsConfig;

const RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    info!(?config, "starting support portal backend");

    let jwt_keys = JwtKeys::from_secret(&config.jwt_secret).context("JWT_SECRET rejected")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;
    info!("connected to the database");

    if config.run_migrations {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to apply migrations")?;
        info!("database migrations applied");
    }

    let repos = Repositories {
        users: Arc::new(PostgresUserRepository { pool: pool.clone() }),
        tickets: Arc::new(PostgresTicketRepository { pool: pool.clone() }),
        activity_logs: Arc::new(PostgresActivityLogRepository { pool: pool.clone() }),
        system_status: Arc::new(PostgresSystemStatusRepository { pool }),
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::from_config(smtp).context("failed to configure SMTP")?;
            info!(host = %smtp.host, port = smtp.port, tls = %smtp.tls_mode, "SMTP enabled");
            Arc::new(mailer)
        }
        None => {
            warn!("SMTP_HOST not set; notification emails will only be logged");
            Arc::new(DisabledMailer)
        }
    };

    let state = AppState::new(
        repos,
        mailer,
        AttachmentStore::new(config.upload_dir.clone()),
        jwt_keys,
        &config.jwt_issuer,
        &config.jwt_audience,
        config.max_attachment_bytes,
    );

    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| JsonResponse::too_many_requests(RATE_LIMITED).into_response())
            .finish()
            .context("invalid RATE_LIMITER_MILLISECONDS / RATE_LIMITER_BURST")?,
    );
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit.auth_per_second)
            .burst_size(config.rate_limit.auth_burst)
            .use_headers()
            .error_handler(|_err| JsonResponse::too_many_requests(RATE_LIMITED).into_response())
            .finish()
            .context("invalid RATE_LIMITER_AUTH_SECONDS / RATE_LIMITER_AUTH_BURST")?,
    );

    let global_limiter = global_governor_conf.limiter().clone();
    let auth_limiter = auth_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            global_limiter.retain_recent();
            auth_limiter.retain_recent();
        }
    });

    let origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .context("FRONTEND_ORIGIN is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let app = build_router(state, move |auth| {
        auth.layer(GovernorLayer {
            config: auth_governor_conf,
        })
    })
    .layer(GovernorLayer {
        config: global_governor_conf,
    })
    .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = config.bind_addr;

    #[cfg(feature = "tls")]
    {
        let cert = std::env::var("DEV_CERT_LOCATION").context("DEV_CERT_LOCATION must be set")?;
        let key = std::env::var("DEV_KEY_LOCATION").context("DEV_KEY_LOCATION must be set")?;
        let tls_config = RustlsConfig::from_pem_file(cert, key)
            .await
            .context("failed to load TLS certificate")?;

        info!(%addr, "listening with TLS");
        axum_server::bind_rustls(addr, tls_config)
            .serve(make_service)
            .await
            .context("server error")?;
    }

    #[cfg(not(feature = "tls"))]
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "listening");
        axum::serve(listener, make_service)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;
    }

    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "could not listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
