use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use shopfront_api as api;
use shopfront_api::{notifications::SmsSender, payments::PaymentGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);
    api::handlers::health::init_start_time();

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    let auth_service = Arc::new(api::auth::AuthService::new(api::auth::AuthConfig::new(
        cfg.jwt_secret.clone(),
        Duration::from_secs(cfg.jwt_expiration_secs),
    )));

    let gateway = payment_gateway(&cfg)?;
    let sms = sms_sender(&cfg)?;

    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        auth_service.clone(),
        gateway,
        sms,
        Duration::from_secs(cfg.verification_code_ttl_secs),
        cfg.http_client_timeout(),
    );

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        services,
    };
    let app = api::build_router(app_state, auth_service);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("shopfront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn payment_gateway(cfg: &api::config::AppConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    match cfg.payments.stripe_secret_key.clone() {
        Some(secret_key) => {
            info!("Stripe checkout enabled");
            let gateway = api::payments::StripeGateway::new(
                secret_key,
                cfg.payments.clone(),
                cfg.http_client_timeout(),
            )
            .context("failed to build Stripe client")?;
            Ok(Arc::new(gateway))
        }
        None => {
            warn!("No Stripe key configured; using the sandbox gateway (every session settles as paid)");
            Ok(Arc::new(api::payments::SandboxGateway::new(
                cfg.payments.success_url.clone(),
            )))
        }
    }
}

fn sms_sender(cfg: &api::config::AppConfig) -> anyhow::Result<Arc<dyn SmsSender>> {
    let sms = &cfg.sms;
    match (
        sms.twilio_account_sid.clone(),
        sms.twilio_auth_token.clone(),
        sms.from_number.clone(),
    ) {
        (Some(sid), Some(token), Some(from)) => {
            info!("Twilio SMS delivery enabled");
            let sender = api::notifications::TwilioSmsSender::new(
                sid,
                token,
                from,
                sms.api_base.clone(),
                cfg.http_client_timeout(),
            )
            .context("failed to build Twilio client")?;
            Ok(Arc::new(sender))
        }
        _ => {
            info!("Twilio not configured; verification codes are only logged");
            Ok(Arc::new(api::notifications::LogSmsSender))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
