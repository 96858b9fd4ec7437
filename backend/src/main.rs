//! Logistics server entry point: settings, migrations, pool and HTTP server.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use logistics::inbound::http::health::HealthState;
use logistics::inbound::http::session_config::{BuildMode, session_settings_from_env};
use logistics::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};

use server::{AppSettings, ServerConfig, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|e| eyre!("failed to load settings: {e}"))?;
    let database_url = settings.database_url()?.to_owned();
    let bind_addr = settings.bind_addr()?;

    let env = DefaultEnv::new();
    let session = session_settings_from_env(&env, BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    info!(fingerprint = %session.fingerprint(), "session key loaded");

    if settings.run_migrations() {
        let applied = run_pending_migrations(&database_url)
            .await
            .wrap_err("failed to apply migrations")?;
        info!(applied, "database migrations complete");
    }

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(settings.pool_max_size()?))
        .await
        .wrap_err("failed to build connection pool")?;

    let config = ServerConfig::new(session, bind_addr, pool);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(server::initialize_metrics());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("server terminated with an error")
}
