use actix_web::{App, HttpServer, web};
use offchain_registry::application::service::PrincipalService;
use offchain_registry::config::AppConfig;
use offchain_registry::data::memory::InMemoryPrincipalRepository;
use offchain_registry::domain::principal::Role;
use offchain_registry::infrastructure::logging::init_logging;
use offchain_registry::infrastructure::security::CredentialHasher;
use offchain_registry::presentation::middleware::RequestTracing;
use offchain_registry::presentation::routes::{ROUTE_SUMMARY, configure, cors_middleware};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[tokio::main]
#[instrument]
async fn main() -> anyhow::Result<()> {
    init_logging("info");

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    info!(
        policy = ?config.policy,
        cors = ?config.cors_allowed_origin,
        "Configuration loaded"
    );

    let hasher = CredentialHasher::new(
        config.hashing.m_cost,
        config.hashing.t_cost,
        config.hashing.p_cost,
    )
    .map_err(|e| anyhow::anyhow!("invalid Argon2 parameters: {}", e))?;

    info!("Creating in-memory principal registries");
    let users = web::Data::new(
        PrincipalService::new(Role::User, Arc::new(InMemoryPrincipalRepository::new()))
            .with_hasher(hasher.clone())
            .with_policy(config.policy),
    );
    let admins = web::Data::new(
        PrincipalService::new(Role::Admin, Arc::new(InMemoryPrincipalRepository::new()))
            .with_hasher(hasher)
            .with_policy(config.policy),
    );

    let cors_origin = config.cors_allowed_origin.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware(cors_origin.as_deref()))
            .wrap(RequestTracing)
            .configure(|cfg| configure(cfg, users.clone(), admins.clone()))
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    let bind_addr = config.bind_address();
    let server = server.bind((config.server.host.as_str(), config.server.port))?;
    info!(address = %bind_addr, routes = %ROUTE_SUMMARY, "Starting HTTP server");
    server.run().await?;
    Ok(())
}
