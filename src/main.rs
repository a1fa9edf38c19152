//! Production entrypoint for the clinic access subsystem.
//!
//! Resolves configuration from the environment once, builds the record store
//! and the service registry, and serves the REST API. The standalone
//! `clinic-api-rest` binary in `crates/api-rest` runs the same router for
//! development.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the clinic access server.
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CLINIC_PUBLIC_ORIGIN`: Origin used in shareable access URLs
/// - `CLINIC_HANDLE_DOMAIN`: Domain for ephemeral contact handles
/// - `CLINIC_DATA_FILE`: JSON snapshot file backing the record store
/// - `CLINIC_DEV_SEED`: "1" plants demo records at startup
///
/// # Errors
/// Returns an error if tracing cannot be initialised, configuration is
/// invalid, the store file cannot be loaded, or the address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting clinic access server on {}", addr);

    let state = api_rest::state_from_env()?;
    api_rest::serve(&addr, state).await
}
