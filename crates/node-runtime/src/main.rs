//! # Provider Node Runtime
//!
//! The main entry point of the provider node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `PN_CONFIG` file, `PN_*` environment)
//! 2. Initialize logging
//! 3. Build the node container
//! 4. Bootstrap services (registry, session storage, manager, cleaner)
//! 5. Start the services listed in `services.enabled`
//! 6. Wait for Ctrl+C, then stop every service

use std::str::FromStr;

use anyhow::{Context, Result};
use node_runtime::container::{NodeConfig, NodeContainer};
use node_runtime::manager::StartRequest;
use node_runtime::wiring::{bootstrap_services, ServiceComponents};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The node runtime owning the container and the bootstrapped services.
struct NodeRuntime {
    container: NodeContainer,
    services: ServiceComponents,
}

impl NodeRuntime {
    async fn new(config: NodeConfig) -> Result<Self> {
        let container = NodeContainer::new(config)?;
        let services = bootstrap_services(&container).await?;
        Ok(Self {
            container,
            services,
        })
    }

    /// Start every configured service. A service that fails to start is
    /// logged and skipped.
    async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Provider Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Provider: {}", self.container.provider);
        info!("===========================================");

        let config = &self.container.config;
        let access_policy = config.services.allow_list()?;
        if access_policy.is_empty() {
            warn!("[runtime] Access policy is empty, every consumer may open dialogs");
        }

        for service_type in &config.services.enabled {
            let options = match config.service_options(service_type) {
                Ok(options) => options,
                Err(e) => {
                    error!(service_type = %service_type, error = %e, "[runtime] Invalid service options");
                    continue;
                }
            };
            let request = StartRequest {
                service_type: service_type.clone(),
                options,
                access_policy: access_policy.clone(),
            };
            match self.services.manager.start(request).await {
                Ok(id) => info!(service_id = %id, service_type = %service_type, "[runtime] Service running"),
                Err(e) => {
                    error!(service_type = %service_type, error = %e, "[runtime] Could not start service");
                }
            }
        }

        info!(
            running = self.services.manager.list().len(),
            "[runtime] Node started"
        );
        Ok(())
    }

    async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");
        self.services.shutdown(&self.container).await;
        info!("Shutdown complete");
    }
}

fn init_logging(level: &str) -> Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(true)
            .with_thread_ids(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging.level)?;

    let mut runtime = NodeRuntime::new(config).await?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
