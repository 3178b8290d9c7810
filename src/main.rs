//! Smart Storage CSI plugin
//!
//! Runs either the controller or the node half of the CSI plugin, as
//! selected by `--plugin`, on the given endpoint.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smart_storage_csi::{CsiDriver, NonBlockingServer, PluginConfig, PluginRole, Result, ServerHost};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Smart Storage CSI plugin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSI endpoint (unix:///path or tcp://host:port)
    #[arg(long, env = "CSI_ENDPOINT", default_value = smart_storage_csi::driver::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Plugin role: controller or node
    #[arg(long, env = "PLUGIN_TYPE", default_value = "controller")]
    plugin: String,

    /// Name of the node this plugin runs on
    #[arg(long, env = "NODE_ID", default_value = "")]
    node_id: String,

    /// Driver name reported to Kubernetes
    #[arg(long, env = "DRIVER_NAME", default_value = smart_storage_csi::DRIVER_NAME)]
    driver_name: String,

    /// Resolve Kubernetes config from the pod's service account
    #[arg(long, env = "IN_CLUSTER")]
    in_cluster: bool,

    /// Path to a kubeconfig file; takes precedence over every other source
    #[arg(long, env = "KUBECONFIG_PATH")]
    kubeconfig: Option<String>,

    /// Maximum volumes per node, 0 for unlimited
    #[arg(long, env = "MAX_VOLUMES_PER_NODE", default_value = "0")]
    max_volumes_per_node: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Smart Storage CSI plugin");
    info!("  Version: {}", smart_storage_csi::VERSION);
    info!("  Driver: {}", args.driver_name);
    info!("  Plugin: {}", args.plugin);
    info!("  Endpoint: {}", args.endpoint);
    info!("  In-cluster: {}", args.in_cluster);

    let config = PluginConfig {
        driver_name: args.driver_name.clone(),
        version: smart_storage_csi::VERSION.to_string(),
        endpoint: args.endpoint.clone(),
        node_id: args.node_id.clone(),
        role: PluginRole::from(args.plugin.as_str()),
        in_cluster: args.in_cluster,
        kubeconfig_path: args.kubeconfig.clone(),
        max_volumes_per_node: args.max_volumes_per_node,
    };

    let driver = match CsiDriver::new(config) {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to assemble driver: {}", e);
            return Err(e);
        }
    };

    let server = Arc::new(NonBlockingServer::new());
    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_server.stop();
        }
    });

    if let Err(e) = driver.run(server.as_ref()).await {
        if e.is_configuration() {
            error!("Invalid configuration: {}", e);
        } else {
            error!("Server terminated: {}", e);
        }
        return Err(e);
    }

    info!("Plugin shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
