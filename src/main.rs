//! # Cluster Registration Controller
//!
//! Registers external clusters with EKS Connector from their kubeconfig secrets.
//!
//! See the library documentation for the reconciliation flow.

use anyhow::Result;
use clap::Parser;
use cluster_registration_controller::cli::Cli;
use cluster_registration_controller::controller::event::secret_events;
use cluster_registration_controller::runtime::{initialize, run_watch_loop};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = initialize(cli).await?;

    let events = secret_events(runtime.secrets.clone());
    runtime.server_state.set_ready(true);

    tokio::select! {
        summary = run_watch_loop(events, &runtime.reconciler) => {
            warn!(?summary, "Watch loop exited");
        }
        () = shutdown_signal() => {
            info!("Received shutdown signal, stopping...");
        }
    }

    runtime.server_state.set_ready(false);
    info!("Controller stopped");
    Ok(())
}

/// Resolves on SIGINT, or on SIGTERM where available
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
