//! # Initialization
//!
//! Controller initialization: configuration, tracing, rustls setup, metrics,
//! probe server startup, Kubernetes client setup and tool discovery.
//!
//! Every failure here is fatal and aborts the process with a non-zero exit.

use crate::cli::Cli;
use crate::command::resolve_binary;
use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_EKSCTL_BINARY, DEFAULT_KUBECTL_BINARY};
use crate::controller::Reconciler;
use crate::manifests::KubectlApplier;
use crate::observability::{logging, metrics};
use crate::registration::EksctlRegistrar;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::config::{InClusterError, KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Api, Client, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Failure to reach the Kubernetes API at startup
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to read kubeconfig {}: {source}", path.display())]
    ReadKubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },
    #[error("failed to build client configuration from kubeconfig: {0}")]
    Kubeconfig(#[source] KubeconfigError),
    #[error("failed to load in-cluster configuration: {0}")]
    InCluster(#[from] InClusterError),
    #[error("failed to create Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// Everything the watch loop needs, built once at startup
pub struct InitializationResult {
    pub config: ControllerConfig,
    /// API for kubeconfig secrets in the watched namespace(s)
    pub secrets: Api<Secret>,
    pub reconciler: Reconciler,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
///
/// Fails on missing configuration, when the Kubernetes client cannot be
/// created, or when `eksctl` / `kubectl` cannot be found.
pub async fn initialize(cli: Cli) -> Result<InitializationResult> {
    let config = ControllerConfig::from_cli_and_env(cli).context("Invalid configuration")?;

    logging::init_tracing(config.log_format)?;

    info!("Starting Cluster Registration Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = connect(config.kubeconfig.as_deref())
        .await
        .context("Failed to connect to Kubernetes")?;

    let secrets: Api<Secret> = match config.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    let eksctl = resolve_binary(config.eksctl_path.as_deref(), DEFAULT_EKSCTL_BINARY)
        .context("eksctl not found, set EKSCTL_PATH or add it to PATH")?;
    let kubectl = resolve_binary(config.kubectl_path.as_deref(), DEFAULT_KUBECTL_BINARY)
        .context("kubectl not found, set KUBECTL_PATH or add it to PATH")?;
    info!(eksctl = %eksctl.display(), kubectl = %kubectl.display(), "Resolved external tools");

    let reconciler = Reconciler::new(
        &config,
        Arc::new(EksctlRegistrar::new(eksctl)),
        Arc::new(KubectlApplier::new(kubectl)),
    );

    info!(
        namespace = config.namespace.as_deref().unwrap_or("<all>"),
        prefix = config.prefix.as_str(),
        region = config.registration.region.as_str(),
        provider = config.registration.provider.as_str(),
        "Controller initialized, starting watch loop..."
    );

    Ok(InitializationResult {
        config,
        secrets,
        reconciler,
        server_state,
    })
}

/// Build a client from an explicit kubeconfig file, or from the in-cluster
/// service account when none is given
async fn connect(kubeconfig: Option<&Path>) -> Result<Client, ConnectError> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig =
                Kubeconfig::read_from(path).map_err(|source| ConnectError::ReadKubeconfig {
                    path: path.to_path_buf(),
                    source,
                })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(ConnectError::Kubeconfig)?
        }
        None => Config::incluster()?,
    };

    Ok(Client::try_from(config)?)
}
