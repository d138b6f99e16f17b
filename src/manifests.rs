//! # EKS Connector Manifests
//!
//! Applies the EKS Connector manifests to a registered cluster using the
//! kubeconfig file written for it.
//!
//! [`ManifestApplier::apply`] performs a single attempt. [`apply_with_retry`]
//! wraps any applier with the bounded, fixed-delay [`RetryPolicy`]; once the
//! attempts are exhausted the failure is returned to the caller, which logs it
//! and moves on to the next event.

use crate::command::{self, CommandError};
use crate::controller::backoff::RetryPolicy;
use crate::observability::metrics;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// A single manifest apply attempt failed
#[derive(Debug, Error)]
#[error("failed to apply manifests with kubeconfig {}: {source}", kubeconfig.display())]
pub struct ApplyError {
    pub kubeconfig: PathBuf,
    #[source]
    pub source: CommandError,
}

/// Every allowed attempt failed
#[derive(Debug, Error)]
#[error("gave up applying manifests after {attempts} attempts: {last_error}")]
pub struct ApplyAbandoned {
    pub attempts: u32,
    #[source]
    pub last_error: ApplyError,
}

/// Cluster manifest apply tool
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Apply `manifests`, in order, to the cluster reached through `kubeconfig`
    async fn apply(&self, kubeconfig: &Path, manifests: &[PathBuf]) -> Result<(), ApplyError>;
}

/// [`ManifestApplier`] backed by the `kubectl` binary
#[derive(Debug, Clone)]
pub struct KubectlApplier {
    binary: PathBuf,
}

impl KubectlApplier {
    #[must_use]
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

/// `kubectl` arguments applying all manifests in a single invocation
#[must_use]
pub fn apply_args(kubeconfig: &Path, manifests: &[PathBuf]) -> Vec<String> {
    let files = manifests
        .iter()
        .map(|m| m.display().to_string())
        .collect::<Vec<_>>()
        .join(",");
    vec![
        "--kubeconfig".to_string(),
        kubeconfig.display().to_string(),
        "apply".to_string(),
        "-f".to_string(),
        files,
    ]
}

#[async_trait]
impl ManifestApplier for KubectlApplier {
    async fn apply(&self, kubeconfig: &Path, manifests: &[PathBuf]) -> Result<(), ApplyError> {
        command::run(&self.binary, apply_args(kubeconfig, manifests))
            .await
            .map(|_| ())
            .map_err(|source| ApplyError {
                kubeconfig: kubeconfig.to_path_buf(),
                source,
            })
    }
}

/// Apply manifests, retrying failures according to `policy`
///
/// Returns the number of attempts it took to succeed.
///
/// # Errors
///
/// Returns [`ApplyAbandoned`] with the last failure once every attempt allowed
/// by the policy has failed.
pub async fn apply_with_retry(
    applier: &dyn ManifestApplier,
    policy: &RetryPolicy,
    cluster: &str,
    kubeconfig: &Path,
    manifests: &[PathBuf],
) -> Result<u32, ApplyAbandoned> {
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        metrics::increment_manifest_apply_attempts();

        let last_error = match applier.apply(kubeconfig, manifests).await {
            Ok(()) => return Ok(attempts),
            Err(e) => e,
        };

        if !policy.should_retry(attempts) {
            return Err(ApplyAbandoned {
                attempts,
                last_error,
            });
        }

        warn!(
            cluster.identity = cluster,
            attempt = attempts,
            max_attempts = policy.max_attempts(),
            error = %last_error,
            "Failed to apply registration manifests, retrying in {}s",
            policy.delay().as_secs()
        );
        tokio::time::sleep(policy.delay()).await;
        info!(cluster.identity = cluster, attempt = attempts + 1, "Retrying manifest apply");
    }
}
