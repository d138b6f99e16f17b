//! # Controller Configuration
//!
//! Settings assembled once at startup from command-line flags and environment
//! variables, then passed by reference to the components that need them.

use crate::cli::Cli;
use crate::constants::{self, env, EKS_CONNECTOR_MANIFESTS};
use crate::controller::backoff::RetryPolicy;
use crate::observability::logging::LogFormat;
use crate::registration::RegistrationRequest;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),
}

/// Controller-level configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Kubeconfig for the management cluster; `None` means in-cluster config
    pub kubeconfig: Option<PathBuf>,
    /// Namespace to watch; `None` means all namespaces
    pub namespace: Option<String>,
    /// Secret name prefix filter
    pub prefix: String,
    /// Directory where per-cluster kubeconfig files are written
    pub work_dir: PathBuf,
    /// Directory holding the EKS Connector manifests
    pub manifest_dir: PathBuf,
    /// Provider, region and role ARN passed to `eksctl register`
    pub registration: RegistrationRequest,
    /// Bounded retry for manifest apply
    pub apply_retry: RetryPolicy,
    /// Explicit `eksctl` path (otherwise resolved on `PATH`)
    pub eksctl_path: Option<String>,
    /// Explicit `kubectl` path (otherwise resolved on `PATH`)
    pub kubectl_path: Option<String>,
    /// Port of the metrics/probe HTTP server
    pub metrics_port: u16,
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Build the configuration from flags and the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required environment variable is missing.
    pub fn from_cli_and_env(cli: Cli) -> Result<Self, ConfigError> {
        Self::from_cli_and_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Build the configuration using `lookup` to read environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `AWS_DEFAULT_REGION` or
    /// `AWS_EKS_CONNECTOR_ROLE_ARN` is missing or empty.
    pub fn from_cli_and_lookup<F>(cli: Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = non_empty(env::CLUSTER_PROVIDER)
            .unwrap_or_else(|| constants::DEFAULT_CLUSTER_PROVIDER.to_string());
        let region =
            non_empty(env::AWS_DEFAULT_REGION).ok_or(ConfigError::MissingEnv(env::AWS_DEFAULT_REGION))?;
        let role_arn = non_empty(env::AWS_EKS_CONNECTOR_ROLE_ARN)
            .ok_or(ConfigError::MissingEnv(env::AWS_EKS_CONNECTOR_ROLE_ARN))?;

        let max_retries = parse_or_default(
            non_empty(env::APPLY_MAX_RETRIES),
            constants::DEFAULT_APPLY_MAX_RETRIES,
        );
        let retry_delay_secs = parse_or_default(
            non_empty(env::APPLY_RETRY_DELAY_SECS),
            constants::DEFAULT_APPLY_RETRY_DELAY_SECS,
        );

        Ok(Self {
            kubeconfig: non_empty_string(cli.kubeconfig).map(PathBuf::from),
            namespace: non_empty_string(cli.namespace),
            prefix: cli.prefix,
            work_dir: cli.work_dir,
            manifest_dir: cli.manifest_dir,
            registration: RegistrationRequest {
                provider,
                region,
                role_arn,
            },
            apply_retry: RetryPolicy::new(max_retries, Duration::from_secs(retry_delay_secs)),
            eksctl_path: non_empty(env::EKSCTL_PATH),
            kubectl_path: non_empty(env::KUBECTL_PATH),
            metrics_port: parse_or_default(
                non_empty(env::METRICS_PORT),
                constants::DEFAULT_METRICS_PORT,
            ),
            log_format: non_empty(env::LOG_FORMAT)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    /// Manifest files applied to each registered cluster, in order
    #[must_use]
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        EKS_CONNECTOR_MANIFESTS
            .iter()
            .map(|m| self.manifest_dir.join(m))
            .collect()
    }
}

fn non_empty_string(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse a value or fall back to the default when absent or malformed
fn parse_or_default<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
