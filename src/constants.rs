//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Marker carried by the names of kubeconfig secrets (`<cluster>-kubeconfig`)
pub const KUBECONFIG_SECRET_MARKER: &str = "-kubeconfig";

/// Key in the secret's `data` map holding the kubeconfig document
pub const KUBECONFIG_SECRET_DATA_KEY: &str = "value";

/// Provider passed to `eksctl register cluster` when `CLUSTER_PROVIDER` is unset
pub const DEFAULT_CLUSTER_PROVIDER: &str = "EKS_ANYWHERE";

/// EKS Connector manifests applied to every registered cluster, in order
pub const EKS_CONNECTOR_MANIFESTS: [&str; 3] = [
    "eks-connector.yaml",
    "eks-connector-clusterrole.yaml",
    "eks-connector-console-dashboard-full-access-group.yaml",
];

/// Retries after the first failed manifest apply (4 attempts in total)
pub const DEFAULT_APPLY_MAX_RETRIES: u32 = 3;

/// Fixed delay between manifest apply attempts (seconds)
pub const DEFAULT_APPLY_RETRY_DELAY_SECS: u64 = 3;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default registration tool binary
pub const DEFAULT_EKSCTL_BINARY: &str = "eksctl";

/// Default manifest apply tool binary
pub const DEFAULT_KUBECTL_BINARY: &str = "kubectl";

/// Environment variables read once at startup
pub mod env {
    pub const CLUSTER_PROVIDER: &str = "CLUSTER_PROVIDER";
    pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
    pub const AWS_EKS_CONNECTOR_ROLE_ARN: &str = "AWS_EKS_CONNECTOR_ROLE_ARN";
    pub const EKSCTL_PATH: &str = "EKSCTL_PATH";
    pub const KUBECTL_PATH: &str = "KUBECTL_PATH";
    pub const APPLY_MAX_RETRIES: &str = "APPLY_MAX_RETRIES";
    pub const APPLY_RETRY_DELAY_SECS: &str = "APPLY_RETRY_DELAY_SECS";
    pub const METRICS_PORT: &str = "METRICS_PORT";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
