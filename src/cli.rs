//! # Command-Line Flags
//!
//! ```bash
//! # In-cluster, watching every namespace
//! cluster-registration-controller --prefix prod-
//!
//! # Out of cluster, watching the Cluster API namespace
//! cluster-registration-controller --kubeconfig ~/.kube/config --namespace capi-system
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Registers clusters with EKS Connector from their kubeconfig secrets
#[derive(Debug, Clone, Parser)]
#[command(name = "cluster-registration-controller", version, long_about = None)]
pub struct Cli {
    /// Absolute path to the kubeconfig file (defaults to in-cluster configuration)
    #[arg(long, default_value = "")]
    pub kubeconfig: String,

    /// Namespace to watch for kubeconfig secrets (defaults to all namespaces)
    #[arg(long, default_value = "")]
    pub namespace: String,

    /// Only secrets whose name starts with this prefix are handled
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Directory where cluster kubeconfig files are written
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Directory containing the EKS Connector manifests
    #[arg(long, default_value = ".")]
    pub manifest_dir: PathBuf,
}
