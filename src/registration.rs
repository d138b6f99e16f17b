//! # Cluster Registration
//!
//! Registration of external clusters with the EKS Connector fleet service.
//!
//! The reconciler only depends on the [`Registrar`] trait. The production
//! implementation, [`EksctlRegistrar`], shells out to `eksctl`; tests use an
//! in-memory fake.

use crate::command::{self, CommandError};
use crate::controller::identity::ClusterIdentity;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// The registration state could not be determined
#[derive(Debug, Error)]
#[error("failed to query registration of cluster '{cluster}': {source}")]
pub struct QueryError {
    pub cluster: String,
    #[source]
    pub source: CommandError,
}

#[derive(Debug, Error)]
#[error("failed to register cluster '{cluster}': {source}")]
pub struct RegisterError {
    pub cluster: String,
    #[source]
    pub source: CommandError,
}

#[derive(Debug, Error)]
#[error("failed to deregister cluster '{cluster}': {source}")]
pub struct DeregisterError {
    pub cluster: String,
    #[source]
    pub source: CommandError,
}

/// Parameters for registering a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub provider: String,
    pub region: String,
    pub role_arn: String,
}

/// Fleet registration service
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Whether the cluster is currently registered
    ///
    /// A "not found" answer from the service is `Ok(false)`, not an error.
    async fn is_registered(&self, cluster: &ClusterIdentity, region: &str)
        -> Result<bool, QueryError>;

    async fn register(
        &self,
        cluster: &ClusterIdentity,
        request: &RegistrationRequest,
    ) -> Result<(), RegisterError>;

    async fn deregister(&self, cluster: &ClusterIdentity, region: &str)
        -> Result<(), DeregisterError>;
}

/// Whether a failed registration query means the cluster does not exist
///
/// `eksctl` exposes no structured status for this, so the decision rests on
/// the HTTP status code appearing in its error text. Keep all knowledge of
/// that format in this function.
#[must_use]
pub fn is_not_found_output(output: &str) -> bool {
    output.contains("404")
}

/// [`Registrar`] backed by the `eksctl` binary
#[derive(Debug, Clone)]
pub struct EksctlRegistrar {
    binary: PathBuf,
}

impl EksctlRegistrar {
    #[must_use]
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[must_use]
pub fn get_cluster_args(cluster: &ClusterIdentity, region: &str) -> Vec<String> {
    vec![
        "get".to_string(),
        "cluster".to_string(),
        "--name".to_string(),
        cluster.to_string(),
        "--region".to_string(),
        region.to_string(),
    ]
}

#[must_use]
pub fn register_cluster_args(
    cluster: &ClusterIdentity,
    request: &RegistrationRequest,
) -> Vec<String> {
    vec![
        "register".to_string(),
        "cluster".to_string(),
        "--name".to_string(),
        cluster.to_string(),
        "--provider".to_string(),
        request.provider.clone(),
        "--region".to_string(),
        request.region.clone(),
        "--role-arn".to_string(),
        request.role_arn.clone(),
    ]
}

#[must_use]
pub fn deregister_cluster_args(cluster: &ClusterIdentity, region: &str) -> Vec<String> {
    vec![
        "deregister".to_string(),
        "cluster".to_string(),
        "--name".to_string(),
        cluster.to_string(),
        "--region".to_string(),
        region.to_string(),
    ]
}

#[async_trait]
impl Registrar for EksctlRegistrar {
    async fn is_registered(
        &self,
        cluster: &ClusterIdentity,
        region: &str,
    ) -> Result<bool, QueryError> {
        match command::run(&self.binary, get_cluster_args(cluster, region)).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found_output(e.output()) => {
                debug!(
                    cluster.identity = %cluster,
                    "eksctl reported cluster not found"
                );
                Ok(false)
            }
            Err(source) => Err(QueryError {
                cluster: cluster.to_string(),
                source,
            }),
        }
    }

    async fn register(
        &self,
        cluster: &ClusterIdentity,
        request: &RegistrationRequest,
    ) -> Result<(), RegisterError> {
        command::run(&self.binary, register_cluster_args(cluster, request))
            .await
            .map(|_| ())
            .map_err(|source| RegisterError {
                cluster: cluster.to_string(),
                source,
            })
    }

    async fn deregister(
        &self,
        cluster: &ClusterIdentity,
        region: &str,
    ) -> Result<(), DeregisterError> {
        command::run(&self.binary, deregister_cluster_args(cluster, region))
            .await
            .map(|_| ())
            .map_err(|source| DeregisterError {
                cluster: cluster.to_string(),
                source,
            })
    }
}
