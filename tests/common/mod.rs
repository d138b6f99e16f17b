//! Common test utilities for reconciler integration tests
//!
//! Provides in-memory stand-ins for `eksctl` and `kubectl` plus helpers to
//! build a controller configuration rooted in a temporary directory.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use clap::Parser;
use cluster_registration_controller::cli::Cli;
use cluster_registration_controller::command::CommandError;
use cluster_registration_controller::config::ControllerConfig;
use cluster_registration_controller::controller::{
    ClusterIdentity, CredentialObject, Reconciler, SecretEvent,
};
use cluster_registration_controller::manifests::{ApplyError, ManifestApplier};
use cluster_registration_controller::registration::{
    is_not_found_output, DeregisterError, QueryError, RegisterError, Registrar,
    RegistrationRequest,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const REGION: &str = "us-east-1";
pub const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/eks-connector";

pub const VALID_KUBECONFIG: &str = r"
apiVersion: v1
kind: Config
clusters:
- name: prod-east
  cluster:
    server: https://prod-east.example.com:6443
    certificate-authority-data: Y2VydA==
users:
- name: prod-east-admin
  user:
    client-certificate-data: Y2xpZW50
    client-key-data: a2V5
contexts:
- name: prod-east-admin@prod-east
  context:
    cluster: prod-east
    user: prod-east-admin
current-context: prod-east-admin@prod-east
";

/// A call received by [`FakeRegistrar`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrarCall {
    Query(String),
    Register {
        cluster: String,
        provider: String,
        region: String,
        role_arn: String,
    },
    Deregister {
        cluster: String,
        region: String,
    },
}

fn fake_failure(text: &str) -> CommandError {
    CommandError::Spawn {
        program: "eksctl".to_string(),
        source: std::io::Error::other(text.to_string()),
    }
}

/// In-memory fleet registration service
#[derive(Debug, Default)]
pub struct FakeRegistrar {
    registered: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RegistrarCall>>,
    /// Text of the error every query fails with, if set
    query_failure: Mutex<Option<String>>,
    fail_register: Mutex<bool>,
    fail_deregister: Mutex<bool>,
}

impl FakeRegistrar {
    pub fn with_registered(clusters: &[&str]) -> Self {
        let fake = Self::default();
        fake.registered
            .lock()
            .expect("lock")
            .extend(clusters.iter().map(ToString::to_string));
        fake
    }

    /// Make queries fail with `text`; texts containing `404` mean "not found"
    pub fn fail_queries_with(&self, text: &str) {
        *self.query_failure.lock().expect("lock") = Some(text.to_string());
    }

    pub fn fail_register(&self) {
        *self.fail_register.lock().expect("lock") = true;
    }

    pub fn fail_deregister(&self) {
        *self.fail_deregister.lock().expect("lock") = true;
    }

    pub fn calls(&self) -> Vec<RegistrarCall> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn register_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RegistrarCall::Register { .. }))
            .count()
    }

    pub fn deregister_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RegistrarCall::Deregister { .. }))
            .count()
    }

    pub fn is_registered_now(&self, cluster: &str) -> bool {
        self.registered.lock().expect("lock").contains(cluster)
    }

    fn record(&self, call: RegistrarCall) {
        self.calls.lock().expect("lock").push(call);
    }
}

#[async_trait]
impl Registrar for FakeRegistrar {
    async fn is_registered(
        &self,
        cluster: &ClusterIdentity,
        _region: &str,
    ) -> Result<bool, QueryError> {
        self.record(RegistrarCall::Query(cluster.to_string()));

        if let Some(text) = self.query_failure.lock().expect("lock").clone() {
            if is_not_found_output(&text) {
                return Ok(false);
            }
            return Err(QueryError {
                cluster: cluster.to_string(),
                source: fake_failure(&text),
            });
        }

        Ok(self.is_registered_now(cluster.as_str()))
    }

    async fn register(
        &self,
        cluster: &ClusterIdentity,
        request: &RegistrationRequest,
    ) -> Result<(), RegisterError> {
        self.record(RegistrarCall::Register {
            cluster: cluster.to_string(),
            provider: request.provider.clone(),
            region: request.region.clone(),
            role_arn: request.role_arn.clone(),
        });

        if *self.fail_register.lock().expect("lock") {
            return Err(RegisterError {
                cluster: cluster.to_string(),
                source: fake_failure("AccessDeniedException: status code: 403"),
            });
        }

        self.registered
            .lock()
            .expect("lock")
            .insert(cluster.to_string());
        Ok(())
    }

    async fn deregister(
        &self,
        cluster: &ClusterIdentity,
        region: &str,
    ) -> Result<(), DeregisterError> {
        self.record(RegistrarCall::Deregister {
            cluster: cluster.to_string(),
            region: region.to_string(),
        });

        if *self.fail_deregister.lock().expect("lock") {
            return Err(DeregisterError {
                cluster: cluster.to_string(),
                source: fake_failure("ThrottlingException: status code: 400"),
            });
        }

        self.registered.lock().expect("lock").remove(cluster.as_str());
        Ok(())
    }
}

/// A call received by [`FakeApplier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCall {
    pub kubeconfig: PathBuf,
    pub manifests: Vec<PathBuf>,
    /// Whether the kubeconfig file existed when apply was called
    pub kubeconfig_present: bool,
}

/// In-memory manifest applier failing its first `failures` calls
#[derive(Debug, Default)]
pub struct FakeApplier {
    failures: usize,
    calls: Mutex<Vec<ApplyCall>>,
}

impl FakeApplier {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApplyCall> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ManifestApplier for FakeApplier {
    async fn apply(&self, kubeconfig: &Path, manifests: &[PathBuf]) -> Result<(), ApplyError> {
        let attempt = {
            let mut calls = self.calls.lock().expect("lock");
            calls.push(ApplyCall {
                kubeconfig: kubeconfig.to_path_buf(),
                manifests: manifests.to_vec(),
                kubeconfig_present: kubeconfig.exists(),
            });
            calls.len()
        };

        if attempt <= self.failures {
            return Err(ApplyError {
                kubeconfig: kubeconfig.to_path_buf(),
                source: CommandError::Spawn {
                    program: "kubectl".to_string(),
                    source: std::io::Error::other("Unable to connect to the server"),
                },
            });
        }
        Ok(())
    }
}

/// Configuration rooted in `work_dir`, with no delay between apply retries
pub fn test_config(work_dir: &Path, prefix: &str) -> ControllerConfig {
    let cli = Cli::parse_from([
        "cluster-registration-controller",
        "--prefix",
        prefix,
        "--work-dir",
        work_dir.to_str().expect("utf-8 temp dir"),
        "--manifest-dir",
        "/manifests",
    ]);
    ControllerConfig::from_cli_and_lookup(cli, |key| match key {
        "AWS_DEFAULT_REGION" => Some(REGION.to_string()),
        "AWS_EKS_CONNECTOR_ROLE_ARN" => Some(ROLE_ARN.to_string()),
        "APPLY_RETRY_DELAY_SECS" => Some("0".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

/// Reconciler wired to the given fakes
pub fn reconciler(
    config: &ControllerConfig,
    registrar: &Arc<FakeRegistrar>,
    applier: &Arc<FakeApplier>,
) -> Reconciler {
    Reconciler::new(
        config,
        Arc::clone(registrar) as Arc<dyn Registrar>,
        Arc::clone(applier) as Arc<dyn ManifestApplier>,
    )
}

pub fn added(name: &str, payload: &str) -> SecretEvent {
    SecretEvent::Added(CredentialObject::new(name, Some(payload.as_bytes().to_vec())))
}

pub fn modified(name: &str, payload: &str) -> SecretEvent {
    SecretEvent::Modified(CredentialObject::new(name, Some(payload.as_bytes().to_vec())))
}

pub fn deleted(name: &str) -> SecretEvent {
    SecretEvent::Deleted(CredentialObject::new(name, None))
}

pub fn cluster(name: &str) -> ClusterIdentity {
    ClusterIdentity::from_secret_name(&format!("{name}-kubeconfig")).expect("valid cluster name")
}
