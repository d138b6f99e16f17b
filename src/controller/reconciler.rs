//! # Reconciler
//!
//! Drives EKS Connector registration from kubeconfig secret events.
//!
//! ## Event Flow
//!
//! Each event is filtered by secret name and mapped to a [`ClusterIdentity`].
//!
//! **Added / Modified** (handled identically):
//! 1. Decode the kubeconfig payload
//! 2. Write it to `<work_dir>/<cluster>`, overwriting any previous file
//! 3. Check whether the cluster is already registered
//! 4. Register it if not (or if the check failed)
//! 5. Apply the EKS Connector manifests, with bounded retry
//!
//! **Deleted**:
//! 1. Check whether the cluster is registered; stop if it is not
//! 2. Deregister it
//!
//! The local kubeconfig file is not removed on delete.
//!
//! Failures are logged with the cluster identity and cause and never stop the
//! loop. Decode and write failures abandon the event without retry; the next
//! modification of the secret is the only way to recover.

use crate::codec::{self, DecodeError, EncodeError};
use crate::config::ControllerConfig;
use crate::controller::backoff::RetryPolicy;
use crate::controller::event::{CredentialObject, SecretEvent};
use crate::controller::identity::{ClusterIdentity, NameMatch, SecretNameFilter};
use crate::manifests::{self, ManifestApplier};
use crate::observability::metrics;
use crate::registration::{Registrar, RegistrationRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Writing the cluster's kubeconfig file failed
#[derive(Debug, Error)]
#[error("failed to write kubeconfig file {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure while turning the secret payload into a kubeconfig file
#[derive(Debug, Error)]
enum PrepareError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("kubeconfig file {} would overwrite an EKS Connector manifest", path.display())]
    ManifestCollision { path: PathBuf },
}

impl PrepareError {
    fn stage(&self) -> AbandonStage {
        match self {
            PrepareError::Decode(_) | PrepareError::Encode(_) => AbandonStage::Decode,
            PrepareError::Write(_) | PrepareError::ManifestCollision { .. } => {
                AbandonStage::Write
            }
        }
    }
}

/// Step at which an add event was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonStage {
    Decode,
    Write,
}

impl AbandonStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AbandonStage::Decode => "decode",
            AbandonStage::Write => "write",
        }
    }
}

/// What happened to the registration during an add event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    AlreadyRegistered,
    Registered,
    Failed,
}

/// Result of handling a single secret event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Name did not match the prefix/marker filter
    Ignored,
    /// Name carries the marker somewhere other than as a unique suffix
    Rejected,
    /// Kubeconfig could not be decoded or written; nothing was registered
    Abandoned {
        cluster: ClusterIdentity,
        stage: AbandonStage,
    },
    /// Manifests applied
    Applied {
        cluster: ClusterIdentity,
        registration: RegistrationStep,
        attempts: u32,
    },
    /// Every manifest apply attempt failed
    ApplyAbandoned {
        cluster: ClusterIdentity,
        registration: RegistrationStep,
        attempts: u32,
    },
    Deregistered {
        cluster: ClusterIdentity,
    },
    AlreadyDeregistered {
        cluster: ClusterIdentity,
    },
    DeregisterFailed {
        cluster: ClusterIdentity,
    },
}

impl EventOutcome {
    /// Whether the event reached its intended end state
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            EventOutcome::Ignored
            | EventOutcome::Deregistered { .. }
            | EventOutcome::AlreadyDeregistered { .. } => true,
            EventOutcome::Applied { registration, .. } => {
                *registration != RegistrationStep::Failed
            }
            EventOutcome::Rejected
            | EventOutcome::Abandoned { .. }
            | EventOutcome::ApplyAbandoned { .. }
            | EventOutcome::DeregisterFailed { .. } => false,
        }
    }
}

/// Reconciles the fleet registration service with kubeconfig secrets
pub struct Reconciler {
    filter: SecretNameFilter,
    registration: RegistrationRequest,
    apply_retry: RetryPolicy,
    manifests: Vec<PathBuf>,
    work_dir: PathBuf,
    registrar: Arc<dyn Registrar>,
    applier: Arc<dyn ManifestApplier>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("prefix", &self.filter.prefix())
            .field("region", &self.registration.region)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        config: &ControllerConfig,
        registrar: Arc<dyn Registrar>,
        applier: Arc<dyn ManifestApplier>,
    ) -> Self {
        Self {
            filter: SecretNameFilter::new(config.prefix.clone()),
            registration: config.registration.clone(),
            apply_retry: config.apply_retry,
            manifests: config.manifest_paths(),
            work_dir: config.work_dir.clone(),
            registrar,
            applier,
        }
    }

    /// Handle one event to completion, including retries
    pub async fn handle(&self, event: SecretEvent) -> EventOutcome {
        let span = info_span!(
            "reconcile.event",
            secret.name = event.object().name.as_str(),
            secret.namespace = event.object().namespace.as_deref().unwrap_or(""),
            event.kind = event.kind(),
        );
        let start = Instant::now();

        let outcome = self.handle_inner(event).instrument(span).await;

        if outcome != EventOutcome::Ignored {
            metrics::observe_event_duration(start.elapsed().as_secs_f64());
        }
        outcome
    }

    async fn handle_inner(&self, event: SecretEvent) -> EventOutcome {
        let cluster = match self.filter.classify(&event.object().name) {
            NameMatch::Accepted(cluster) => cluster,
            NameMatch::Ignored => {
                debug!("Ignoring secret that does not match the kubeconfig filter");
                metrics::increment_events_ignored();
                return EventOutcome::Ignored;
            }
            NameMatch::Ambiguous => {
                warn!(
                    "Ignoring kubeconfig secret: the name must end with the marker exactly once to map to a unique cluster"
                );
                metrics::increment_event_failures("name");
                return EventOutcome::Rejected;
            }
        };

        metrics::increment_events(event.kind());

        match event {
            SecretEvent::Added(obj) | SecretEvent::Modified(obj) => self.add(cluster, &obj).await,
            SecretEvent::Deleted(obj) => self.remove(cluster, &obj).await,
        }
    }

    async fn add(&self, cluster: ClusterIdentity, obj: &CredentialObject) -> EventOutcome {
        info!(
            cluster.identity = %cluster,
            "Detected new kubeconfig secret {}", obj.name
        );

        let kubeconfig_path = match self.write_kubeconfig(&cluster, obj).await {
            Ok(path) => path,
            Err(e) => {
                let stage = e.stage();
                error!(
                    cluster.identity = %cluster,
                    operation = stage.as_str(),
                    error = %e,
                    "Failed to prepare kubeconfig file, abandoning event"
                );
                metrics::increment_event_failures(stage.as_str());
                return EventOutcome::Abandoned { cluster, stage };
            }
        };

        let registration = self.ensure_registered(&cluster).await;

        match manifests::apply_with_retry(
            self.applier.as_ref(),
            &self.apply_retry,
            cluster.as_str(),
            &kubeconfig_path,
            &self.manifests,
        )
        .await
        {
            Ok(attempts) => {
                if registration == RegistrationStep::Failed {
                    warn!(
                        cluster.identity = %cluster,
                        attempts,
                        "Registration manifests applied but cluster registration failed"
                    );
                } else {
                    info!(
                        cluster.identity = %cluster,
                        attempts,
                        "Cluster '{}' registered successfully", cluster
                    );
                }
                EventOutcome::Applied {
                    cluster,
                    registration,
                    attempts,
                }
            }
            Err(abandoned) => {
                error!(
                    cluster.identity = %cluster,
                    operation = "apply",
                    attempts = abandoned.attempts,
                    error = %abandoned.last_error,
                    "Failed to apply registration manifests, aborting"
                );
                metrics::increment_event_failures("apply");
                EventOutcome::ApplyAbandoned {
                    cluster,
                    registration,
                    attempts: abandoned.attempts,
                }
            }
        }
    }

    /// Kubeconfig file written for `cluster`, named after the cluster itself
    fn credential_path(&self, cluster: &ClusterIdentity) -> PathBuf {
        self.work_dir.join(cluster.as_str())
    }

    async fn write_kubeconfig(
        &self,
        cluster: &ClusterIdentity,
        obj: &CredentialObject,
    ) -> Result<PathBuf, PrepareError> {
        let descriptor = codec::decode(obj.payload.as_deref().unwrap_or_default())?;
        let bytes = codec::encode(&descriptor)?;

        let path = self.credential_path(cluster);
        if self.manifests.contains(&path) {
            return Err(PrepareError::ManifestCollision { path });
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| WriteError {
                path: path.clone(),
                source,
            })?;

        debug!(
            cluster.identity = %cluster,
            path = %path.display(),
            endpoints = ?descriptor.endpoints(),
            "Wrote kubeconfig file"
        );
        Ok(path)
    }

    async fn ensure_registered(&self, cluster: &ClusterIdentity) -> RegistrationStep {
        match self
            .registrar
            .is_registered(cluster, &self.registration.region)
            .await
        {
            Ok(true) => {
                // Only the register call is skipped; the manifests are still applied.
                info!(cluster.identity = %cluster, "Cluster '{}' already registered", cluster);
                return RegistrationStep::AlreadyRegistered;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    cluster.identity = %cluster,
                    operation = "query",
                    error = %e,
                    "Could not determine registration state, attempting registration"
                );
            }
        }

        match self.registrar.register(cluster, &self.registration).await {
            Ok(()) => {
                info!(
                    cluster.identity = %cluster,
                    provider = self.registration.provider.as_str(),
                    region = self.registration.region.as_str(),
                    "Registered cluster with EKS Connector"
                );
                metrics::increment_registrations();
                RegistrationStep::Registered
            }
            Err(e) => {
                error!(
                    cluster.identity = %cluster,
                    operation = "register",
                    error = %e,
                    "Failed to register cluster '{}'", cluster
                );
                metrics::increment_event_failures("register");
                RegistrationStep::Failed
            }
        }
    }

    async fn remove(&self, cluster: ClusterIdentity, obj: &CredentialObject) -> EventOutcome {
        info!(
            cluster.identity = %cluster,
            "Detected deleted kubeconfig secret {}", obj.name
        );

        match self
            .registrar
            .is_registered(&cluster, &self.registration.region)
            .await
        {
            Ok(false) => {
                info!(cluster.identity = %cluster, "Cluster '{}' already deregistered", cluster);
                return EventOutcome::AlreadyDeregistered { cluster };
            }
            Ok(true) => {}
            Err(e) => {
                warn!(
                    cluster.identity = %cluster,
                    operation = "query",
                    error = %e,
                    "Could not determine registration state, attempting deregistration"
                );
            }
        }

        match self
            .registrar
            .deregister(&cluster, &self.registration.region)
            .await
        {
            Ok(()) => {
                // The kubeconfig file stays on disk; nothing cleans it up.
                info!(
                    cluster.identity = %cluster,
                    kubeconfig = %self.credential_path(&cluster).display(),
                    "Cluster '{}' deregistered successfully", cluster
                );
                metrics::increment_deregistrations();
                EventOutcome::Deregistered { cluster }
            }
            Err(e) => {
                error!(
                    cluster.identity = %cluster,
                    operation = "deregister",
                    error = %e,
                    "Failed to deregister cluster '{}'", cluster
                );
                metrics::increment_event_failures("deregister");
                EventOutcome::DeregisterFailed { cluster }
            }
        }
    }
}
