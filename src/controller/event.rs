//! # Secret Events
//!
//! Typed change events for kubeconfig secrets.
//!
//! The raw watch stream yields [`kube_runtime::watcher::Event`]s over
//! [`Secret`]s. They are converted once, at the stream boundary, into
//! [`SecretEvent`]s carrying only what the reconciler needs.

use crate::constants::KUBECONFIG_SECRET_DATA_KEY;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::watcher::{self, watcher, Event};
use kube_runtime::WatchStreamExt;

/// A secret as observed by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialObject {
    pub name: String,
    pub namespace: Option<String>,
    /// Raw bytes stored under the `value` key, if present
    pub payload: Option<Vec<u8>>,
}

impl CredentialObject {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Option<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            payload,
        }
    }
}

impl From<Secret> for CredentialObject {
    fn from(secret: Secret) -> Self {
        let name = secret.name_any();
        let namespace = secret.namespace();
        let payload = secret
            .data
            .and_then(|mut data| data.remove(KUBECONFIG_SECRET_DATA_KEY))
            .map(|bytes| bytes.0);
        Self {
            name,
            namespace,
            payload,
        }
    }
}

/// Change observed on a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretEvent {
    Added(CredentialObject),
    Modified(CredentialObject),
    Deleted(CredentialObject),
}

impl SecretEvent {
    #[must_use]
    pub fn object(&self) -> &CredentialObject {
        match self {
            SecretEvent::Added(obj) | SecretEvent::Modified(obj) | SecretEvent::Deleted(obj) => obj,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SecretEvent::Added(_) => "added",
            SecretEvent::Modified(_) => "modified",
            SecretEvent::Deleted(_) => "deleted",
        }
    }

    /// Convert a watcher event; list-phase markers carry no object and map to `None`
    #[must_use]
    pub fn from_watcher_event(event: Event<Secret>) -> Option<Self> {
        match event {
            Event::InitApply(secret) => Some(SecretEvent::Added(secret.into())),
            Event::Apply(secret) => Some(SecretEvent::Modified(secret.into())),
            Event::Delete(secret) => Some(SecretEvent::Deleted(secret.into())),
            Event::Init | Event::InitDone => None,
        }
    }
}

/// Live stream of secret events
///
/// Reconnection after watch errors is handled here, around the source, by the
/// watcher's default backoff. Errors are still surfaced so they can be logged.
pub fn secret_events(
    api: Api<Secret>,
) -> impl Stream<Item = Result<SecretEvent, watcher::Error>> + Send {
    watcher(api, watcher::Config::default())
        .default_backoff()
        .filter_map(|result| async move {
            match result {
                Ok(event) => SecretEvent::from_watcher_event(event).map(Ok),
                Err(e) => Some(Err(e)),
            }
        })
}
