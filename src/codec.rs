//! # Kubeconfig Codec
//!
//! Parses the kubeconfig document stored in a cluster's credential secret and
//! writes it back out in the canonical YAML form consumed by `kubectl`.
//!
//! Decoding goes through [`kube::config::Kubeconfig`] so the on-disk file only
//! contains fields the Kubernetes tooling understands, regardless of how the
//! secret was produced.

use kube::config::Kubeconfig;
use thiserror::Error;

/// Errors raised while decoding a credential payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("credential payload is missing or empty")]
    EmptyPayload,
    #[error("credential payload is not a valid kubeconfig document: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("kubeconfig does not declare any cluster endpoint")]
    NoClusterEndpoint,
}

/// Error raised while serializing a descriptor back to YAML
#[derive(Debug, Error)]
#[error("failed to serialize kubeconfig: {0}")]
pub struct EncodeError(#[from] serde_yaml::Error);

/// Structured connection details for an external cluster
#[derive(Debug, Clone, Default)]
pub struct ConnectionDescriptor {
    kubeconfig: Kubeconfig,
}

impl ConnectionDescriptor {
    /// API server URLs of every cluster entry that declares one
    #[must_use]
    pub fn endpoints(&self) -> Vec<&str> {
        self.kubeconfig
            .clusters
            .iter()
            .filter_map(|named| named.cluster.as_ref()?.server.as_deref())
            .collect()
    }

    #[must_use]
    pub fn current_context(&self) -> Option<&str> {
        self.kubeconfig.current_context.as_deref()
    }

    /// Names of the user entries (auth material) in the document
    #[must_use]
    pub fn user_names(&self) -> Vec<&str> {
        self.kubeconfig
            .auth_infos
            .iter()
            .map(|named| named.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn kubeconfig(&self) -> &Kubeconfig {
        &self.kubeconfig
    }
}

/// Parse a raw credential payload into a [`ConnectionDescriptor`]
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload is empty, is not a kubeconfig
/// document, or declares no cluster endpoint to connect to.
pub fn decode(raw: &[u8]) -> Result<ConnectionDescriptor, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::EmptyPayload);
    }

    let kubeconfig: Kubeconfig = serde_yaml::from_slice(raw)?;
    let descriptor = ConnectionDescriptor { kubeconfig };

    if descriptor.endpoints().is_empty() {
        return Err(DecodeError::NoClusterEndpoint);
    }

    Ok(descriptor)
}

/// Serialize a descriptor into its canonical on-disk YAML form
///
/// # Errors
///
/// Only fails if the YAML serializer rejects the value, which does not happen
/// for descriptors produced by [`decode`].
pub fn encode(descriptor: &ConnectionDescriptor) -> Result<Vec<u8>, EncodeError> {
    let yaml = serde_yaml::to_string(&descriptor.kubeconfig)?;
    Ok(yaml.into_bytes())
}
