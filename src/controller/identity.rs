//! # Cluster Identity
//!
//! Maps kubeconfig secret names (`<cluster>-kubeconfig`) to the cluster name
//! used both as the EKS registration key and as the local kubeconfig file name.

use crate::constants::KUBECONFIG_SECRET_MARKER;
use std::fmt;

/// Stable name of an external cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterIdentity(String);

impl ClusterIdentity {
    /// Derive the identity from a secret name by stripping the marker suffix
    ///
    /// Only names ending in the marker are accepted. A marker elsewhere in the
    /// name would let two distinct secrets map to the same cluster
    /// (`a-kubeconfig-b` and `a-b-kubeconfig`), so such names yield `None`, as
    /// do names that consist of nothing but the marker.
    #[must_use]
    pub fn from_secret_name(name: &str) -> Option<Self> {
        let cluster = name.strip_suffix(KUBECONFIG_SECRET_MARKER)?;
        if cluster.is_empty() || cluster.contains(KUBECONFIG_SECRET_MARKER) {
            return None;
        }
        Some(Self(cluster.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClusterIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of matching a secret name against the watch filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Name carries the prefix and a well-formed marker suffix
    Accepted(ClusterIdentity),
    /// Name does not start with the prefix or lacks the marker
    Ignored,
    /// Name carries the marker but not as a unique suffix
    Ambiguous,
}

/// Secret name filter: configured prefix plus the kubeconfig marker
#[derive(Debug, Clone, Default)]
pub struct SecretNameFilter {
    prefix: String,
}

impl SecretNameFilter {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn classify(&self, name: &str) -> NameMatch {
        if !name.starts_with(&self.prefix) || !name.contains(KUBECONFIG_SECRET_MARKER) {
            return NameMatch::Ignored;
        }
        match ClusterIdentity::from_secret_name(name) {
            Some(identity) => NameMatch::Accepted(identity),
            None => NameMatch::Ambiguous,
        }
    }
}
