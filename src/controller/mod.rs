//! # Controller
//!
//! Watch-driven reconciliation of kubeconfig secrets against the EKS Connector
//! fleet registration service.

pub mod backoff;
pub mod event;
pub mod identity;
pub mod reconciler;

pub use event::{CredentialObject, SecretEvent};
pub use identity::ClusterIdentity;
pub use reconciler::{EventOutcome, Reconciler};
