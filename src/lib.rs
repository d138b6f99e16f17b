//! # Cluster Registration Controller
//!
//! Watches kubeconfig secrets (`<cluster>-kubeconfig`) and keeps the EKS
//! Connector fleet registration in step with them:
//!
//! 1. **Watching secrets** - Observes secrets in one namespace or cluster-wide
//! 2. **Writing kubeconfigs** - Decodes each secret's kubeconfig and writes it to disk
//! 3. **Registering clusters** - Runs `eksctl register cluster` for new clusters
//! 4. **Installing the connector** - Applies the EKS Connector manifests with `kubectl`
//! 5. **Deregistering clusters** - Runs `eksctl deregister cluster` when a secret is deleted

pub mod cli;
pub mod codec;
pub mod command;
pub mod config;
pub mod constants;
pub mod controller;
pub mod manifests;
pub mod observability;
pub mod registration;
pub mod runtime;
pub mod server;
