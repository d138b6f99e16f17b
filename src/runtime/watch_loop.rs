//! # Watch Loop
//!
//! Consumes secret events strictly one at a time. An event, including its
//! external commands and retry delays, is fully handled before the next one is
//! pulled from the stream, so a slow cluster delays everything queued behind it.

use crate::controller::{EventOutcome, Reconciler, SecretEvent};
use futures::{pin_mut, Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Counters for a finished watch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Events that passed the name filter
    pub handled: usize,
    /// Handled events that did not reach their intended end state
    pub failed: usize,
    /// Events dropped by the name filter
    pub ignored: usize,
    /// Errors reported by the event source
    pub stream_errors: usize,
}

/// Run the reconciler over `events` until the stream ends
pub async fn run_watch_loop<S, E>(events: S, reconciler: &Reconciler) -> WatchSummary
where
    S: Stream<Item = Result<SecretEvent, E>>,
    E: Display,
{
    info!("Starting kubeconfig secret watch loop...");
    pin_mut!(events);

    let mut summary = WatchSummary::default();
    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Secret watch error, waiting for the watcher to recover");
                summary.stream_errors += 1;
                continue;
            }
        };

        let outcome = reconciler.handle(event).await;
        debug!(?outcome, "Event handled");

        if outcome == EventOutcome::Ignored {
            summary.ignored += 1;
            continue;
        }
        summary.handled += 1;
        if !outcome.is_success() {
            summary.failed += 1;
        }
    }

    warn!(
        handled = summary.handled,
        failed = summary.failed,
        "Secret watch stream ended"
    );
    summary
}
