//! Fan-out of emitted events to every registered handler.
//!
//! Handlers of one event run concurrently, each in its own task, so a
//! failing or panicking handler never stops its siblings.

use crate::mapping::Payload;
use crate::registry::{HandlerOutcome, MappingRegistry};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-dispatch counts, for observability. Callers are free to ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub event: String,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            ..Self::default()
        }
    }

    /// Number of handlers that ran.
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.failed
    }
}

/// Fans events out to every registered handler.
///
/// Handlers for one event run concurrently, each in its own tokio task, and
/// `dispatch` resolves once all of them have finished. A failing or
/// panicking handler is logged and counted; it never stops the others and
/// never reaches the emitter.
///
/// `EventDispatcher` is `Clone` and shares the frozen registry.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<MappingRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: MappingRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, event: &str, payload: Payload) -> DispatchSummary {
        let mut summary = DispatchSummary::new(event);
        let handlers = self.registry.handlers_for(event);
        if handlers.is_empty() {
            tracing::debug!(event, "no handlers registered");
            return summary;
        }

        let payload = Arc::new(payload);
        let tasks = handlers.iter().map(|handler| {
            let handler = handler.clone();
            let payload = payload.clone();
            tokio::spawn(async move { handler(payload).await })
        });

        for result in join_all(tasks).await {
            match result {
                Ok(Ok(HandlerOutcome::Synced)) => summary.synced += 1,
                Ok(Ok(HandlerOutcome::Skipped(reason))) => {
                    tracing::warn!(event, reason = %reason, "skipped relationship mapping");
                    summary.skipped += 1;
                }
                Ok(Err(err)) => {
                    tracing::error!(event, error = %err, "relationship sync failed");
                    summary.failed += 1;
                }
                Err(join_err) => {
                    tracing::error!(event, error = %join_err, "relationship handler panicked");
                    summary.failed += 1;
                }
            }
        }

        tracing::debug!(
            event,
            synced = summary.synced,
            skipped = summary.skipped,
            failed = summary.failed,
            "event dispatched"
        );
        summary
    }

    /// Same as [`dispatch`](Self::dispatch).
    pub async fn emit(&self, event: &str, payload: Payload) -> DispatchSummary {
        self.dispatch(event, payload).await
    }
}
