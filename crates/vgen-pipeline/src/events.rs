//! In-process event channel for pipeline observers.
//!
//! Each observer gets its own unbounded channel and owns its consumption
//! loop, so a slow or panicking observer never stalls emission or affects
//! what other observers receive. Emission with zero observers is a no-op.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

use vgen_models::PipelineEvent;

/// Publish/subscribe channel for [`PipelineEvent`]s.
///
/// Cloning the bus shares the observer list; events emitted through any
/// clone reach every subscriber. Observers whose receiver has been dropped
/// are pruned on the next emission.
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Arc<Mutex<Vec<mpsc::UnboundedSender<PipelineEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a new observer. Events emitted after this call arrive on
    /// the returned receiver in emission order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Attach an externally created sender as an observer.
    pub fn attach(&self, sender: mpsc::UnboundedSender<PipelineEvent>) {
        self.lock().push(sender);
    }

    /// Emit an event to every live observer. Never fails; disconnected
    /// observers are dropped from the list.
    pub fn emit(&self, event: PipelineEvent) {
        let mut observers = self.lock();
        if observers.is_empty() {
            return;
        }
        trace!(pipeline_id = %event.pipeline_id, "Emitting pipeline event");
        observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<PipelineEvent>>> {
        // A panicking observer task cannot poison this lock (sends are
        // non-blocking), but recover anyway rather than propagate.
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
