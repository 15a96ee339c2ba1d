//! Progress reporting channel
//!
//! Progress is an explicit bounded channel rather than a callback: a slow
//! or dead consumer can never affect pipeline correctness. Events are
//! dropped when the buffer is full, and a monotonic guard ensures `pct`
//! never goes backwards within a request.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use climate_agent_core::ProgressEvent;

/// Default channel capacity; the fixed stage schedule emits fewer events
/// than this, so drops only happen with a wedged consumer
pub const DEFAULT_CAPACITY: usize = 32;

/// Sending half of a progress channel
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
    last_pct_bits: Arc<AtomicU32>,
}

impl ProgressSender {
    /// Emit a progress event. Non-monotonic events are discarded; a full
    /// or closed channel drops the event silently.
    pub fn send(&self, stage: &str, pct: f32) {
        let event = ProgressEvent::new(stage, pct);

        let mut current = self.last_pct_bits.load(Ordering::Acquire);
        loop {
            if event.pct < f32::from_bits(current) {
                tracing::debug!(stage, pct = event.pct, "dropping non-monotonic progress event");
                return;
            }
            match self.last_pct_bits.compare_exchange_weak(
                current,
                event.pct.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!(error = %e, "progress consumer not keeping up, dropping event");
        }
    }
}

/// Create a progress channel with the given buffer capacity
pub fn progress_channel(capacity: usize) -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ProgressSender {
            tx,
            last_pct_bits: Arc::new(AtomicU32::new(0f32.to_bits())),
        },
        rx,
    )
}
