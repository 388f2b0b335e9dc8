// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Publication Sinks
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Where the harness hands each completed comparison.

use elyzer_types::state::Publication;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives one publication per completed cycle, in cycle order.
pub trait ComparisonSink: Send {
    fn publish(&mut self, publication: &Publication);
}

/// Collects publications in memory.
impl ComparisonSink for Vec<Publication> {
    fn publish(&mut self, publication: &Publication) {
        self.push(publication.clone());
    }
}

/// Forwards publications to an async consumer.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Publication>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Publication>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Publication>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ComparisonSink for ChannelSink {
    fn publish(&mut self, publication: &Publication) {
        if self.tx.send(publication.clone()).is_err() {
            warn!(
                cycle = publication.snapshot.cycle,
                "publication receiver dropped"
            );
        }
    }
}
