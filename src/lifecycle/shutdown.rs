//! Process-wide stop request.
//!
//! The signal listener (or a test harness) fires the trigger once. The gRPC
//! server holds a subscription; on the first message it stops accepting
//! connections and starts the stream grace period (see `GrpcServer::run`).

use tokio::sync::broadcast;

/// One-shot stop request fanned out to every subscriber.
///
/// Cloning shares the same channel, so the signal listener and the caller
/// that built the server can both fire it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to hand to a server before it starts serving.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. Receivers created afterwards miss it.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = notified, "Shutdown triggered");
    }

    /// Subscribers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
