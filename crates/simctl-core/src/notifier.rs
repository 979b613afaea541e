//! Fan-out of simulation updates to connected clients.
//!
//! [`Notifier`] wraps a tokio broadcast channel. Every lifecycle
//! transition publishes one [`ClientMessage`]; the `WebSocket` handler
//! subscribes and forwards them. Publishing never blocks and never fails:
//! with no subscribers the message is dropped.

use simctl_types::{ClientMessage, Simulation};
use tokio::sync::broadcast;
use tracing::debug;

use crate::projection::to_response;

/// Broadcast handle shared by the controller and the transport.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ClientMessage>,
}

impl Notifier {
    /// Create a notifier whose subscribers can lag by `capacity` messages
    /// before they start skipping.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a message to every subscriber.
    ///
    /// Returns the number of receivers reached; 0 when nobody listens.
    pub fn broadcast(&self, message: &ClientMessage) -> usize {
        // send only errors when there are no receivers
        self.tx.send(message.clone()).unwrap_or(0)
    }

    /// Publish the projected state of `sim` as a `SimulationUpdate`.
    pub fn notify_update(&self, sim: &Simulation) -> usize {
        let reached = self.broadcast(&ClientMessage::SimulationUpdate(to_response(sim)));
        debug!(
            simulation_id = %sim.id,
            status = %sim.status,
            reached,
            "Broadcast simulation update"
        );
        reached
    }
}

#[cfg(test)]
mod tests {
    use simctl_types::{SimulationId, SimulationStatus};

    use super::*;

    #[test]
    fn broadcast_without_subscribers_reaches_nobody() {
        let notifier = Notifier::new(4);
        assert_eq!(notifier.notify_update(&Simulation::default()), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_projected_update() {
        let notifier = Notifier::new(4);
        let mut rx = notifier.subscribe();

        let sim = Simulation {
            id: SimulationId::new(42),
            status: SimulationStatus::Initializing,
            ..Simulation::default()
        };
        assert_eq!(notifier.notify_update(&sim), 1);

        let received = rx.recv().await;
        assert!(matches!(
            received,
            Ok(ClientMessage::SimulationUpdate(ref resp))
                if resp.id == SimulationId::new(42) && resp.status == SimulationStatus::Initializing
        ));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let notifier = Notifier::new(0);
        let _rx = notifier.subscribe();
        assert_eq!(notifier.receiver_count(), 1);
    }
}
