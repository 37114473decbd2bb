use std::fmt;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique viewer connection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The connection's writer has gone away; the client was pruned.
    Disconnected,
}

/// Result of pushing one artifact to one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub client: ClientId,
    pub outcome: SendOutcome,
}

impl DeliveryReport {
    pub fn delivered(&self) -> bool {
        self.outcome == SendOutcome::Delivered
    }
}

/// Set of currently open viewer connections.
///
/// Each entry holds the sending half of the connection's outbound queue; the
/// connection task owns the receiving half and writes it to the socket.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, mpsc::UnboundedSender<String>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client and return its ID + outbound queue.
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(id.clone(), tx);
        (id, rx)
    }

    pub fn unregister(&self, id: &ClientId) -> bool {
        self.clients.remove(id).is_some()
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Push the markup to every registered client. A client whose queue is
    /// closed is reported `Disconnected` and pruned; the others still get it.
    pub fn broadcast(&self, markup: &str) -> Vec<DeliveryReport> {
        let targets: Vec<ClientId> = self.clients.iter().map(|e| e.key().clone()).collect();
        let mut reports = Vec::with_capacity(targets.len());

        for id in &targets {
            // Clone the sender so no map shard stays locked across the removal below.
            let Some(tx) = self.clients.get(id).map(|e| e.value().clone()) else {
                continue;
            };
            let outcome = match tx.send(markup.to_string()) {
                Ok(()) => SendOutcome::Delivered,
                Err(_) => {
                    tracing::debug!(client = %id, "viewer gone, dropping from registry");
                    self.clients.remove(id);
                    SendOutcome::Disconnected
                }
            };
            reports.push(DeliveryReport {
                client: id.clone(),
                outcome,
            });
        }

        reports
    }
}
