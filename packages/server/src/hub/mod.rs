//! Broadcast hub
//!
//! The hub owns the registry of connected clients. Registry mutation and
//! fan-out happen only inside [`Hub::run`], a single control loop fed by
//! three bounded intake queues (register, unregister, broadcast). Other
//! tasks talk to it through a cloneable [`HubHandle`]; nothing outside
//! the loop ever touches the registry, so no lock is needed.
//!
//! ## Delivery policy
//!
//! Broadcast never blocks. Each registered client gets a non-blocking
//! enqueue onto its outbound queue; a client whose queue is full (slow
//! consumer) or already closed is removed from the registry on the spot.
//! Removal drops the registry's sender, which closes the outbound queue
//! exactly once.

mod client;
mod producer;

pub use client::{Client, read_loop, write_loop};
pub use producer::SnapshotProducer;

use std::{collections::HashMap, fmt};

use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::domain::ClientId;

/// Sending half of a client's outbound queue
pub type OutboundSender = mpsc::Sender<String>;

/// Receiving half of a client's outbound queue
pub type OutboundReceiver = mpsc::Receiver<String>;

/// Intake queue identifier, used in overload errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeQueue {
    Register,
    Unregister,
    Broadcast,
}

impl fmt::Display for IntakeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeQueue::Register => "register",
            IntakeQueue::Unregister => "unregister",
            IntakeQueue::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`HubHandle`] intake operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    /// The intake queue is full. Callers treat this as fatal for the
    /// operation in hand; it is never retried.
    #[error("hub {queue} queue is full")]
    Overloaded { queue: IntakeQueue },

    /// The control loop is no longer running.
    #[error("hub control loop has stopped")]
    Closed,
}

impl HubError {
    fn from_try_send<T>(err: mpsc::error::TrySendError<T>, queue: IntakeQueue) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => HubError::Overloaded { queue },
            mpsc::error::TrySendError::Closed(_) => HubError::Closed,
        }
    }
}

/// Registry entry for one client.
///
/// Holds the only sender of the client's outbound queue; dropping the
/// handle closes the queue.
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    outbound: OutboundSender,
    cancel: CancellationToken,
}

impl ClientHandle {
    pub fn new(id: ClientId, outbound: OutboundSender, cancel: CancellationToken) -> Self {
        Self {
            id,
            outbound,
            cancel,
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }
}

/// Cloneable intake side of the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<ClientHandle>,
    unregister_tx: mpsc::Sender<ClientId>,
    broadcast_tx: mpsc::Sender<String>,
    client_count: watch::Receiver<usize>,
}

impl HubHandle {
    /// Queue a client for registration.
    pub fn register(&self, client: ClientHandle) -> Result<(), HubError> {
        self.register_tx
            .try_send(client)
            .map_err(|e| HubError::from_try_send(e, IntakeQueue::Register))
    }

    /// Queue a client for removal. Removing an absent client is a no-op.
    pub fn unregister(&self, id: ClientId) -> Result<(), HubError> {
        self.unregister_tx
            .try_send(id)
            .map_err(|e| HubError::from_try_send(e, IntakeQueue::Unregister))
    }

    /// Queue a message for delivery to every registered client.
    pub fn broadcast(&self, message: impl Into<String>) -> Result<(), HubError> {
        self.broadcast_tx
            .try_send(message.into())
            .map_err(|e| HubError::from_try_send(e, IntakeQueue::Broadcast))
    }

    /// Number of registered clients as of the last processed request.
    pub fn client_count(&self) -> usize {
        *self.client_count.borrow()
    }

    /// Watch the registered client count; updated after every registry change.
    pub fn subscribe_client_count(&self) -> watch::Receiver<usize> {
        self.client_count.clone()
    }
}

/// The hub control loop and the registry it owns.
pub struct Hub {
    clients: HashMap<ClientId, ClientHandle>,
    register_rx: mpsc::Receiver<ClientHandle>,
    unregister_rx: mpsc::Receiver<ClientId>,
    broadcast_rx: mpsc::Receiver<String>,
    client_count: watch::Sender<usize>,
}

impl Hub {
    /// Create a hub whose three intake queues each hold `intake_capacity` requests.
    ///
    /// # Panics
    ///
    /// Panics if `intake_capacity` is zero.
    pub fn new(intake_capacity: usize) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(intake_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(intake_capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(intake_capacity);
        let (count_tx, count_rx) = watch::channel(0);

        let hub = Self {
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            client_count: count_tx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            client_count: count_rx,
        };
        (hub, handle)
    }

    /// Create a hub and spawn its control loop onto the runtime.
    pub fn spawn(intake_capacity: usize) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(intake_capacity);
        (handle, tokio::spawn(hub.run()))
    }

    /// Run the control loop until every [`HubHandle`] has been dropped.
    ///
    /// Each request is processed to completion before the next one is
    /// selected. Pending registrations are always drained before pending
    /// unregistrations, so a client that disconnects right after connecting
    /// is never left behind in the registry.
    pub async fn run(mut self) {
        tracing::debug!("Hub control loop started");
        loop {
            tokio::select! {
                biased;
                Some(client) = self.register_rx.recv() => self.handle_register(client),
                Some(id) = self.unregister_rx.recv() => self.handle_unregister(&id),
                Some(message) = self.broadcast_rx.recv() => self.handle_broadcast(message),
                else => break,
            }
        }
        tracing::debug!(
            "Hub control loop stopped with {} client(s) registered",
            self.clients.len()
        );
    }

    fn handle_register(&mut self, client: ClientHandle) {
        let id = client.id.clone();
        if let Some(previous) = self.clients.insert(id.clone(), client) {
            tracing::warn!("Client '{}' registered twice, replacing previous entry", id);
            previous.cancel.cancel();
        }
        tracing::info!("Client '{}' registered (total={})", id, self.clients.len());
        self.publish_count();
    }

    fn handle_unregister(&mut self, id: &ClientId) {
        match self.clients.remove(id) {
            // Dropping the handle closes the outbound queue
            Some(_client) => {
                tracing::info!("Client '{}' unregistered (total={})", id, self.clients.len());
                self.publish_count();
            }
            None => tracing::debug!("Client '{}' already unregistered", id),
        }
    }

    fn handle_broadcast(&mut self, message: String) {
        let mut dropped = Vec::new();

        for (id, client) in &self.clients {
            match client.outbound.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("Client '{}' is a slow consumer, disconnecting", id);
                    dropped.push(id.clone());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("Client '{}' outbound queue already closed", id);
                    dropped.push(id.clone());
                }
            }
        }

        tracing::debug!(
            "Broadcast delivered to {} client(s), {} dropped",
            self.clients.len() - dropped.len(),
            dropped.len()
        );

        if dropped.is_empty() {
            return;
        }
        for id in dropped {
            if let Some(client) = self.clients.remove(&id) {
                client.cancel.cancel();
            }
        }
        self.publish_count();
    }

    fn publish_count(&self) {
        self.client_count.send_replace(self.clients.len());
    }
}
