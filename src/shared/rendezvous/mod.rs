//! One-shot rendezvous between application code awaiting a custom id and the
//! dispatcher receiving the matching interaction.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::shared::error::RendezvousError;

struct Slot<T> {
    ticket: u64,
    sender: oneshot::Sender<T>,
}

/// Concurrent map from custom id to a single pending waiter.
///
/// Lookups of different ids never block each other; registration and
/// removal of the same id are serialized by the map's shard locks.
pub struct RendezvousRegistry<T> {
    slots: Arc<DashMap<String, Slot<T>>>,
    tickets: Arc<AtomicU64>,
}

impl<T> Clone for RendezvousRegistry<T> {
    fn clone(&self) -> Self {
        RendezvousRegistry {
            slots: self.slots.clone(),
            tickets: self.tickets.clone(),
        }
    }
}

impl<T> Default for RendezvousRegistry<T> {
    fn default() -> Self {
        RendezvousRegistry {
            slots: Arc::new(DashMap::new()),
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T> std::fmt::Debug for RendezvousRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousRegistry")
            .field("pending", &self.slots.len())
            .finish()
    }
}

/// Outcome of handing an interaction to the registry.
#[derive(Debug)]
pub enum Delivery<T> {
    /// A waiter received the value and its slot is consumed.
    Delivered,
    /// Nobody awaits this id.
    Vacant(T),
    /// A waiter was registered but stopped listening before the value arrived.
    Abandoned(T),
}

impl<T> RendezvousRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for the next value delivered under `custom_id`.
    ///
    /// Fails if another live waiter already holds the id; the earlier waiter
    /// keeps its slot.
    pub fn register(&self, custom_id: impl Into<String>) -> Result<Waiter<T>, RendezvousError> {
        let custom_id = custom_id.into();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        match self.slots.entry(custom_id.clone()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().sender.is_closed() {
                    return Err(RendezvousError::AlreadyAwaited(custom_id));
                }
                occupied.insert(Slot { ticket, sender });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot { ticket, sender });
            }
        }

        Ok(Waiter {
            custom_id,
            ticket,
            receiver: Some(receiver),
            slots: self.slots.clone(),
        })
    }

    /// Hands `value` to the waiter of `custom_id` without blocking.
    ///
    /// The slot is removed before sending, so at most one delivery per
    /// registration can ever succeed.
    pub fn deliver(&self, custom_id: &str, value: T) -> Delivery<T> {
        let Some((_, slot)) = self.slots.remove(custom_id) else {
            return Delivery::Vacant(value);
        };

        match slot.sender.send(value) {
            Ok(()) => Delivery::Delivered,
            Err(value) => Delivery::Abandoned(value),
        }
    }

    /// Removes the waiter of `custom_id`, which then observes
    /// [`RendezvousError::Cancelled`].
    pub fn cancel(&self, custom_id: &str) -> bool {
        self.slots.remove(custom_id).is_some()
    }

    pub fn is_awaiting(&self, custom_id: &str) -> bool {
        self.slots
            .get(custom_id)
            .is_some_and(|slot| !slot.sender.is_closed())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Handle returned by [`RendezvousRegistry::register`].
///
/// Dropping the waiter withdraws its slot, so abandoned or timed-out waits
/// never leak registry entries.
pub struct Waiter<T> {
    custom_id: String,
    ticket: u64,
    receiver: Option<oneshot::Receiver<T>>,
    slots: Arc<DashMap<String, Slot<T>>>,
}

impl<T> std::fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("custom_id", &self.custom_id)
            .field("ticket", &self.ticket)
            .finish()
    }
}

impl<T> Waiter<T> {
    pub fn custom_id(&self) -> &str {
        &self.custom_id
    }

    /// Waits without a deadline.
    pub async fn recv(mut self) -> Result<T, RendezvousError> {
        let receiver = self.take_receiver()?;
        receiver
            .await
            .map_err(|_| RendezvousError::Cancelled(self.custom_id.clone()))
    }

    /// Waits at most `timeout`, then withdraws the slot.
    pub async fn recv_timeout(mut self, timeout: Duration) -> Result<T, RendezvousError> {
        let mut receiver = self.take_receiver()?;

        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RendezvousError::Cancelled(self.custom_id.clone())),
            Err(_) => {
                self.withdraw();
                // A delivery may have won the race against the deadline.
                receiver.close();
                receiver
                    .try_recv()
                    .map_err(|_| RendezvousError::Timeout(self.custom_id.clone()))
            }
        }
    }

    fn take_receiver(&mut self) -> Result<oneshot::Receiver<T>, RendezvousError> {
        self.receiver
            .take()
            .ok_or_else(|| RendezvousError::Cancelled(self.custom_id.clone()))
    }

    fn withdraw(&self) {
        self.slots
            .remove_if(&self.custom_id, |_, slot| slot.ticket == self.ticket);
    }
}

impl<T> Drop for Waiter<T> {
    fn drop(&mut self) {
        self.withdraw();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use tokio::task::JoinSet;

    use super::*;

    #[tokio::test]
    async fn delivers_exactly_once() {
        let registry = RendezvousRegistry::new();
        let waiter = registry.register("confirm").unwrap();
        assert!(registry.is_awaiting("confirm"));

        assert!(matches!(registry.deliver("confirm", 1), Delivery::Delivered));
        assert!(matches!(registry.deliver("confirm", 2), Delivery::Vacant(2)));

        assert_eq!(waiter.recv().await.unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn delivery_without_waiter_is_a_no_op() {
        let registry = RendezvousRegistry::<u32>::new();
        assert!(matches!(registry.deliver("nobody", 7), Delivery::Vacant(7)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn second_waiter_does_not_displace_first() {
        let registry = RendezvousRegistry::new();
        let first = registry.register("menu").unwrap();

        assert_eq!(
            registry.register("menu").unwrap_err(),
            RendezvousError::AlreadyAwaited("menu".into())
        );

        registry.deliver("menu", "picked");
        assert_eq!(first.recv().await.unwrap(), "picked");
    }

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let registry = RendezvousRegistry::<u8>::new();
        let waiter = registry.register("modal").unwrap();

        assert!(registry.cancel("modal"));
        assert!(!registry.cancel("modal"));
        assert_eq!(
            waiter.recv().await.unwrap_err(),
            RendezvousError::Cancelled("modal".into())
        );
    }

    #[tokio::test]
    async fn timeout_withdraws_slot() {
        let registry = RendezvousRegistry::<u8>::new();
        let waiter = registry.register("slow").unwrap();

        let result = waiter.recv_timeout(Duration::from_millis(20)).await;
        assert_eq!(result.unwrap_err(), RendezvousError::Timeout("slow".into()));
        assert!(registry.is_empty());
        assert!(matches!(registry.deliver("slow", 1), Delivery::Vacant(1)));
    }

    #[tokio::test]
    async fn value_sent_before_deadline_is_received() {
        let registry = RendezvousRegistry::new();
        let waiter = registry.register("fast").unwrap();
        registry.deliver("fast", 5_u8);

        assert_eq!(waiter.recv_timeout(Duration::from_millis(1)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn dropping_waiter_withdraws_slot() {
        let registry = RendezvousRegistry::<u8>::new();
        let waiter = registry.register("gone").unwrap();
        drop(waiter);

        assert!(!registry.is_awaiting("gone"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stale_waiter_leaves_successor_alone() {
        let registry = RendezvousRegistry::new();
        let first = registry.register("again").unwrap();
        registry.deliver("again", 1);

        let second = registry.register("again").unwrap();
        drop(first);
        assert!(registry.is_awaiting("again"));

        registry.deliver("again", 2);
        assert_eq!(second.recv().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_waiters_receive_only_their_own_values() {
        const WAITERS: usize = 128;

        for round in 0..16 {
            let registry = RendezvousRegistry::<String>::new();

            let mut registrations = JoinSet::new();
            for i in 0..WAITERS {
                let registry = registry.clone();
                registrations.spawn(async move { registry.register(format!("id-{i}")).unwrap() });
            }

            let mut receivers = JoinSet::new();
            while let Some(waiter) = registrations.join_next().await {
                let waiter = waiter.unwrap();
                receivers.spawn(async move {
                    let expected = waiter.custom_id().to_string();
                    let received = waiter.recv().await.unwrap();
                    (expected, received)
                });
            }
            assert_eq!(registry.len(), WAITERS);

            let mut deliveries = JoinSet::new();
            for i in 0..WAITERS {
                // Vary the delivery order from round to round.
                let i = (i * 37 + round * 11) % WAITERS;
                let registry = registry.clone();
                deliveries.spawn(async move {
                    tokio::task::yield_now().await;
                    let id = format!("id-{i}");
                    matches!(registry.deliver(&id, id.clone()), Delivery::Delivered)
                });
            }
            while let Some(delivered) = deliveries.join_next().await {
                assert!(delivered.unwrap());
            }

            let mut seen = HashSet::new();
            while let Some(result) = receivers.join_next().await {
                let (expected, received) = result.unwrap();
                assert_eq!(expected, received);
                assert!(seen.insert(received));
            }
            assert_eq!(seen.len(), WAITERS);
            assert!(registry.is_empty());
        }
    }
}
