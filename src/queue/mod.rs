//! FIFO dispatch queue.
//!
//! Guarantees at most one protocol exchange in flight per connection while
//! any number of tasks submit commands. Each caller takes a [`QueueTicket`],
//! waits for it to reach the head, runs its exchange and drops the ticket.
//! Dropping the ticket (on success, error or cancellation) unlinks it and
//! wakes the next waiter, so a failed or abandoned command never stalls
//! the queue.
//!
//! # Example
//!
//! ```
//! # tokio_test_block_on(async {
//! use beanstalk_client::queue::DispatchQueue;
//!
//! let queue = DispatchQueue::new();
//! let mut first = queue.enqueue();
//! let mut second = queue.enqueue();
//!
//! first.wait().await.unwrap(); // head, resolves immediately
//! drop(first); // advance
//! second.wait().await.unwrap();
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod linked_list;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::ClientError;

pub use linked_list::{Iter, LinkedList, ListError, NodeRef};

type Grant = std::result::Result<(), ClientError>;

struct Waiter {
    tx: Option<oneshot::Sender<Grant>>,
}

impl Waiter {
    fn settle(&mut self, outcome: Grant) {
        if let Some(tx) = self.tx.take() {
            // receiver may already be gone (cancelled caller)
            let _ = tx.send(outcome);
        }
    }
}

/// FIFO queue of command tickets. Clones share the same queue.
#[derive(Clone, Default)]
pub struct DispatchQueue {
    list: Arc<Mutex<LinkedList<Waiter>>>,
}

impl DispatchQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkedList<Waiter>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a ticket at the tail. It is granted immediately if the queue
    /// was empty.
    pub fn enqueue(&self) -> QueueTicket {
        let (tx, rx) = oneshot::channel();
        let mut list = self.lock();
        let node = list.push(Waiter { tx: Some(tx) });

        if list.head() == Some(node) {
            if let Some(waiter) = list.get_mut(node) {
                waiter.settle(Ok(()));
            }
        }

        QueueTicket {
            queue: self.clone(),
            node,
            rx: Some(rx),
        }
    }

    /// Number of tickets in the queue, including the one in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reject every waiting ticket with [`ClientError::Disconnecting`],
    /// leaving only the head (the in-flight exchange) in place.
    ///
    /// Returns the number of rejected tickets.
    pub fn reject_pending(&self) -> usize {
        let rejected = self.lock().truncate_after_head();
        let count = rejected.len();

        for mut waiter in rejected {
            waiter.settle(Err(ClientError::Disconnecting));
        }

        if count > 0 {
            tracing::debug!("Rejected {} queued commands", count);
        }
        count
    }

    fn release(&self, node: NodeRef) {
        let mut list = self.lock();
        let was_head = list.head() == Some(node);

        match list.remove(node) {
            Ok(_) => {}
            // already unlinked by reject_pending
            Err(ListError::StaleNode) => return,
            Err(e) => {
                tracing::error!("Failed to release queue ticket: {}", e);
                return;
            }
        }

        if was_head {
            if let Some(head) = list.head() {
                if let Some(waiter) = list.get_mut(head) {
                    waiter.settle(Ok(()));
                }
            }
        }
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Place in a [`DispatchQueue`]. Dropping it advances the queue.
#[must_use = "dropping a ticket immediately gives up its place in the queue"]
pub struct QueueTicket {
    queue: DispatchQueue,
    node: NodeRef,
    rx: Option<oneshot::Receiver<Grant>>,
}

impl QueueTicket {
    /// Wait until this ticket reaches the head of the queue.
    ///
    /// Returns immediately on subsequent calls once granted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnecting`] if the ticket was rejected by a
    /// forced disconnect.
    pub async fn wait(&mut self) -> std::result::Result<(), ClientError> {
        let Some(rx) = self.rx.as_mut() else {
            return Ok(());
        };

        let outcome = rx.await.unwrap_or(Err(ClientError::Disconnecting));
        self.rx = None;
        outcome
    }
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.queue.release(self.node);
    }
}

impl fmt::Debug for QueueTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTicket")
            .field("node", &self.node)
            .field("granted", &self.rx.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_ticket_is_granted() {
        let queue = DispatchQueue::new();
        let mut ticket = queue.enqueue();
        ticket.wait().await.unwrap();
        assert_eq!(queue.len(), 1);

        drop(ticket);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_second_ticket_waits_for_first() {
        let queue = DispatchQueue::new();
        let first = queue.enqueue();
        let mut second = queue.enqueue();

        let pending = tokio::time::timeout(Duration::from_millis(20), second.wait()).await;
        assert!(pending.is_err(), "second ticket granted while first is held");

        drop(first);
        second.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_resolution_order_equals_enqueue_order() {
        let queue = DispatchQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for i in 0..8u64 {
            let mut ticket = queue.enqueue();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                ticket.wait().await.unwrap();
                // later tickets hold their turn for less time
                tokio::time::sleep(Duration::from_millis(8 - i)).await;
                order.lock().unwrap().push(i);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_waiting_ticket_keeps_order() {
        let queue = DispatchQueue::new();
        let first = queue.enqueue();
        let middle = queue.enqueue();
        let mut last = queue.enqueue();

        drop(middle);
        assert_eq!(queue.len(), 2);

        drop(first);
        last.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_reject_pending_keeps_head() {
        let queue = DispatchQueue::new();
        let mut head = queue.enqueue();
        let mut a = queue.enqueue();
        let mut b = queue.enqueue();

        assert_eq!(queue.reject_pending(), 2);
        assert_eq!(queue.len(), 1);

        assert_eq!(a.wait().await, Err(ClientError::Disconnecting));
        assert_eq!(b.wait().await, Err(ClientError::Disconnecting));
        head.wait().await.unwrap();

        drop(a);
        drop(b);
        assert_eq!(queue.len(), 1);

        // a ticket queued after the drain still runs after the head
        let mut next = queue.enqueue();
        drop(head);
        next.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_wait_releases_place() {
        let queue = DispatchQueue::new();
        let first = queue.enqueue();

        let q = queue.clone();
        let waiter = tokio::spawn(async move {
            let mut ticket = q.enqueue();
            ticket.wait().await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.len(), 2);

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(queue.len(), 1);

        drop(first);
        assert!(queue.is_empty());
    }
}
