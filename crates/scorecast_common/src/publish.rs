// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

//! Snapshot-then-diff publishing.
//!
//! The owning service publishes diffs into a bounded broadcast channel which drops the oldest
//! events on overflow. Every new subscriber sends a join request to the owner, which answers
//! by publishing a full snapshot. A subscription discards everything until it observes a
//! snapshot and discards foreign snapshots afterwards, so the first event a consumer sees is
//! always a snapshot and the diffs it sees next are relative to it.
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

pub trait SnapshotEvent: Clone + Send + 'static {
    fn is_snapshot(&self) -> bool;
}

/// A request from a subscriber to receive a fresh snapshot.
#[derive(Debug)]
pub struct JoinRequest;

pub struct SnapshotHub<E> {
    events: broadcast::Sender<E>,
    joins: flume::Sender<JoinRequest>,
}

impl<E> Clone for SnapshotHub<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            joins: self.joins.clone(),
        }
    }
}

impl<E: SnapshotEvent> SnapshotHub<E> {
    /// Creates the hub and the receiving end of join requests which belongs to the owning
    /// service loop.
    pub fn new(capacity: usize) -> (Self, flume::Receiver<JoinRequest>) {
        let (events, _) = broadcast::channel(capacity);
        let (joins, join_requests) = flume::unbounded();
        (Self { events, joins }, join_requests)
    }

    pub fn publish(&self, event: E) {
        // An error only means that nobody is listening right now
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> Subscription<E> {
        // The receiver must exist before the join request is sent, otherwise the snapshot
        // answering it could be missed.
        let subscription = Subscription {
            receiver: self.events.subscribe(),
            joins: self.joins.clone(),
            synced: false,
        };
        subscription.request_snapshot();
        subscription
    }
}

pub struct Subscription<E> {
    receiver: broadcast::Receiver<E>,
    joins: flume::Sender<JoinRequest>,
    synced: bool,
}

impl<E: SnapshotEvent> Subscription<E> {
    fn request_snapshot(&self) {
        if self.joins.send(JoinRequest).is_err() {
            debug!("the publishing service is gone, no snapshot will arrive");
        }
    }

    /// Waits for the next event visible to this subscriber. Returns [None] once the owning
    /// service has shut down.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.is_snapshot() != self.synced {
                        self.synced = true;
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn! {
                        skipped,
                        "subscriber lagged behind, requesting a fresh snapshot"
                    }
                    self.synced = false;
                    self.request_snapshot();
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = E> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|event| (event, subscription))
        })
    }
}

/// Drains all pending join requests. Several joins that arrive together are answered by a
/// single snapshot.
pub fn drain_join_requests(join_requests: &flume::Receiver<JoinRequest>) -> usize {
    join_requests.drain().count()
}
