// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

//! The tuned update stream shared by every consumer of the tuning service.
//!
//! Updates travel through a bounded broadcast channel. A receiver which falls behind moves to
//! the tail of the channel and asks the tuning service for its current state, which it hands
//! out as a burst of updates before continuing with the live ones. Everything published after
//! the move is seen again in order, so the consumer converges to the latest state.
use crate::models::{ContestInfo, ContestUpdate, RunInfo};
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

/// The latest tuned info and the latest state of every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunedSnapshot {
    pub info: Option<Arc<ContestInfo>>,
    pub runs: Vec<RunInfo>,
}

impl TunedSnapshot {
    fn into_updates(self) -> impl Iterator<Item = ContestUpdate> {
        self.info
            .map(ContestUpdate::Info)
            .into_iter()
            .chain(self.runs.into_iter().map(ContestUpdate::Run))
    }
}

/// A request of a lagging receiver, answered by the tuning service.
#[derive(Debug)]
pub struct ResyncRequest {
    reply: oneshot::Sender<TunedSnapshot>,
}

impl ResyncRequest {
    pub fn answer(self, snapshot: TunedSnapshot) {
        if self.reply.send(snapshot).is_err() {
            debug!("the lagging receiver went away before the resync");
        }
    }
}

/// Creates the publishing end, which belongs to the tuning service, and a handle for
/// subscribing to it.
pub fn channel(capacity: usize) -> (TunedUpdates, TunedPublisher) {
    let (updates, template) = broadcast::channel(capacity);
    let (resyncs, resync_requests) = flume::unbounded();
    (
        TunedUpdates { template, resyncs },
        TunedPublisher {
            updates,
            resync_requests,
        },
    )
}

/// Hands out receivers. The stream ends once the publisher is dropped, even while handles are
/// still around.
pub struct TunedUpdates {
    template: broadcast::Receiver<ContestUpdate>,
    resyncs: flume::Sender<ResyncRequest>,
}

impl Clone for TunedUpdates {
    fn clone(&self) -> Self {
        Self {
            template: self.template.resubscribe(),
            resyncs: self.resyncs.clone(),
        }
    }
}

impl TunedUpdates {
    /// A receiver of every update published from now on.
    pub fn subscribe(&self) -> TunedReceiver {
        TunedReceiver::new(self.template.resubscribe(), self.resyncs.clone())
    }
}

pub struct TunedPublisher {
    updates: broadcast::Sender<ContestUpdate>,
    resync_requests: flume::Receiver<ResyncRequest>,
}

impl TunedPublisher {
    pub fn publish(&self, update: ContestUpdate) {
        // An error only means that nobody is listening right now
        let _ = self.updates.send(update);
    }

    /// Waits for the next resync request. Returns [None] once no receiver or handle is left.
    pub async fn next_resync(&self) -> Option<ResyncRequest> {
        self.resync_requests.recv_async().await.ok()
    }
}

pub struct TunedReceiver {
    receiver: broadcast::Receiver<ContestUpdate>,
    resyncs: flume::Sender<ResyncRequest>,
    replay: VecDeque<ContestUpdate>,
    lagging: bool,
    skipped: u64,
}

impl TunedReceiver {
    fn new(
        receiver: broadcast::Receiver<ContestUpdate>,
        resyncs: flume::Sender<ResyncRequest>,
    ) -> Self {
        Self {
            receiver,
            resyncs,
            replay: VecDeque::new(),
            lagging: false,
            skipped: 0,
        }
    }

    fn lagged(&mut self, skipped: u64) {
        warn! {
            skipped,
            "receiver lagged behind the tuned updates, requesting a resync"
        }
        self.lagging = true;
        self.skipped += skipped;
    }

    async fn resync(&mut self) {
        self.lagging = false;
        // The new position must exist before the request is sent, otherwise updates published
        // between the snapshot and the move would be missed.
        self.receiver = self.receiver.resubscribe();
        let (reply, snapshot) = oneshot::channel();
        if self.resyncs.send(ResyncRequest { reply }).is_err() {
            debug!("the tuning service is gone, no resync will arrive");
            return;
        }
        match snapshot.await {
            Ok(snapshot) => self.replay.extend(snapshot.into_updates()),
            Err(_) => debug!("the tuning service dropped the resync request"),
        }
    }

    /// Waits for the next update. Returns [None] once the tuning service has shut down.
    pub async fn recv(&mut self) -> Option<ContestUpdate> {
        loop {
            if self.lagging {
                self.resync().await;
            }
            if let Some(update) = self.replay.pop_front() {
                return Some(update);
            }
            match self.receiver.recv().await {
                Ok(update) => return Some(update),
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Takes an update which is ready without waiting. A lag found here is repaired by the
    /// next [TunedReceiver::recv].
    pub fn try_recv(&mut self) -> Option<ContestUpdate> {
        if self.lagging {
            return None;
        }
        if let Some(update) = self.replay.pop_front() {
            return Some(update);
        }
        match self.receiver.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Lagged(skipped)) => {
                self.lagged(skipped);
                None
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// The number of updates skipped since the previous call.
    pub fn take_skipped(&mut self) -> u64 {
        std::mem::take(&mut self.skipped)
    }

    pub fn into_stream(self) -> impl Stream<Item = ContestUpdate> {
        futures::stream::unfold(self, |mut receiver| async move {
            receiver.recv().await.map(|update| (update, receiver))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProblemId, RunId, RunResult, TeamId};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn run(id: u32, tested_part: f64) -> RunInfo {
        RunInfo {
            id: RunId::from(format!("r{id}")),
            result: RunResult::InProgress { tested_part },
            problem_id: ProblemId::from("A"),
            team_id: TeamId::from("t1"),
            time: Duration::from_secs(u64::from(id)),
            language_id: None,
            featured_run_media: None,
            is_hidden: false,
        }
    }

    fn apply(state: &mut BTreeMap<RunId, RunInfo>, update: ContestUpdate) {
        if let ContestUpdate::Run(run) = update {
            state.insert(run.id.clone(), run);
        }
    }

    #[tokio::test]
    async fn should_resync_lagging_receiver_from_snapshot() {
        let (updates, publisher) = channel(4);
        let mut receiver = updates.subscribe();

        let mut expected = BTreeMap::new();
        for id in 0..32 {
            let run = run(id, 0.0);
            expected.insert(run.id.clone(), run.clone());
            publisher.publish(ContestUpdate::Run(run));
        }

        let answered = expected.clone();
        let responder = tokio::spawn(async move {
            let request = publisher.next_resync().await.unwrap();
            request.answer(TunedSnapshot {
                info: None,
                runs: answered.into_values().collect(),
            });
            // Published after the receiver moved to the tail
            publisher.publish(ContestUpdate::Run(run(0, 1.0)));
            publisher
        });

        let mut state = BTreeMap::new();
        for _ in 0..33 {
            apply(&mut state, receiver.recv().await.unwrap());
        }
        expected.insert(RunId::from("r0"), run(0, 1.0));
        assert_eq!(state, expected);
        assert_eq!(receiver.take_skipped(), 28);
        assert_eq!(receiver.take_skipped(), 0);

        drop(responder.await.unwrap());
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn should_defer_resync_found_without_waiting() {
        let (updates, publisher) = channel(2);
        let mut receiver = updates.subscribe();
        for id in 0..5 {
            publisher.publish(ContestUpdate::Run(run(id, 0.0)));
        }

        assert!(receiver.try_recv().is_none());
        assert!(receiver.try_recv().is_none());

        let responder = tokio::spawn(async move {
            publisher.next_resync().await.unwrap().answer(TunedSnapshot {
                info: None,
                runs: vec![run(4, 0.0)],
            });
        });
        assert_eq!(receiver.recv().await, Some(ContestUpdate::Run(run(4, 0.0))));
        responder.await.unwrap();
        assert!(receiver.recv().await.is_none());
    }
}
