use crate::state::QueueEvent;
use chrono::{DateTime, Utc};
use scorecast_common::models::{Media, RunId};
use scorecast_common::publish::{JoinRequest, SnapshotHub, Subscription};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("run {0} is not known to the queue")]
    UnknownRun(RunId),
    #[error("the queue service is not running")]
    Closed,
}

/// The answer to a successful make featured request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedRunInfo {
    pub expires_at: DateTime<Utc>,
    pub media: Media,
}

pub(crate) enum FeaturedRequest {
    MakeFeatured {
        run_id: RunId,
        media: Media,
        reply: oneshot::Sender<Result<FeaturedRunInfo, QueueError>>,
    },
    MakeNotFeatured {
        run_id: RunId,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
}

/// Everything the queue service loop receives besides the tuned updates.
pub struct QueueInputs {
    pub(crate) hub: SnapshotHub<QueueEvent>,
    pub(crate) join_requests: flume::Receiver<JoinRequest>,
    pub(crate) featured_requests: flume::Receiver<FeaturedRequest>,
}

/// A cloneable handle for subscribing to the queue and featuring runs.
#[derive(Clone)]
pub struct QueueHandle {
    hub: SnapshotHub<QueueEvent>,
    featured_requests: flume::Sender<FeaturedRequest>,
}

pub fn channel(publish_capacity: usize) -> (QueueHandle, QueueInputs) {
    let (hub, join_requests) = SnapshotHub::new(publish_capacity);
    let (featured_tx, featured_rx) = flume::unbounded();
    (
        QueueHandle {
            hub: hub.clone(),
            featured_requests: featured_tx,
        },
        QueueInputs {
            hub,
            join_requests,
            featured_requests: featured_rx,
        },
    )
}

impl QueueHandle {
    /// Subscribes to the queue. The first event received is always a snapshot.
    pub fn subscribe(&self) -> Subscription<QueueEvent> {
        self.hub.subscribe()
    }

    async fn request<T>(
        &self,
        make_request: impl FnOnce(oneshot::Sender<Result<T, QueueError>>) -> FeaturedRequest,
    ) -> Result<T, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.featured_requests
            .send_async(make_request(reply_tx))
            .await
            .map_err(|_| QueueError::Closed)?;
        reply_rx.await.map_err(|_| QueueError::Closed)?
    }

    pub async fn make_featured(
        &self,
        run_id: RunId,
        media: Media,
    ) -> Result<FeaturedRunInfo, QueueError> {
        self.request(|reply| FeaturedRequest::MakeFeatured {
            run_id,
            media,
            reply,
        })
        .await
    }

    pub async fn make_not_featured(&self, run_id: RunId) -> Result<(), QueueError> {
        self.request(|reply| FeaturedRequest::MakeNotFeatured { run_id, reply })
            .await
    }
}
