use chrono::Utc;
use color_eyre::eyre;
use color_eyre::eyre::Context;
use futures::future::ready;
use futures::stream::{select_all, BoxStream, StreamExt};
use scorecast_common::models::{ContestInfo, ContestUpdate};
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::TunedReceiver;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::select;
use tracing::{debug, info};

#[derive(Serialize, Debug)]
struct FeedEvent {
    /// Unix timestamp in milliseconds
    #[serde(rename = "p")]
    published: i64,
    #[serde(flatten)]
    payload: FeedPayload,
}

#[derive(Serialize, Debug)]
#[serde(tag = "t", content = "d", rename_all = "snake_case")]
pub(crate) enum FeedPayload {
    Info(Arc<ContestInfo>),
    #[cfg(feature = "scoreboard")]
    Scoreboard(ScoreboardUpdate),
    #[cfg(feature = "queue")]
    Queue(scorecast_queue::QueueEvent),
    #[cfg(feature = "spotlight")]
    Spotlight(scorecast_spotlight::KeyTeam),
}

#[cfg(feature = "scoreboard")]
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScoreboardUpdate {
    level: scorecast_common::models::OptimismLevel,
    scoreboard: Arc<scorecast_common::models::Scoreboard>,
}

/// Every tuned contest info. Runs and other updates are not part of the feed.
pub(crate) fn info_stream(tuned_updates: TunedReceiver) -> BoxStream<'static, FeedPayload> {
    tuned_updates
        .into_stream()
        .filter_map(|update| {
            ready(match update {
                ContestUpdate::Info(info) => Some(FeedPayload::Info(info)),
                _ => None,
            })
        })
        .boxed()
}

#[cfg(feature = "scoreboard")]
pub(crate) fn scoreboard_stream(
    level: scorecast_common::models::OptimismLevel,
    receiver: scorecast_scoreboard::ScoreboardReceiver,
) -> BoxStream<'static, FeedPayload> {
    tokio_stream::wrappers::WatchStream::new(receiver)
        .filter_map(move |scoreboard| {
            ready(scoreboard.map(|scoreboard| {
                FeedPayload::Scoreboard(ScoreboardUpdate { level, scoreboard })
            }))
        })
        .boxed()
}

#[cfg(feature = "queue")]
pub(crate) fn queue_stream(
    queue: &scorecast_queue::QueueHandle,
) -> BoxStream<'static, FeedPayload> {
    queue.subscribe().into_stream().map(FeedPayload::Queue).boxed()
}

#[cfg(feature = "spotlight")]
pub(crate) fn spotlight_stream(
    spotlight: scorecast_spotlight::SpotlightHandle,
) -> BoxStream<'static, FeedPayload> {
    spotlight.flow().map(FeedPayload::Spotlight).boxed()
}

/// Writes every output event as one JSON line.
pub(crate) async fn main<W: AsyncWrite + Unpin + Send>(
    runtime: AppRuntime,
    streams: Vec<BoxStream<'static, FeedPayload>>,
    writer: W,
) -> eyre::Result<()> {
    info!("starting output feed");

    let mut events = select_all(streams);
    let mut writer = BufWriter::new(writer);

    loop {
        let payload = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => break,
            payload = events.next() => payload,
        };
        let Some(payload) = payload else {
            debug!("all feed streams have ended");
            break;
        };
        let event = FeedEvent {
            published: Utc::now().timestamp_millis(),
            payload,
        };
        let mut line = serde_json::to_vec(&event).context("unable to encode a feed event")?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .context("unable to write the feed")?;
        writer.flush().await.context("unable to write the feed")?;
    }

    writer.flush().await.context("unable to write the feed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorecast_common::models::SocialEvent;
    use scorecast_common::tuned;

    #[tokio::test]
    async fn should_write_tagged_lines() {
        let runtime = AppRuntime::new(Default::default(), Default::default());
        let (tuned_updates, tuned_tx) = tuned::channel(16);
        let stream = info_stream(tuned_updates.subscribe());
        let info = ContestInfo {
            name: "Finals".to_string(),
            ..ContestInfo::default()
        };
        tuned_tx.publish(ContestUpdate::Info(Arc::new(info)));
        tuned_tx.publish(ContestUpdate::Social(SocialEvent {
            team_ids: vec![],
            message: "ignored".to_string(),
        }));
        drop(tuned_tx);

        let mut output = Vec::new();
        main(runtime, vec![stream], &mut output).await.unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["t"], "info");
        assert_eq!(lines[0]["d"]["name"], "Finals");
        assert!(lines[0]["p"].is_i64());
    }
}
