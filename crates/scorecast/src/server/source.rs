use async_trait::async_trait;
use color_eyre::eyre;
use color_eyre::eyre::Context;
use scorecast_common::models::ContestUpdate;
use scorecast_common::server::runtime::AppRuntime;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::{select, time};
use tracing::{debug, info, warn};

/// A supplier of raw contest updates.
#[async_trait]
pub(crate) trait EventSource: Send {
    /// The next raw update, or [None] once the source is exhausted.
    async fn next_update(&mut self) -> eyre::Result<Option<ContestUpdate>>;
}

/// Replays newline delimited JSON updates, optionally pausing between them.
pub(crate) struct NdjsonSource<R> {
    lines: Lines<BufReader<R>>,
    line_number: usize,
    replayed: usize,
    delay: Duration,
}

impl NdjsonSource<File> {
    pub(crate) async fn open(path: &Path, delay: Duration) -> eyre::Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("unable to open the events file {path:?}"))?;
        Ok(Self::new(file, delay))
    }
}

impl<R: AsyncRead + Unpin + Send> NdjsonSource<R> {
    pub(crate) fn new(reader: R, delay: Duration) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_number: 0,
            replayed: 0,
            delay,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> EventSource for NdjsonSource<R> {
    async fn next_update(&mut self) -> eyre::Result<Option<ContestUpdate>> {
        loop {
            let Some(line) = self
                .lines
                .next_line()
                .await
                .context("unable to read the events file")?
            else {
                return Ok(None);
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(update) => {
                    if self.replayed > 0 && !self.delay.is_zero() {
                        time::sleep(self.delay).await;
                    }
                    self.replayed += 1;
                    return Ok(Some(update));
                }
                Err(error) => {
                    warn! {
                        ?error,
                        line = self.line_number,
                        "skipping a malformed event"
                    }
                }
            }
        }
    }
}

/// Forwards every update of `source` into the raw update channel.
pub(crate) async fn main(
    runtime: AppRuntime,
    mut source: impl EventSource,
    raw_updates: flume::Sender<ContestUpdate>,
) -> eyre::Result<()> {
    info!("starting event replay");

    let mut count = 0usize;
    loop {
        let update = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            update = source.next_update() => update?,
        };
        let Some(update) = update else {
            info!(count, "event replay finished");
            return Ok(());
        };
        if raw_updates.send_async(update).await.is_err() {
            debug!("the tuning service is gone, stopping the replay");
            return Ok(());
        }
        count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_skip_blank_and_malformed_lines() {
        let events = [
            r#"{"type":"info","name":"Finals","status":{"type":"before"},"contestLengthMs":18000000}"#,
            "",
            "not json",
            r#"{"type":"social","teamIds":["t1"],"message":"hello"}"#,
        ]
        .join("\n");
        let mut source = NdjsonSource::new(events.as_bytes(), Duration::ZERO);

        let Some(ContestUpdate::Info(info)) = source.next_update().await.unwrap() else {
            panic!("expected the contest info first");
        };
        assert_eq!(info.name, "Finals");
        assert!(matches!(
            source.next_update().await.unwrap(),
            Some(ContestUpdate::Social(_))
        ));
        assert!(source.next_update().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_forward_until_exhausted() {
        let events = r#"{"type":"social","teamIds":["t1"]}
{"type":"social","teamIds":["t2"]}"#;
        let runtime = AppRuntime::new(Default::default(), Default::default());
        let (raw_tx, raw_rx) = flume::unbounded();
        main(runtime, NdjsonSource::new(events.as_bytes(), Duration::ZERO), raw_tx)
            .await
            .unwrap();
        assert_eq!(raw_rx.drain().count(), 2);
    }
}
