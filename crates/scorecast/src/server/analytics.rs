use color_eyre::eyre;
use scorecast_common::models::ContestUpdate;
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::TunedReceiver;
use scorecast_queue::{QueueError, QueueHandle};
use tokio::select;
use tracing::{debug, info, warn};

/// Features the first run of every analytics message which carries media.
pub(crate) async fn main(
    runtime: AppRuntime,
    mut tuned_updates: TunedReceiver,
    queue: QueueHandle,
) -> eyre::Result<()> {
    info!("starting analytics bridge");

    loop {
        let update = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            update = tuned_updates.recv() => update,
        };
        let message = match update {
            Some(ContestUpdate::Analytics(message)) => message,
            Some(_) => continue,
            None => {
                debug!("the tuned update stream has ended");
                runtime.cancellation_token.cancelled().await;
                return Ok(());
            }
        };

        let (Some(media), Some(run_id)) = (message.featured_run_media, message.run_ids.first())
        else {
            continue;
        };
        match queue.make_featured(run_id.clone(), media).await {
            Ok(featured) => {
                info! {
                    message = %message.id,
                    run = %run_id,
                    expires_at = %featured.expires_at,
                    "featured a run"
                }
            }
            Err(QueueError::Closed) => {
                debug!("the queue is gone, stopping the analytics bridge");
                runtime.cancellation_token.cancelled().await;
                return Ok(());
            }
            Err(error) => {
                warn! {
                    ?error,
                    message = %message.id,
                    "unable to feature the run of an analytics message"
                }
            }
        }
    }
}
