//! The poll task: asks for the ranking on every scheduler tick.

use podium_api::ApiClient;
use podium_poll::{PollConfig, PollScheduler};
use podium_transport::HttpTransport;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::sync::SyncCommand;

/// Runs until `cancel` fires.
///
/// Each tick spawns its own fetch and moves on. Fetches are not chained,
/// so a slow response never delays the next tick; whichever response lands
/// last is what the actor shows.
pub(crate) async fn run<T: HttpTransport>(
    api: ApiClient<T>,
    limit: usize,
    config: PollConfig,
    commands: mpsc::Sender<SyncCommand>,
    mut paused: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    let mut scheduler = PollScheduler::new(config);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = paused.changed() => {
                if changed.is_err() {
                    break;
                }
                if *paused.borrow_and_update() {
                    scheduler.pause();
                } else {
                    scheduler.resume();
                }
            }
            tick = scheduler.wait_for_tick() => {
                tracing::trace!(seq = tick.seq, "poll");
                if commands.send(SyncCommand::FetchStarted).await.is_err() {
                    break;
                }
                tokio::spawn(fetch(api.clone(), limit, commands.clone(), cancel.clone()));
            }
        }
    }

    tracing::debug!(polls = scheduler.metrics().total_ticks, "poll task stopped");
}

async fn fetch<T: HttpTransport>(
    api: ApiClient<T>,
    limit: usize,
    commands: mpsc::Sender<SyncCommand>,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = api.get_top_scores(limit) => result,
    };
    // Nothing lands once the sync is stopped.
    if cancel.is_cancelled() {
        return;
    }
    let _ = commands
        .send(SyncCommand::Fetched {
            result: result.map_err(|e| e.to_string()),
            reply: None,
        })
        .await;
}
