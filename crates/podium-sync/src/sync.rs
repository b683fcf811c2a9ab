//! The state-sink actor and the handle that talks to it.
//!
//! One actor task owns the displayed leaderboard. The poll task, the push
//! task and the handle never touch that state; they send commands over an
//! mpsc channel and the actor applies them in arrival order, publishing a
//! fresh [`SyncSnapshot`] on a `watch` channel after each change.

use std::future::Future;
use std::sync::Arc;

use podium_api::ApiClient;
use podium_protocol::{parse_score, LeaderboardEntry, NotificationKind, TopScoresResponse};
use podium_transport::{Connector, HttpTransport};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::notifications::{notification, now_ms};
use crate::{
    rank_entries, NotificationFeed, PushConfig, PushStatus, SyncConfig,
    SyncError, SyncPhase, SyncSnapshot,
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Everything that can change the displayed state.
pub(crate) enum SyncCommand {
    /// A fetch was issued. Moves `Idle` to `Loading`.
    FetchStarted,

    /// A fetch finished. `reply` is answered once the result is applied.
    Fetched {
        result: Result<TopScoresResponse, String>,
        reply: Option<oneshot::Sender<()>>,
    },

    /// A full ranking pushed by the server.
    Pushed(TopScoresResponse),

    /// An activity notice for the feed.
    Notify {
        kind: NotificationKind,
        message: String,
        score: Option<u64>,
    },

    PushStatus(PushStatus),

    Gate(bool),

    ClearNotifications,
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct SyncActor {
    snapshot: SyncSnapshot,
    feed: NotificationFeed,
    track_rank_changes: bool,
    receiver: mpsc::Receiver<SyncCommand>,
    publisher: watch::Sender<SyncSnapshot>,
    cancel: CancellationToken,
}

impl SyncActor {
    async fn run(mut self) {
        tracing::info!("leaderboard sync started");

        loop {
            let expiry = self.feed.next_expiry();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = sleep_until(expiry) => {
                    if self.feed.expire(Instant::now()) {
                        self.publish();
                    }
                }
            }
        }

        self.set_phase(SyncPhase::Stopped);
        self.publish();
        tracing::info!("leaderboard sync stopped");
    }

    fn handle(&mut self, cmd: SyncCommand) {
        match cmd {
            SyncCommand::FetchStarted => {
                if self.snapshot.phase == SyncPhase::Idle {
                    self.set_phase(SyncPhase::Loading);
                    self.publish();
                }
            }
            SyncCommand::Fetched { result, reply } => {
                match result {
                    Ok(resp) => self.replace(resp.top_scores),
                    Err(message) => {
                        tracing::warn!(error = %message, "leaderboard fetch failed, keeping previous rows");
                        self.snapshot.error = Some(message);
                        self.set_phase(SyncPhase::Error);
                    }
                }
                self.publish();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            SyncCommand::Pushed(resp) => {
                tracing::debug!(rows = resp.top_scores.len(), "ranking pushed");
                self.replace(resp.top_scores);
                self.feed.push(notification(
                    NotificationKind::GameEvent,
                    "Leaderboard updated",
                    None,
                ));
                self.publish();
            }
            SyncCommand::Notify {
                kind,
                message,
                score,
            } => {
                tracing::debug!(%kind, %message, "notification");
                self.feed.push(notification(kind, message, score));
                self.publish();
            }
            SyncCommand::PushStatus(status) => {
                if self.snapshot.push != status {
                    self.snapshot.push = status;
                    self.publish();
                }
            }
            SyncCommand::Gate(open) => {
                if self.snapshot.can_submit != open {
                    tracing::debug!(can_submit = open, "submission gate changed");
                    self.snapshot.can_submit = open;
                    self.publish();
                }
            }
            SyncCommand::ClearNotifications => {
                if self.feed.clear() {
                    self.publish();
                }
            }
        }
    }

    /// Wholesale replace: the new ranking is the whole truth.
    fn replace(&mut self, entries: Vec<LeaderboardEntry>) {
        self.snapshot.rows =
            rank_entries(&self.snapshot.rows, entries, self.track_rank_changes);
        self.snapshot.error = None;
        self.snapshot.last_updated_ms = Some(now_ms());
        self.set_phase(SyncPhase::Ready);
    }

    fn set_phase(&mut self, target: SyncPhase) {
        let current = self.snapshot.phase;
        if current == target {
            return;
        }
        if current.can_transition_to(target) {
            tracing::trace!(from = %current, to = %target, "sync phase");
            self.snapshot.phase = target;
        } else {
            tracing::debug!(from = %current, to = %target, "ignoring phase change");
        }
    }

    fn publish(&mut self) {
        self.snapshot.notifications = self.feed.to_vec();
        self.publisher.send_replace(self.snapshot.clone());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Entry point for starting a sync.
pub struct LeaderboardSync;

impl LeaderboardSync {
    /// Starts polling `api`. Must be called from within a tokio runtime.
    pub fn spawn<T: HttpTransport>(api: ApiClient<T>, config: SyncConfig) -> SyncHandle<T> {
        let (commands, receiver) = mpsc::channel(config.channel_size.max(1));
        let (publisher, state) = watch::channel(SyncSnapshot::default());
        let cancel = CancellationToken::new();

        let actor = SyncActor {
            snapshot: SyncSnapshot::default(),
            feed: NotificationFeed::new(config.max_notifications, config.notification_ttl),
            track_rank_changes: config.track_rank_changes,
            receiver,
            publisher,
            cancel: cancel.clone(),
        };
        let mut tasks = vec![tokio::spawn(actor.run())];

        let (pause_tx, pause_rx) = watch::channel(false);
        tasks.push(tokio::spawn(crate::poll::run(
            api.clone(),
            config.limit,
            config.poll.clone(),
            commands.clone(),
            pause_rx,
            cancel.clone(),
        )));

        SyncHandle {
            api,
            limit: config.limit,
            commands,
            state,
            cancel,
            paused: pause_tx,
            reconnect: Arc::new(Notify::new()),
            tasks,
        }
    }

    /// Starts polling and, when `push` carries credentials, listening on
    /// the push channel. Without credentials this is [`spawn`](Self::spawn)
    /// plus a warning.
    pub fn spawn_with_push<T: HttpTransport, K: Connector>(
        api: ApiClient<T>,
        config: SyncConfig,
        connector: K,
        push: PushConfig,
    ) -> SyncHandle<T> {
        let mut handle = Self::spawn(api, config);
        match push.endpoint() {
            Some(url) => {
                let task = crate::push::run(
                    connector,
                    url,
                    push,
                    handle.commands.clone(),
                    Arc::clone(&handle.reconnect),
                    handle.cancel.clone(),
                );
                handle.tasks.push(tokio::spawn(task));
            }
            None => {
                tracing::warn!("push credentials missing, leaderboard updates by polling only");
            }
        }
        handle
    }
}

// ---------------------------------------------------------------------------
// Submission gate
// ---------------------------------------------------------------------------

/// Updates the `can_submit` flag of a running sync.
///
/// Obtained from [`SyncHandle::gate`]. Once the sync has stopped, updates
/// are silently dropped.
pub struct SubmissionGate<T> {
    api: ApiClient<T>,
    commands: mpsc::Sender<SyncCommand>,
}

impl<T> Clone for SubmissionGate<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<T: HttpTransport> SubmissionGate<T> {
    /// Queries `GET /api/scores/can-submit` for `token` and records the
    /// answer. An error leaves the gate open and returns `true`.
    pub async fn check(&self, token: &str) -> bool {
        let open = match self.api.can_submit(token).await {
            Ok(status) => status.can_submit,
            Err(e) => {
                tracing::warn!(error = %e, "could not check submission status, leaving gate open");
                true
            }
        };
        self.set(open).await;
        open
    }

    /// Opens the gate without asking the server, e.g. once nobody is
    /// signed in.
    pub async fn reset(&self) {
        self.set(true).await;
    }

    async fn set(&self, open: bool) {
        let _ = self.commands.send(SyncCommand::Gate(open)).await;
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running sync.
///
/// Dropping it stops everything, the same as [`stop`](Self::stop).
pub struct SyncHandle<T> {
    api: ApiClient<T>,
    limit: usize,
    commands: mpsc::Sender<SyncCommand>,
    state: watch::Receiver<SyncSnapshot>,
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
    reconnect: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T> Drop for SyncHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T: HttpTransport> SyncHandle<T> {
    // -- reads --------------------------------------------------------------

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.borrow().phase
    }

    pub fn can_submit(&self) -> bool {
        self.state.borrow().can_submit
    }

    pub fn notifications(&self) -> Vec<podium_protocol::Notification> {
        self.state.borrow().notifications.clone()
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    // -- actions ------------------------------------------------------------

    /// Fetches now and waits until the result is applied.
    ///
    /// A failure is also recorded in the snapshot, like a failed poll.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.ensure_running()?;
        self.send(SyncCommand::FetchStarted).await?;

        let result = self.api.get_top_scores(self.limit).await;
        let (for_actor, outcome) = match result {
            Ok(resp) => (Ok(resp), Ok(())),
            Err(e) => (Err(e.to_string()), Err(SyncError::Api(e))),
        };

        self.ensure_running()?;
        let (reply, applied) = oneshot::channel();
        self.send(SyncCommand::Fetched {
            result: for_actor,
            reply: Some(reply),
        })
        .await?;
        applied.await.map_err(|_| SyncError::Stopped)?;
        outcome
    }

    /// Asks the server whether this player may submit, and updates the gate.
    ///
    /// If the question itself fails the gate is left open, so a flaky
    /// endpoint never locks a player out.
    pub async fn check_can_submit(&self, token: &str) -> bool {
        self.gate().check(token).await
    }

    /// A cloneable handle on the submission gate alone, for tasks that
    /// outlive a borrow of this handle.
    pub fn gate(&self) -> SubmissionGate<T> {
        SubmissionGate {
            api: self.api.clone(),
            commands: self.commands.clone(),
        }
    }

    /// Validates and submits a score typed by the player.
    ///
    /// Input is checked before anything is sent and a closed gate refuses
    /// the call. After a successful submission the gate is re-queried and
    /// the leaderboard is re-fetched before this returns.
    pub async fn submit_score(&self, token: &str, input: &str) -> Result<Value, SyncError> {
        let score = parse_score(input)?;
        self.ensure_running()?;
        if !self.can_submit() {
            return Err(SyncError::SubmissionClosed);
        }

        let response = self.api.submit_score(score, token).await?;
        tracing::info!(score, "score submitted");

        match self.api.can_submit(token).await {
            Ok(status) => {
                let _ = self.send(SyncCommand::Gate(status.can_submit)).await;
            }
            Err(e) => tracing::debug!(error = %e, "gate re-check failed, keeping current gate"),
        }

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after submission failed");
        }
        Ok(response)
    }

    /// Empties the activity feed.
    pub async fn clear_notifications(&self) {
        let _ = self.send(SyncCommand::ClearNotifications).await;
    }

    /// Suspends periodic polling. Push updates keep flowing.
    pub fn pause_polling(&self) {
        self.paused.send_replace(true);
    }

    /// Resumes periodic polling with an immediate fetch.
    pub fn resume_polling(&self) {
        self.paused.send_replace(false);
    }

    /// Cuts short a pending push reconnect delay.
    pub fn reconnect_push(&self) {
        self.reconnect.notify_one();
    }

    // -- lifecycle ----------------------------------------------------------

    /// Signals every task to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stops and waits until every task has finished. The last published
    /// snapshot has phase `Stopped`.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "sync task ended abnormally");
            }
        }
    }

    /// Resolves once the sync has stopped, by any means.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + 'static {
        let cancel = self.cancel.clone();
        async move { cancel.cancelled().await }
    }

    fn ensure_running(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Stopped)
        } else {
            Ok(())
        }
    }

    async fn send(&self, cmd: SyncCommand) -> Result<(), SyncError> {
        self.commands.send(cmd).await.map_err(|_| SyncError::Stopped)
    }
}
