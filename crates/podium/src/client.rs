//! `PodiumClient` builder and the composed client.
//!
//! This is the composition root: it builds the API client once and hands
//! it to the auth manager and the leaderboard sync, which never construct
//! their own.

use std::future::Future;

use podium_api::ApiClient;
use podium_protocol::{MessageResponse, RegisterResponse, User};
use podium_session::{AuthManager, AuthSnapshot, CredentialStore, FileStore, RestoreOutcome};
use podium_sync::{LeaderboardSync, SubmissionGate, SyncHandle, SyncSnapshot};
use podium_transport::{Connector, HttpTransport, ReqwestTransport, WebSocketConnector};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{ClientConfig, PodiumError};

/// Builder for configuring and starting a [`PodiumClient`].
///
/// # Example
///
/// ```rust,no_run
/// use podium::prelude::*;
///
/// # async fn run() -> Result<(), PodiumError> {
/// let client = PodiumClient::builder(ClientConfig::load()?).start()?;
/// println!("{} rows", client.leaderboard().rows.len());
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct PodiumClientBuilder {
    config: ClientConfig,
}

impl PodiumClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts with the stock stack: `reqwest` for HTTP, a WebSocket push
    /// socket, and credentials in a JSON file at `credentials_path`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<PodiumClient<ReqwestTransport, FileStore>, PodiumError> {
        let transport = ReqwestTransport::new()?;
        let store = FileStore::new(&self.config.credentials_path);
        Ok(self.start_with(transport, store, WebSocketConnector))
    }

    /// Starts with caller-supplied transports and storage, and returns
    /// without waiting on the network.
    ///
    /// Polling (and push, when configured) begins right away. Stored
    /// credentials are installed immediately and verified in the
    /// background, with `is_loading` set until the server answers; if the
    /// session survives, the submission gate is then checked for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_with<T, S, K>(
        self,
        transport: T,
        store: S,
        connector: K,
    ) -> PodiumClient<T, S>
    where
        T: HttpTransport,
        S: CredentialStore,
        K: Connector,
    {
        let config = self.config;
        let api = ApiClient::new(transport, config.api_base_url.clone());
        tracing::info!(base_url = %api.base_url(), "starting podium client");

        let sync = LeaderboardSync::spawn_with_push(
            api.clone(),
            config.sync_config(),
            connector,
            config.push_config(),
        );
        let auth = AuthManager::new(api, store);
        let restoring = auth.restore();

        let tasks = vec![
            tokio::spawn(gate_after_restore(
                restoring,
                auth.clone(),
                sync.gate(),
                sync.stopped(),
            )),
            tokio::spawn(reset_gate_on_sign_out(
                auth.subscribe(),
                sync.gate(),
                sync.stopped(),
            )),
        ];

        PodiumClient { auth, sync, tasks }
    }
}

/// Once stored credentials are verified, asks whether the restored player
/// may submit.
async fn gate_after_restore<T, S>(
    restoring: RestoreOutcome,
    auth: AuthManager<T, S>,
    gate: SubmissionGate<T>,
    stopped: impl Future<Output = ()>,
) where
    T: HttpTransport,
    S: CredentialStore,
{
    tokio::select! {
        _ = stopped => {}
        _ = async {
            restoring.settled().await;
            if let Some(token) = auth.token() {
                gate.check(token.as_str()).await;
            }
        } => {}
    }
}

/// Opens the gate whenever the player goes from signed in to signed out,
/// for any reason.
async fn reset_gate_on_sign_out<T: HttpTransport>(
    mut session: watch::Receiver<AuthSnapshot>,
    gate: SubmissionGate<T>,
    stopped: impl Future<Output = ()>,
) {
    tokio::pin!(stopped);
    let mut signed_in = session.borrow_and_update().is_authenticated();
    loop {
        tokio::select! {
            _ = &mut stopped => break,
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = session.borrow_and_update().is_authenticated();
                if signed_in && !now {
                    tracing::debug!("signed out, reopening submission gate");
                    gate.reset().await;
                }
                signed_in = now;
            }
        }
    }
}

/// A running leaderboard client: one signed-in (or anonymous) player and
/// one live leaderboard.
pub struct PodiumClient<T, S> {
    auth: AuthManager<T, S>,
    sync: SyncHandle<T>,
    tasks: Vec<JoinHandle<()>>,
}

impl PodiumClient<ReqwestTransport, FileStore> {
    pub fn builder(config: ClientConfig) -> PodiumClientBuilder {
        PodiumClientBuilder::new(config)
    }
}

impl<T: HttpTransport, S: CredentialStore> PodiumClient<T, S> {
    pub fn auth(&self) -> &AuthManager<T, S> {
        &self.auth
    }

    pub fn sync(&self) -> &SyncHandle<T> {
        &self.sync
    }

    pub fn session(&self) -> AuthSnapshot {
        self.auth.snapshot()
    }

    /// The current leaderboard view.
    pub fn leaderboard(&self) -> SyncSnapshot {
        self.sync.snapshot()
    }

    pub fn watch_session(&self) -> watch::Receiver<AuthSnapshot> {
        self.auth.subscribe()
    }

    pub fn watch_leaderboard(&self) -> watch::Receiver<SyncSnapshot> {
        self.sync.subscribe()
    }

    /// Signs in, then asks whether the player may submit.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, PodiumError> {
        let user = self.auth.login(email, password).await?;
        if let Some(token) = self.auth.token() {
            self.sync.check_can_submit(token.as_str()).await;
        }
        Ok(user)
    }

    /// Signs out. The submission gate reopens shortly after, since it no
    /// longer describes anyone.
    pub fn logout(&self) {
        self.auth.logout();
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<RegisterResponse, PodiumError> {
        Ok(self.auth.register(email, password, username).await?)
    }

    pub async fn confirm_email(&self, email: &str, code: &str) -> Result<MessageResponse, PodiumError> {
        Ok(self.auth.confirm_email(email, code).await?)
    }

    /// Re-queries the submission gate for the signed-in player.
    pub async fn check_can_submit(&self) -> Result<bool, PodiumError> {
        let token = self.auth.token().ok_or(PodiumError::NotSignedIn)?;
        Ok(self.sync.check_can_submit(token.as_str()).await)
    }

    /// Submits a score typed by the signed-in player.
    ///
    /// The input is validated before anything is sent. On success the
    /// leaderboard is up to date on return.
    pub async fn submit_score(&self, input: &str) -> Result<Value, PodiumError> {
        let token = self.auth.token().ok_or(PodiumError::NotSignedIn)?;
        Ok(self.sync.submit_score(token.as_str(), input).await?)
    }

    /// Re-fetches the player's profile and stats. A rejected token signs
    /// the player out.
    pub async fn refresh_profile(&self) {
        self.auth.refresh_profile().await;
    }

    /// Stops polling and push and waits for the background tasks to end.
    /// The stored session is kept for the next start.
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "client task ended abnormally");
            }
        }
        tracing::info!("podium client stopped");
    }
}
