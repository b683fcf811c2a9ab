//! The push task: keeps a socket to the push service and turns its events
//! into actor commands.

use std::sync::Arc;
use std::time::Duration;

use podium_protocol::{Codec, JsonCodec, NotificationKind, PushEvent, PusherFrame};
use podium_transport::{Connection, Connector};
use rand::Rng;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::sync::SyncCommand;
use crate::{PushConfig, PushStatus};

/// Why a connected session ended.
enum SessionEnd {
    Cancelled,
    Lost(String),
}

/// Connects, listens, and reconnects after a delay until `cancel` fires.
pub(crate) async fn run<K: Connector>(
    connector: K,
    url: String,
    config: PushConfig,
    commands: mpsc::Sender<SyncCommand>,
    reconnect: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        status(&commands, PushStatus::Connecting).await;
        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connector.connect(&url) => result,
        };

        let reason = match connected {
            Ok(conn) => {
                tracing::info!(conn = %conn.id(), channel = %config.channel, "push connected");
                attempt = 0;
                match listen(&conn, &config.channel, &commands, &cancel).await {
                    SessionEnd::Cancelled => {
                        teardown(&conn, &config.channel).await;
                        break;
                    }
                    SessionEnd::Lost(reason) => reason,
                }
            }
            Err(e) => e.to_string(),
        };

        attempt += 1;
        let delay = reconnect_delay(&config);
        tracing::warn!(
            %reason,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "push connection lost, reconnecting"
        );
        status(&commands, PushStatus::Disconnected { reason }).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
            _ = reconnect.notified() => tracing::debug!("push reconnect requested"),
        }
    }

    tracing::debug!("push task stopped");
}

async fn listen<C: Connection>(
    conn: &C,
    channel: &str,
    commands: &mpsc::Sender<SyncCommand>,
    cancel: &CancellationToken,
) -> SessionEnd {
    if let Err(e) = send_frame(conn, &PusherFrame::subscribe(channel)).await {
        return SessionEnd::Lost(e);
    }

    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            received = conn.recv() => received,
        };
        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return SessionEnd::Lost("connection closed by server".into()),
            Err(e) => return SessionEnd::Lost(e.to_string()),
        };

        let frame: PusherFrame = match JsonCodec.decode(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable push frame");
                continue;
            }
        };
        let event = match PushEvent::from_frame(&frame, channel) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(event = %frame.event, error = %e, "skipping malformed push event");
                continue;
            }
        };

        if let Err(e) = dispatch(conn, event, commands).await {
            return SessionEnd::Lost(e);
        }
    }
}

async fn dispatch<C: Connection>(
    conn: &C,
    event: PushEvent,
    commands: &mpsc::Sender<SyncCommand>,
) -> Result<(), String> {
    let cmd = match event {
        PushEvent::ConnectionEstablished { socket_id } => {
            tracing::debug!(?socket_id, "push connection established");
            SyncCommand::PushStatus(PushStatus::Connected)
        }
        PushEvent::SubscriptionSucceeded { channel } => {
            tracing::debug!(%channel, "subscribed");
            return Ok(());
        }
        PushEvent::Ping => return send_frame(conn, &PusherFrame::pong()).await,
        PushEvent::ServiceError { message, code } => {
            tracing::warn!(%message, ?code, "push service error");
            return Ok(());
        }
        PushEvent::ScoreSubmitted(ranking) => SyncCommand::Pushed(ranking),
        PushEvent::Milestone { username, score } => SyncCommand::Notify {
            kind: NotificationKind::HighScore,
            message: format!("{username} hit {}!", group_thousands(score)),
            score: Some(score),
        },
        PushEvent::Notification {
            kind,
            message,
            score,
        } => SyncCommand::Notify {
            kind,
            message,
            score,
        },
        PushEvent::Ignored { event } => {
            tracing::trace!(%event, "ignoring push event");
            return Ok(());
        }
    };
    // A closed channel means the actor is gone; the cancel branch ends us.
    let _ = commands.send(cmd).await;
    Ok(())
}

async fn teardown<C: Connection>(conn: &C, channel: &str) {
    if let Err(e) = send_frame(conn, &PusherFrame::unsubscribe(channel)).await {
        tracing::debug!(error = %e, "unsubscribe failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "push close failed");
    }
    tracing::info!(channel, "push disconnected");
}

async fn send_frame<C: Connection>(conn: &C, frame: &PusherFrame) -> Result<(), String> {
    let bytes = JsonCodec.encode(frame).map_err(|e| e.to_string())?;
    conn.send(&bytes).await.map_err(|e| e.to_string())
}

async fn status(commands: &mpsc::Sender<SyncCommand>, status: PushStatus) {
    let _ = commands.send(SyncCommand::PushStatus(status)).await;
}

/// `1500` as `1,500`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn reconnect_delay(config: &PushConfig) -> Duration {
    let jitter_ms = config.reconnect_jitter.as_millis() as u64;
    let jitter = if jitter_ms == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    };
    config.reconnect_delay + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_500), "1,500");
        assert_eq!(group_thousands(1_000_000), "1,000,000");
        assert_eq!(group_thousands(123_456_789), "123,456,789");
    }

    #[test]
    fn test_reconnect_delay_without_jitter_is_exact() {
        let config = PushConfig {
            reconnect_delay: Duration::from_secs(3),
            reconnect_jitter: Duration::ZERO,
            ..PushConfig::default()
        };
        assert_eq!(reconnect_delay(&config), Duration::from_secs(3));
    }
}
