use podium::prelude::*;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_row(row: &RankedEntry) -> String {
    let movement = match row.change {
        0 => String::new(),
        n if n > 0 => format!("  ▲{n}"),
        n => format!("  ▼{}", -n),
    };
    format!(
        "{:>3}. {:<20} {:>9}{movement}",
        row.rank, row.entry.username, row.entry.score
    )
}

fn render(snap: &SyncSnapshot) -> String {
    let mut out = String::new();
    if let Some(err) = &snap.error {
        out.push_str(&format!("! {err} (showing last known ranking)\n"));
    }
    if snap.rows.is_empty() && !snap.is_loading() {
        out.push_str("  no scores yet\n");
    }
    for row in &snap.rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    for note in &snap.notifications {
        out.push_str(&format!("  * [{}] {}\n", note.kind, note.message));
    }
    out
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    podium::init_tracing();

    let config = ClientConfig::load()?;
    eprintln!("watching leaderboard at {}", config.api_base_url);
    let client = PodiumClient::builder(config).start()?;

    if let (Ok(email), Ok(password)) = (
        std::env::var("PODIUM_EMAIL"),
        std::env::var("PODIUM_PASSWORD"),
    ) {
        match client.login(&email, &password).await {
            Ok(user) => eprintln!("signed in as {user}"),
            Err(e) => eprintln!("sign-in failed: {e}"),
        }
    } else if let Some(user) = client.session().user() {
        eprintln!("restored session for {user}");
    }

    let mut updates = client.watch_leaderboard();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = updates.borrow_and_update().clone();
                print!("{}", render(&snap));
                println!("---");
            }
        }
    }

    tracing::info!("shutting down");
    client.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rank: usize, name: &str, score: u64, change: i64) -> RankedEntry {
        RankedEntry {
            rank,
            entry: LeaderboardEntry {
                username: name.into(),
                score,
                timestamp: "t".into(),
            },
            change,
        }
    }

    #[test]
    fn test_render_row_shows_movement() {
        assert_eq!(render_row(&row(1, "ada", 1500, 0)).trim_end(), "  1. ada                       1500");
        assert!(render_row(&row(2, "bob", 900, 1)).ends_with("▲1"));
        assert!(render_row(&row(3, "cy", 10, -2)).ends_with("▼2"));
    }

    #[test]
    fn test_render_keeps_rows_on_error() {
        let snap = SyncSnapshot {
            rows: vec![row(1, "ada", 1500, 0)],
            error: Some("Internal server error".into()),
            phase: SyncPhase::Error,
            ..SyncSnapshot::default()
        };
        let text = render(&snap);
        assert!(text.starts_with("! Internal server error"));
        assert!(text.contains("ada"));
    }

    #[test]
    fn test_render_empty_board() {
        let snap = SyncSnapshot {
            phase: SyncPhase::Ready,
            ..SyncSnapshot::default()
        };
        assert_eq!(render(&snap), "  no scores yet\n");
    }
}
