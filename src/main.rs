//! # OptionScalp: headless dashboard runtime
//!
//! Connects to the stream, requests live data on every (re)connect, applies
//! all traffic to three in-memory charts and logs a periodic summary until
//! Ctrl-C.
//!
//! ## Environment Variables
//!
//! | Variable                    | Default                  | Description                      |
//! |-----------------------------|--------------------------|----------------------------------|
//! | `OPTIONSCALP_WS_URL`        | `ws://127.0.0.1:8000/ws` | Stream endpoint                  |
//! | `OPTIONSCALP_INDEX`         | `BANKNIFTY`              | Index to fetch / replay          |
//! | `OPTIONSCALP_AUTO_FETCH`    | `true`                   | `fetch_live` on each connect     |
//! | `WS_RECONNECT_BASE_MS`      | `1000`                   | Backoff base                     |
//! | `WS_RECONNECT_MAX_MS`       | `30000`                  | Backoff cap                      |
//! | `WS_RECONNECT_MAX_ATTEMPTS` | `5`                      | Attempts before giving up        |
//! | `WS_READ_TIMEOUT_SECS`      | `45`                     | Silence before the link is dead  |
//! | `SERIES_RETENTION`          | `1000`                   | Bars kept per chart              |
//! | `VIEWPORT_WINDOW_BARS`      | `60`                     | Trailing window width            |
//! | `VIEWPORT_BUFFER_BARS`      | `5`                      | Right-hand padding               |
//! | `BAR_INTERVAL_SECS`         | `60`                     | Bar size, for the padding        |
//! | `MAX_SIGNALS`               | `50`                     | Signal feed length               |
//! | `RUST_LOG`                  | `optionscalp=debug`      | Tracing filter                   |

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use optionscalp::channel::LinkStatus;
use optionscalp::chart::HeadlessFactory;
use optionscalp::config::Config;
use optionscalp::state::AppContext;

const SUMMARY_EVERY: Duration = Duration::from_secs(30);

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional) ──────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("optionscalp=debug".parse()?))
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        OPTIONSCALP — Chart Core               ║
  ║        Index · CE · PE  ·  live stream        ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Config + wiring ───────────────────────────────────────────────────
    let config = Config::from_env().context("invalid configuration")?;
    let factory = HeadlessFactory::with_capacity(config.retention);
    let mut ctx = AppContext::build(config, &factory).context("failed to wire dashboard")?;

    // ── 4. Connect ───────────────────────────────────────────────────────────
    ctx.channel.connect();

    let mut summary = tokio::time::interval(SUMMARY_EVERY);
    summary.tick().await; // arm

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // ── 5. Event loop ────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = ctx.channel.next_event() => {
                let Some(event) = event else { break };
                if ctx.on_event(event) == Some(LinkStatus::GaveUp) {
                    info!("Stream unreachable, staying up with the last data; Ctrl-C to exit");
                }
            }
            _ = summary.tick() => ctx.log_summary(),
            _ = &mut shutdown => {
                info!("🛑 Shutting down");
                break;
            }
        }
    }

    ctx.channel.disconnect();
    ctx.log_summary();
    Ok(())
}
