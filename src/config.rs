//! # config: reads the runtime Config from environment variables

use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::channel::ReconnectPolicy;
use crate::chart::TrackerConfig;

/// Everything the dashboard runtime needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stream endpoint, e.g. `ws://127.0.0.1:8000/ws`
    pub ws_url:         String,
    /// Index requested on `fetch_live` / replay / backtest
    pub index:          String,
    /// Send `fetch_live` on every (re)connect
    pub auto_fetch:     bool,
    pub reconnect:      ReconnectPolicy,
    /// Silence after which the socket is considered dead
    pub read_timeout:   Duration,
    /// Bars kept per chart
    pub retention:      usize,
    pub viewport:       TrackerConfig,
    /// Signal feed length
    pub max_signals:    usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let ws_url = std::env::var("OPTIONSCALP_WS_URL")
            .unwrap_or_else(|_| "ws://127.0.0.1:8000/ws".to_string());
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            bail!("OPTIONSCALP_WS_URL must start with ws:// or wss:// (got '{ws_url}')");
        }

        let auto_fetch = match std::env::var("OPTIONSCALP_AUTO_FETCH")
            .unwrap_or_else(|_| "true".to_string())
            .to_lowercase()
            .as_str()
        {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => bail!("OPTIONSCALP_AUTO_FETCH must be true or false, got '{other}'"),
        };

        let reconnect = ReconnectPolicy {
            base:         Duration::from_millis(env_num("WS_RECONNECT_BASE_MS", 1_000)?),
            cap:          Duration::from_millis(env_num("WS_RECONNECT_MAX_MS", 30_000)?),
            max_attempts: env_num("WS_RECONNECT_MAX_ATTEMPTS", 5)?,
        };

        let buffer_bars: i64 = env_num("VIEWPORT_BUFFER_BARS", 5)?;
        let bar_interval: i64 = env_num("BAR_INTERVAL_SECS", 60)?;

        Ok(Self {
            ws_url,
            index:        std::env::var("OPTIONSCALP_INDEX").unwrap_or_else(|_| "BANKNIFTY".to_string()),
            auto_fetch,
            reconnect,
            read_timeout: Duration::from_secs(env_num("WS_READ_TIMEOUT_SECS", 45)?),
            retention:    env_num("SERIES_RETENTION", 1_000)?,
            viewport:     TrackerConfig {
                window_bars: env_num("VIEWPORT_WINDOW_BARS", 60)?,
                buffer_secs: buffer_bars * bar_interval,
            },
            max_signals:  env_num("MAX_SIGNALS", 50)?,
        })
    }
}

fn env_num<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}
