//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::source::{FeedDescriptor, FeedId, UrlParams};

/// Sampling periods Binance accepts for futures ratio statistics.
const BINANCE_PERIODS: [&str; 9] = ["5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d"];
const MAX_LIMIT: u16 = 500;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Fiat currency for spot and historical prices
    #[arg(long, env = "BTC_PULSE_CURRENCY", default_value = "usd")]
    pub currency: String,

    /// Binance futures symbol for long/short ratios
    #[arg(long, env = "BTC_PULSE_SYMBOL", default_value = "BTCUSDT")]
    pub symbol: String,

    /// Sampling period for long/short ratios (5m, 15m, 30m, 1h, 2h, 4h, 6h, 12h, 1d)
    #[arg(long, env = "BTC_PULSE_PERIOD", default_value = "5m")]
    pub period: String,

    /// Number of samples requested from history endpoints
    #[arg(long, env = "BTC_PULSE_LIMIT", default_value_t = 30)]
    pub limit: u16,

    /// Per-request timeout in seconds
    #[arg(long, env = "BTC_PULSE_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Directory for the rolling log file
    #[arg(long, env = "BTC_PULSE_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "BTC_PULSE_LOG_LEVEL", default_value = "btc_pulse=info,warn")]
    pub log_level: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub params: UrlParams,
    pub timeout: Duration,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self {
            params: UrlParams {
                currency: cli.currency.trim().to_ascii_lowercase(),
                symbol: cli.symbol.trim().to_ascii_uppercase(),
                period: cli.period.trim().to_string(),
                limit: cli.limit,
            },
            timeout: Duration::from_secs(cli.timeout_secs),
            log_dir: cli.log_dir,
            log_level: cli.log_level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        if p.currency.is_empty() || !p.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("currency must be a letter code like \"usd\", got {:?}", p.currency);
        }
        if p.symbol.is_empty() || !p.symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("symbol must be alphanumeric like \"BTCUSDT\", got {:?}", p.symbol);
        }
        if !BINANCE_PERIODS.contains(&p.period.as_str()) {
            bail!("period must be one of {}, got {:?}", BINANCE_PERIODS.join(", "), p.period);
        }
        if p.limit == 0 || p.limit > MAX_LIMIT {
            bail!("limit must be between 1 and {MAX_LIMIT}, got {}", p.limit);
        }
        if self.timeout.is_zero() {
            bail!("timeout must be at least one second");
        }
        for id in FeedId::ALL {
            let url = self.descriptor(id).url();
            if url.contains(['{', '}']) {
                bail!("{id}: unresolved placeholder in {url}");
            }
        }
        Ok(())
    }

    /// The descriptor for `id` with this configuration's parameters.
    pub fn descriptor(&self, id: FeedId) -> FeedDescriptor {
        FeedDescriptor::default_for(id, &self.params)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: UrlParams::default(),
            timeout: Duration::from_secs(10),
            log_dir: PathBuf::from("logs"),
            log_level: "btc_pulse=info,warn".into(),
        }
    }
}
