//! Feed identities, endpoint templates and their default timing.
//!
//! A [`FeedDescriptor`] is built once at startup from [`crate::config::Config`]
//! and never changes afterwards.

use std::fmt;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};

/// Every feed the dashboard tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedId {
    SpotPrice,
    PriceYearAgo,
    FearGreed,
    GlobalLongShort,
    TopTraderPositions,
    Hashrate,
    DifficultyAdjustment,
}

impl FeedId {
    pub const ALL: [FeedId; 7] = [
        FeedId::SpotPrice,
        FeedId::PriceYearAgo,
        FeedId::FearGreed,
        FeedId::GlobalLongShort,
        FeedId::TopTraderPositions,
        FeedId::Hashrate,
        FeedId::DifficultyAdjustment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeedId::SpotPrice => "Spot price",
            FeedId::PriceYearAgo => "Price 1y ago",
            FeedId::FearGreed => "Fear & Greed",
            FeedId::GlobalLongShort => "Long/short accounts",
            FeedId::TopTraderPositions => "Top trader positions",
            FeedId::Hashrate => "Hashrate",
            FeedId::DifficultyAdjustment => "Difficulty adjustment",
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Endpoint templates
// ---------------------------------------------------------------------------

const SPOT_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies={currency}&include_24hr_change=true&include_market_cap=true&include_24hr_vol=true";
const PRICE_HISTORY_URL: &str =
    "https://api.coingecko.com/api/v3/coins/bitcoin/history?date={date}&localization=false";
const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/?limit={limit}";
const GLOBAL_LONG_SHORT_URL: &str = "https://fapi.binance.com/futures/data/globalLongShortAccountRatio?symbol={symbol}&period={period}&limit={limit}";
const TOP_TRADER_POSITIONS_URL: &str = "https://fapi.binance.com/futures/data/topLongShortPositionRatio?symbol={symbol}&period={period}&limit={limit}";
const HASHRATE_URL: &str = "https://mempool.space/api/v1/mining/hashrate/3d";
const DIFFICULTY_ADJUSTMENT_URL: &str = "https://mempool.space/api/v1/difficulty-adjustment";

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Values substituted into `{currency}`, `{symbol}`, `{period}` and `{limit}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParams {
    pub currency: String,
    pub symbol: String,
    pub period: String,
    pub limit: u16,
}

impl Default for UrlParams {
    fn default() -> Self {
        Self {
            currency: "usd".into(),
            symbol: "BTCUSDT".into(),
            period: "5m".into(),
            limit: 30,
        }
    }
}

/// One external data source: where to fetch it and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDescriptor {
    pub id: FeedId,
    pub url_template: String,
    pub params: UrlParams,
    /// `{date}` resolves to today (UTC) minus this many days.
    pub date_offset_days: u64,
    pub refresh_interval: Duration,
    pub freshness_window: Duration,
}

impl FeedDescriptor {
    pub fn new(
        id: FeedId,
        url_template: impl Into<String>,
        params: UrlParams,
        refresh_interval: Duration,
        freshness_window: Duration,
    ) -> Self {
        Self {
            id,
            url_template: url_template.into(),
            params,
            date_offset_days: 0,
            refresh_interval,
            freshness_window,
        }
    }

    pub fn with_date_offset(mut self, days: u64) -> Self {
        self.date_offset_days = days;
        self
    }

    /// The built-in endpoint and timing for `id`.
    pub fn default_for(id: FeedId, params: &UrlParams) -> Self {
        let secs = Duration::from_secs;
        let params = params.clone();
        match id {
            FeedId::SpotPrice => Self::new(id, SPOT_PRICE_URL, params, secs(MINUTE), secs(30)),
            FeedId::PriceYearAgo => {
                Self::new(id, PRICE_HISTORY_URL, params, secs(6 * HOUR), secs(HOUR))
                    .with_date_offset(365)
            }
            FeedId::FearGreed => Self::new(id, FEAR_GREED_URL, params, secs(HOUR), secs(30 * MINUTE)),
            FeedId::GlobalLongShort => {
                Self::new(id, GLOBAL_LONG_SHORT_URL, params, secs(5 * MINUTE), secs(2 * MINUTE))
            }
            FeedId::TopTraderPositions => {
                Self::new(id, TOP_TRADER_POSITIONS_URL, params, secs(5 * MINUTE), secs(2 * MINUTE))
            }
            FeedId::Hashrate => Self::new(id, HASHRATE_URL, params, secs(10 * MINUTE), secs(5 * MINUTE)),
            FeedId::DifficultyAdjustment => {
                Self::new(id, DIFFICULTY_ADJUSTMENT_URL, params, secs(10 * MINUTE), secs(5 * MINUTE))
            }
        }
    }

    /// The URL to fetch right now.
    pub fn url(&self) -> String {
        self.url_on(Utc::now().date_naive())
    }

    /// The URL as it would be rendered on `today`.
    ///
    /// Unknown placeholders are left untouched; [`crate::config::Config::validate`]
    /// rejects templates that still contain braces after rendering.
    pub fn url_on(&self, today: NaiveDate) -> String {
        let date = today
            .checked_sub_days(Days::new(self.date_offset_days))
            .unwrap_or(today);

        self.url_template
            .replace("{currency}", &self.params.currency)
            .replace("{symbol}", &self.params.symbol)
            .replace("{period}", &self.params.period)
            .replace("{limit}", &self.params.limit.to_string())
            .replace("{date}", &date.format("%d-%m-%Y").to_string())
    }
}
