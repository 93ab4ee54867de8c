//! CoinGecko spot and historical price records.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use super::FeedPayload;
use crate::error::FetchError;

/// Current BTC price in one fiat currency, from `/simple/price`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotPrice {
    pub currency: String,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
}

impl FeedPayload for SpotPrice {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        // {"bitcoin":{"usd":67000.1,"usd_market_cap":..,"usd_24h_vol":..,"usd_24h_change":..}}
        let mut coins: HashMap<String, HashMap<String, Option<f64>>> = serde_json::from_slice(body)?;
        let fields = coins
            .remove("bitcoin")
            .ok_or_else(|| FetchError::Decode("missing \"bitcoin\" entry".into()))?;

        // The bare currency code is the only key without a suffix.
        let (currency, price) = fields
            .iter()
            .find(|(key, _)| !key.contains('_'))
            .map(|(key, value)| (key.clone(), *value))
            .ok_or_else(|| FetchError::Decode("no price field".into()))?;
        let price = price.ok_or_else(|| FetchError::Decode(format!("{currency}: null price")))?;

        let extra = |suffix: &str| fields.get(&format!("{currency}_{suffix}")).copied().flatten();

        Ok(SpotPrice {
            change_24h: extra("24h_change"),
            market_cap: extra("market_cap"),
            volume_24h: extra("24h_vol"),
            currency,
            price,
        })
    }
}

/// BTC price on a past day, from `/coins/bitcoin/history`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalPrice {
    /// Closing price keyed by lowercase currency code.
    pub prices: BTreeMap<String, f64>,
}

impl HistoricalPrice {
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.prices.get(&currency.to_ascii_lowercase()).copied()
    }
}

#[derive(Deserialize)]
struct HistoryWire {
    market_data: Option<MarketDataWire>,
}

#[derive(Deserialize)]
struct MarketDataWire {
    current_price: BTreeMap<String, f64>,
}

impl FeedPayload for HistoricalPrice {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let wire: HistoryWire = serde_json::from_slice(body)?;
        // CoinGecko omits market_data for dates it has no snapshot for.
        let market = wire
            .market_data
            .ok_or_else(|| FetchError::Decode("no market_data for requested date".into()))?;
        Ok(HistoricalPrice {
            prices: market.current_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_price_with_extras() {
        let body = br#"{"bitcoin":{"usd":67012.5,"usd_market_cap":1320000000000.0,"usd_24h_vol":31000000000.0,"usd_24h_change":-1.75}}"#;
        let spot = SpotPrice::decode(body).unwrap();

        assert_eq!(spot.currency, "usd");
        assert_eq!(spot.price, 67012.5);
        assert_eq!(spot.change_24h, Some(-1.75));
        assert_eq!(spot.market_cap, Some(1_320_000_000_000.0));
        assert_eq!(spot.volume_24h, Some(31_000_000_000.0));
    }

    #[test]
    fn missing_and_null_extras_are_none() {
        let body = br#"{"bitcoin":{"eur":61000,"eur_24h_change":null}}"#;
        let spot = SpotPrice::decode(body).unwrap();

        assert_eq!(spot.currency, "eur");
        assert_eq!(spot.price, 61000.0);
        assert!(spot.change_24h.is_none());
        assert!(spot.market_cap.is_none());
    }

    #[test]
    fn empty_object_is_decode_error() {
        let err = SpotPrice::decode(b"{}").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn rate_limit_body_is_decode_error() {
        let body = br#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit"}}"#;
        assert!(matches!(SpotPrice::decode(body), Err(FetchError::Decode(_))));
    }

    #[test]
    fn decodes_history_prices() {
        let body = br#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_data":{"current_price":{"usd":42000.0,"eur":38500.25},"market_cap":{"usd":1.0}}}"#;
        let hist = HistoricalPrice::decode(body).unwrap();

        assert_eq!(hist.price_in("usd"), Some(42000.0));
        assert_eq!(hist.price_in("EUR"), Some(38500.25));
        assert_eq!(hist.price_in("gbp"), None);
    }

    #[test]
    fn history_without_market_data_is_decode_error() {
        let body = br#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin"}"#;
        assert!(matches!(HistoricalPrice::decode(body), Err(FetchError::Decode(_))));
    }
}
