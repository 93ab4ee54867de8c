//! Binance USDⓈ-M futures long/short ratio statistics.
//!
//! Both `globalLongShortAccountRatio` and `topLongShortPositionRatio` return
//! the same array shape, so one record type serves both feeds.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{parse_decimal, FeedPayload};
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub struct RatioPoint {
    /// long share / short share
    pub ratio: f64,
    /// Fraction of accounts (or positions) that are long, 0..=1.
    pub long_share: f64,
    pub short_share: f64,
    pub timestamp: DateTime<Utc>,
}

/// A window of ratio samples, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LongShortRatio {
    pub symbol: String,
    pub points: Vec<RatioPoint>,
}

impl LongShortRatio {
    pub fn latest(&self) -> &RatioPoint {
        // decode() rejects empty windows
        &self.points[self.points.len() - 1]
    }

    /// Ratio change across the whole window.
    pub fn drift(&self) -> f64 {
        self.latest().ratio - self.points[0].ratio
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointWire {
    symbol: String,
    long_short_ratio: String,
    long_account: String,
    short_account: String,
    timestamp: i64,
}

impl FeedPayload for LongShortRatio {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let mut wire: Vec<PointWire> = serde_json::from_slice(body)?;
        if wire.is_empty() {
            return Err(FetchError::Decode("empty ratio window".into()));
        }
        wire.sort_by_key(|p| p.timestamp);

        let symbol = wire[0].symbol.clone();
        let points = wire
            .iter()
            .map(|p| {
                let timestamp = DateTime::from_timestamp_millis(p.timestamp).ok_or_else(|| {
                    FetchError::Decode(format!("timestamp out of range: {}", p.timestamp))
                })?;
                Ok(RatioPoint {
                    ratio: parse_decimal("longShortRatio", &p.long_short_ratio)?,
                    long_share: parse_decimal("longAccount", &p.long_account)?,
                    short_share: parse_decimal("shortAccount", &p.short_account)?,
                    timestamp,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        Ok(LongShortRatio { symbol, points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_orders_oldest_first() {
        let body = br#"[
            {"symbol":"BTCUSDT","longShortRatio":"1.9000","longAccount":"0.6552","shortAccount":"0.3448","timestamp":1767226200000},
            {"symbol":"BTCUSDT","longShortRatio":"1.8105","longAccount":"0.6442","shortAccount":"0.3558","timestamp":1767225900000}
        ]"#;
        let ratio = LongShortRatio::decode(body).unwrap();

        assert_eq!(ratio.symbol, "BTCUSDT");
        assert_eq!(ratio.points.len(), 2);
        assert_eq!(ratio.points[0].ratio, 1.8105);
        assert_eq!(ratio.latest().ratio, 1.9);
        assert_eq!(ratio.latest().long_share, 0.6552);
        assert!((ratio.drift() - 0.0895).abs() < 1e-9);
    }

    #[test]
    fn empty_window_is_decode_error() {
        assert!(matches!(LongShortRatio::decode(b"[]"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn api_error_object_is_decode_error() {
        let body = br#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(matches!(LongShortRatio::decode(body), Err(FetchError::Decode(_))));
    }

    #[test]
    fn bad_decimal_is_decode_error() {
        let body = br#"[{"symbol":"BTCUSDT","longShortRatio":"n/a","longAccount":"0.5","shortAccount":"0.5","timestamp":1}]"#;
        let err = LongShortRatio::decode(body).unwrap_err();
        assert!(err.to_string().contains("longShortRatio"));
    }
}
