//! Alternative.me Crypto Fear & Greed Index.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{parse_decimal, FeedPayload};
use crate::error::FetchError;

/// One daily index reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FearGreedReading {
    /// 0 (extreme fear) to 100 (extreme greed).
    pub value: u8,
    /// e.g. "Fear", "Extreme Greed".
    pub classification: String,
    pub timestamp: DateTime<Utc>,
}

/// The index history, newest first (the order the API returns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FearGreed {
    pub readings: Vec<FearGreedReading>,
    /// Time until the API publishes the next reading, if it said.
    pub next_update: Option<Duration>,
}

impl FearGreed {
    pub fn latest(&self) -> &FearGreedReading {
        // decode() rejects empty histories
        &self.readings[0]
    }

    /// Change between the latest reading and the one before it.
    pub fn change(&self) -> Option<i16> {
        let previous = self.readings.get(1)?;
        Some(i16::from(self.latest().value) - i16::from(previous.value))
    }
}

#[derive(Deserialize)]
struct Wire {
    #[serde(default)]
    data: Vec<ReadingWire>,
    metadata: Option<MetadataWire>,
}

#[derive(Deserialize)]
struct ReadingWire {
    value: String,
    value_classification: String,
    timestamp: String,
    time_until_update: Option<String>,
}

#[derive(Deserialize)]
struct MetadataWire {
    error: Option<String>,
}

impl FeedPayload for FearGreed {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let wire: Wire = serde_json::from_slice(body)?;

        if let Some(error) = wire.metadata.and_then(|m| m.error) {
            return Err(FetchError::Decode(format!("api reported error: {error}")));
        }
        if wire.data.is_empty() {
            return Err(FetchError::Decode("empty index history".into()));
        }

        let next_update = match wire.data[0].time_until_update.as_deref() {
            Some(raw) => Some(Duration::from_secs(parse_decimal("time_until_update", raw)?)),
            None => None,
        };

        let readings = wire
            .data
            .into_iter()
            .map(|r| {
                let secs: i64 = parse_decimal("timestamp", &r.timestamp)?;
                let timestamp = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| FetchError::Decode(format!("timestamp out of range: {secs}")))?;
                Ok(FearGreedReading {
                    value: parse_decimal("value", &r.value)?,
                    classification: r.value_classification,
                    timestamp,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        Ok(FearGreed {
            readings,
            next_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"{
        "name": "Fear and Greed Index",
        "data": [
            {"value": "72", "value_classification": "Greed", "timestamp": "1767225600", "time_until_update": "3600"},
            {"value": "65", "value_classification": "Greed", "timestamp": "1767139200"}
        ],
        "metadata": {"error": null}
    }"#;

    #[test]
    fn decodes_history_newest_first() {
        let fg = FearGreed::decode(SAMPLE).unwrap();

        assert_eq!(fg.readings.len(), 2);
        assert_eq!(fg.latest().value, 72);
        assert_eq!(fg.latest().classification, "Greed");
        assert_eq!(fg.latest().timestamp.timestamp(), 1_767_225_600);
        assert_eq!(fg.next_update, Some(Duration::from_secs(3600)));
        assert_eq!(fg.change(), Some(7));
    }

    #[test]
    fn single_reading_has_no_change() {
        let body = br#"{"data":[{"value":"10","value_classification":"Extreme Fear","timestamp":"1700000000"}]}"#;
        let fg = FearGreed::decode(body).unwrap();
        assert_eq!(fg.change(), None);
        assert!(fg.next_update.is_none());
    }

    #[test]
    fn empty_history_is_decode_error() {
        let body = br#"{"name":"Fear and Greed Index","data":[],"metadata":{"error":null}}"#;
        assert!(matches!(FearGreed::decode(body), Err(FetchError::Decode(_))));
    }

    #[test]
    fn api_error_is_surfaced() {
        let body = br#"{"data":[],"metadata":{"error":"limit must be a number"}}"#;
        let err = FearGreed::decode(body).unwrap_err();
        assert!(err.to_string().contains("limit must be a number"));
    }

    #[test]
    fn non_numeric_value_is_decode_error() {
        let body = br#"{"data":[{"value":"lots","value_classification":"Greed","timestamp":"1700000000"}]}"#;
        assert!(matches!(FearGreed::decode(body), Err(FetchError::Decode(_))));
    }
}
