//! Mempool.space mining statistics.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::FeedPayload;
use crate::error::FetchError;

const EXA: f64 = 1e18;

/// Network hashrate and difficulty, from `/v1/mining/hashrate/{range}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningStats {
    /// Hashes per second.
    pub current_hashrate: f64,
    pub current_difficulty: f64,
    /// Daily average hashrate samples, oldest first.
    pub samples: Vec<(DateTime<Utc>, f64)>,
}

impl MiningStats {
    pub fn hashrate_ehs(&self) -> f64 {
        self.current_hashrate / EXA
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashrateWire {
    #[serde(default)]
    hashrates: Vec<HashrateSampleWire>,
    current_hashrate: f64,
    current_difficulty: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashrateSampleWire {
    timestamp: i64,
    avg_hashrate: f64,
}

impl FeedPayload for MiningStats {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let wire: HashrateWire = serde_json::from_slice(body)?;
        let mut samples = wire
            .hashrates
            .into_iter()
            .filter_map(|s| DateTime::from_timestamp(s.timestamp, 0).map(|t| (t, s.avg_hashrate)))
            .collect::<Vec<_>>();
        samples.sort_by_key(|(t, _)| *t);

        Ok(MiningStats {
            current_hashrate: wire.current_hashrate,
            current_difficulty: wire.current_difficulty,
            samples,
        })
    }
}

/// Progress towards the next difficulty retarget.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyAdjustment {
    pub progress_percent: f64,
    /// Estimated change at the next retarget, in percent.
    pub difficulty_change: f64,
    pub remaining_blocks: u32,
    pub remaining_time: chrono::Duration,
    pub estimated_retarget: DateTime<Utc>,
    pub next_retarget_height: u32,
    /// Change applied at the previous retarget, in percent.
    pub previous_retarget: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustmentWire {
    progress_percent: f64,
    difficulty_change: f64,
    estimated_retarget_date: i64,
    remaining_blocks: u32,
    remaining_time: i64,
    previous_retarget: f64,
    next_retarget_height: u32,
}

impl FeedPayload for DifficultyAdjustment {
    fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let wire: AdjustmentWire = serde_json::from_slice(body)?;
        let estimated_retarget = DateTime::from_timestamp_millis(wire.estimated_retarget_date)
            .ok_or_else(|| {
                FetchError::Decode(format!(
                    "estimatedRetargetDate out of range: {}",
                    wire.estimated_retarget_date
                ))
            })?;
        let remaining_time = chrono::Duration::try_milliseconds(wire.remaining_time).ok_or_else(|| {
            FetchError::Decode(format!("remainingTime out of range: {}", wire.remaining_time))
        })?;

        Ok(DifficultyAdjustment {
            progress_percent: wire.progress_percent,
            difficulty_change: wire.difficulty_change,
            remaining_blocks: wire.remaining_blocks,
            remaining_time,
            estimated_retarget,
            next_retarget_height: wire.next_retarget_height,
            previous_retarget: wire.previous_retarget,
        })
    }
}
