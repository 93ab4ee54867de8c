//! The set of feeds the dashboard tracks.
//!
//! [`Feeds`] is built once in `main` and handed to whoever needs it; there
//! is no global instance.  All caches share one [`DataSource`] and one
//! change-notification channel.

use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::info;

use crate::cache::{FeedCache, FeedEvent};
use crate::config::Config;
use crate::source::{
    DataSource, DifficultyAdjustment, FearGreed, FeedId, HistoricalPrice, LongShortRatio,
    MiningStats, SpotPrice,
};

const EVENT_CAPACITY: usize = 64;

/// One typed cache per [`FeedId`].
#[derive(Clone)]
pub struct Feeds {
    pub spot_price: FeedCache<SpotPrice>,
    pub price_year_ago: FeedCache<HistoricalPrice>,
    pub fear_greed: FeedCache<FearGreed>,
    pub global_long_short: FeedCache<LongShortRatio>,
    pub top_trader_positions: FeedCache<LongShortRatio>,
    pub hashrate: FeedCache<MiningStats>,
    pub difficulty: FeedCache<DifficultyAdjustment>,
}

/// Runs the same expression against every cache, whatever its record type.
macro_rules! each_feed {
    ($feeds:expr, |$cache:ident| $body:expr) => {{
        let f = $feeds;
        [
            {
                let $cache = &f.spot_price;
                $body
            },
            {
                let $cache = &f.price_year_ago;
                $body
            },
            {
                let $cache = &f.fear_greed;
                $body
            },
            {
                let $cache = &f.global_long_short;
                $body
            },
            {
                let $cache = &f.top_trader_positions;
                $body
            },
            {
                let $cache = &f.hashrate;
                $body
            },
            {
                let $cache = &f.difficulty;
                $body
            },
        ]
    }};
}

impl Feeds {
    pub fn new(config: &Config, source: Arc<dyn DataSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let descriptor = |id| config.descriptor(id);

        Self {
            spot_price: FeedCache::new(descriptor(FeedId::SpotPrice), Arc::clone(&source), events.clone()),
            price_year_ago: FeedCache::new(descriptor(FeedId::PriceYearAgo), Arc::clone(&source), events.clone()),
            fear_greed: FeedCache::new(descriptor(FeedId::FearGreed), Arc::clone(&source), events.clone()),
            global_long_short: FeedCache::new(
                descriptor(FeedId::GlobalLongShort),
                Arc::clone(&source),
                events.clone(),
            ),
            top_trader_positions: FeedCache::new(
                descriptor(FeedId::TopTraderPositions),
                Arc::clone(&source),
                events.clone(),
            ),
            hashrate: FeedCache::new(descriptor(FeedId::Hashrate), Arc::clone(&source), events.clone()),
            difficulty: FeedCache::new(descriptor(FeedId::DifficultyAdjustment), source, events),
        }
    }

    /// Change notifications for every feed.
    ///
    /// All caches publish on one channel, so any of them can hand out a
    /// receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.spot_price.subscribe()
    }

    /// Start auto refresh on every feed.  Returns how many were started.
    pub fn start_all(&self) -> usize {
        let started = each_feed!(self, |c| c.start_auto_refresh())
            .into_iter()
            .filter(|s| *s)
            .count();
        info!(started, "auto refresh enabled");
        started
    }

    /// Stop auto refresh on every feed.  Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let stopped = each_feed!(self, |c| c.stop_auto_refresh())
            .into_iter()
            .filter(|s| *s)
            .count();
        info!(stopped, "auto refresh paused");
        stopped
    }

    /// `true` if any feed is polling on a timer.
    pub fn is_auto_refreshing(&self) -> bool {
        each_feed!(self, |c| c.is_auto_refreshing()).contains(&true)
    }

    /// Refresh every feed concurrently.  Returns the feeds that failed.
    pub async fn refresh_all(&self, force: bool) -> Vec<FeedId> {
        let tasks = each_feed!(self, |c| {
            let c = c.clone();
            async move { (c.id(), c.refresh(force).await.is_ok()) }.boxed()
        });
        join_all(tasks)
            .await
            .into_iter()
            .filter_map(|(id, ok)| (!ok).then_some(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::tests::MockSource;
    use crate::cache::FeedChange;

    fn feeds(source: Arc<MockSource>) -> Feeds {
        Feeds::new(&Config::default(), source)
    }

    #[test]
    fn every_feed_starts_empty() {
        let feeds = feeds(MockSource::new(Duration::ZERO));
        let available = each_feed!(&feeds, |c| c.get().is_available());
        assert_eq!(available, [false; 7]);
    }

    #[test]
    fn caches_carry_their_own_descriptor() {
        let feeds = feeds(MockSource::new(Duration::ZERO));
        let ids = each_feed!(&feeds, |c| c.id());
        assert_eq!(ids, FeedId::ALL);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_all_reports_undecodable_feeds() {
        // The mock answers {"n": k}, which no real record accepts.
        let source = MockSource::new(Duration::ZERO);
        let feeds = feeds(source.clone());

        let failed = feeds.refresh_all(true).await;

        assert_eq!(source.calls(), 7);
        assert_eq!(failed.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_channel_carries_every_feed() {
        let source = MockSource::new(Duration::ZERO);
        source.push(Ok(br#"{"bitcoin":{"usd":50000}}"#.to_vec()));
        let feeds = feeds(source);
        let mut events = feeds.subscribe();

        feeds.spot_price.refresh(true).await.unwrap();
        let _ = feeds.hashrate.refresh(true).await;

        let first = events.recv().await.unwrap();
        assert_eq!((first.feed, first.change), (FeedId::SpotPrice, FeedChange::Updated));
        let second = events.recv().await.unwrap();
        assert_eq!(second.feed, FeedId::Hashrate);
        assert!(matches!(second.change, FeedChange::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_all() {
        let feeds = feeds(MockSource::new(Duration::ZERO));

        assert_eq!(feeds.start_all(), 7);
        assert_eq!(feeds.start_all(), 0);
        assert!(feeds.is_auto_refreshing());
        assert_eq!(feeds.stop_all(), 7);
        assert!(!feeds.is_auto_refreshing());
    }
}
