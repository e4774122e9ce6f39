// src/aggregator.rs
use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, U256};
use futures_util::{stream, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::format::scaled_units;
use crate::models::{Currency, TipEvent, TipperStats, NATIVE_DECIMALS};
use crate::parser;
use crate::rpc::{LogSource, TransportError, NATIVE_TIP_SIGNATURE, TOKEN_TIP_SIGNATURE};

/// A pass could not complete. All-or-nothing: no partial result accompanies
/// this, so callers must render "unavailable", not "empty".
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("log source failure: {0}")]
    Source(#[from] TransportError),
}

/// Derives leaderboard and recent-activity views by replaying the tipping
/// contract's event history. Holds no state between passes; every call
/// re-derives its result from the source.
#[derive(Debug, Clone)]
pub struct Aggregator<S> {
    source: S,
    token_decimals: u32,
    conversion_rate: Decimal,
    block_lookup_concurrency: usize,
}

impl<S: LogSource> Aggregator<S> {
    pub fn new(
        source: S,
        token_decimals: u32,
        conversion_rate: Decimal,
        block_lookup_concurrency: usize,
    ) -> Self {
        Self {
            source,
            token_decimals,
            conversion_rate,
            block_lookup_concurrency: block_lookup_concurrency.max(1),
        }
    }

    /// Both event streams over the full history, decoded and merged.
    /// Malformed records are dropped; a transport failure on either query
    /// aborts the whole pass.
    async fn fetch_all_tips(&self) -> Result<Vec<TipEvent>, AggregationError> {
        let (native_logs, token_logs) = tokio::try_join!(
            self.source.get_logs(NATIVE_TIP_SIGNATURE),
            self.source.get_logs(TOKEN_TIP_SIGNATURE),
        )?;

        let mut tips = Vec::with_capacity(native_logs.len() + token_logs.len());
        let mut dropped = 0usize;
        for (logs, currency) in [(native_logs, Currency::Native), (token_logs, Currency::Token)] {
            for log in &logs {
                match parser::decode_tip(log, currency) {
                    Some(tip) => tips.push(tip),
                    None => dropped += 1,
                }
            }
        }
        if dropped > 0 {
            debug!("Dropped {} malformed tip logs", dropped);
        }

        Ok(tips)
    }

    /// Top tippers ranked by combined cross-currency value.
    pub async fn top_tippers(&self, top_n: usize) -> Result<Vec<TipperStats>, AggregationError> {
        let tips = self.fetch_all_tips().await?;

        let mut totals: HashMap<Address, (U256, U256)> = HashMap::new();
        for tip in &tips {
            let entry = totals.entry(tip.from).or_default();
            match tip.currency {
                Currency::Native => entry.0 += tip.amount,
                Currency::Token => entry.1 += tip.amount,
            }
        }

        let mut ranked: Vec<TipperStats> = totals
            .into_iter()
            .map(|(address, (native_total, token_total))| {
                let ranking_value = scaled_units(native_total, NATIVE_DECIMALS)
                    + scaled_units(token_total, self.token_decimals) * self.conversion_rate;
                TipperStats {
                    address,
                    native_total,
                    token_total,
                    ranking_value,
                }
            })
            .filter(|t| !t.ranking_value.is_zero())
            .collect();

        // descending by value; equal values fall back to address order so
        // repeated passes agree
        ranked.sort_by(|a, b| {
            b.ranking_value
                .cmp(&a.ranking_value)
                .then_with(|| a.address.cmp(&b.address))
        });
        ranked.truncate(top_n);

        info!(
            "Leaderboard pass: {} tips → {} ranked entries",
            tips.len(),
            ranked.len()
        );
        Ok(ranked)
    }

    /// Most recent tips in block order, timestamps resolved.
    pub async fn recent_tips(&self, limit: usize) -> Result<Vec<TipEvent>, AggregationError> {
        let mut tips = self.fetch_all_tips().await?;

        // one lookup per distinct block, bounded fan-out
        let blocks: HashSet<u64> = tips.iter().map(|t| t.block_number).collect();
        let lookups = blocks.into_iter().map(|number| {
            let source = &self.source;
            async move { source.block_timestamp(number).await.map(|ts| (number, ts)) }
        });
        let timestamps: HashMap<u64, u64> = stream::iter(lookups)
            .buffer_unordered(self.block_lookup_concurrency)
            .try_collect()
            .await?;

        for tip in &mut tips {
            tip.timestamp = timestamps.get(&tip.block_number).copied();
        }

        // block number is the canonical order; log index breaks same-block ties
        tips.sort_by(|a, b| {
            b.block_number
                .cmp(&a.block_number)
                .then_with(|| b.log_index.cmp(&a.log_index))
        });
        tips.truncate(limit);

        info!("Recent-tips pass: {} entries returned", tips.len());
        Ok(tips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::fixtures::{addr, tip_log};
    use crate::rpc::Log;

    const ONE: u64 = 1_000_000_000_000_000_000; // 1.0 at 18 decimals

    #[derive(Default)]
    struct MockSource {
        native: Vec<Log>,
        token: Vec<Log>,
        fail_native: bool,
        fail_token: bool,
    }

    impl LogSource for MockSource {
        async fn get_logs(&self, event_signature: &str) -> Result<Vec<Log>, TransportError> {
            match event_signature {
                NATIVE_TIP_SIGNATURE => {
                    if self.fail_native {
                        return Err(TransportError::Other("native query down".to_string()));
                    }
                    Ok(self.native.clone())
                }
                _ => {
                    if self.fail_token {
                        return Err(TransportError::Other("token query down".to_string()));
                    }
                    Ok(self.token.clone())
                }
            }
        }

        async fn block_timestamp(&self, block_number: u64) -> Result<u64, TransportError> {
            Ok(block_number * 12)
        }
    }

    fn aggregator(source: MockSource) -> Aggregator<MockSource> {
        Aggregator::new(source, 18, "0.001".parse().unwrap(), 4)
    }

    fn units(n: u64) -> U256 {
        U256::from(n) * U256::from(ONE)
    }

    #[tokio::test]
    async fn combines_both_currencies_for_one_address() {
        let source = MockSource {
            native: vec![tip_log(addr(0xaa), units(1), "gm", 10, 0)],
            token: vec![tip_log(addr(0xaa), units(500), "gm again", 11, 0)],
            ..Default::default()
        };

        let ranked = aggregator(source).top_tippers(5).await.unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].address, addr(0xaa));
        assert_eq!(ranked[0].native_total, units(1));
        assert_eq!(ranked[0].token_total, units(500));
        // 1.0 native + 500 tokens * 0.001
        assert_eq!(ranked[0].ranking_value, "1.5".parse().unwrap());
    }

    #[tokio::test]
    async fn empty_history_is_an_empty_success() {
        let ranked = aggregator(MockSource::default()).top_tippers(5).await.unwrap();
        assert!(ranked.is_empty());

        let recent = aggregator(MockSource::default()).recent_tips(5).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn one_failing_query_fails_the_whole_pass() {
        let source = MockSource {
            token: vec![tip_log(addr(0xbb), units(100), "", 5, 0)],
            fail_native: true,
            ..Default::default()
        };
        let agg = aggregator(source);

        assert!(matches!(
            agg.top_tippers(5).await,
            Err(AggregationError::Source(_))
        ));
        assert!(matches!(
            agg.recent_tips(5).await,
            Err(AggregationError::Source(_))
        ));
    }

    #[tokio::test]
    async fn token_query_failure_also_aborts() {
        let source = MockSource {
            native: vec![tip_log(addr(0xbb), units(1), "", 5, 0)],
            fail_token: true,
            ..Default::default()
        };
        assert!(aggregator(source).top_tippers(5).await.is_err());
    }

    #[tokio::test]
    async fn repeated_passes_are_identical() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x01), units(3), "", 1, 0),
                tip_log(addr(0x02), units(1), "", 2, 0),
            ],
            token: vec![tip_log(addr(0x03), units(2000), "", 3, 0)],
            ..Default::default()
        };
        let agg = aggregator(source);

        let first = agg.top_tippers(5).await.unwrap();
        let second = agg.top_tippers(5).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ranks_by_combined_value_descending() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x01), units(2), "", 1, 0),
                tip_log(addr(0x02), units(1), "", 2, 0),
            ],
            // 0x02 also tipped 500 tokens = 0.5 native-equivalent → 1.5 total
            token: vec![tip_log(addr(0x02), units(500), "", 3, 0)],
            ..Default::default()
        };

        let ranked = aggregator(source).top_tippers(5).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].address, addr(0x01));
        assert_eq!(ranked[1].address, addr(0x02));
        assert!(ranked[0].ranking_value > ranked[1].ranking_value);
    }

    #[tokio::test]
    async fn equal_values_tie_break_by_address() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x09), units(1), "", 1, 0),
                tip_log(addr(0x01), units(1), "", 2, 0),
            ],
            ..Default::default()
        };

        let ranked = aggregator(source).top_tippers(5).await.unwrap();
        assert_eq!(ranked[0].address, addr(0x01));
        assert_eq!(ranked[1].address, addr(0x09));
    }

    #[tokio::test]
    async fn zero_value_tippers_are_filtered_out() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x01), U256::ZERO, "", 1, 0),
                tip_log(addr(0x02), units(1), "", 2, 0),
            ],
            token: vec![tip_log(addr(0x01), U256::ZERO, "", 3, 0)],
            ..Default::default()
        };

        let ranked = aggregator(source).top_tippers(5).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].address, addr(0x02));
    }

    #[tokio::test]
    async fn truncates_to_requested_size() {
        let native = (1u8..=7)
            .map(|n| tip_log(addr(n), units(n as u64), "", n as u64, 0))
            .collect();
        let source = MockSource {
            native,
            ..Default::default()
        };
        let agg = aggregator(source);

        assert_eq!(agg.top_tippers(5).await.unwrap().len(), 5);
        assert_eq!(agg.top_tippers(10).await.unwrap().len(), 7);
        assert_eq!(agg.top_tippers(0).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn malformed_logs_are_skipped_not_fatal() {
        let mut bad = tip_log(addr(0x05), units(9), "", 4, 0);
        bad.topics.truncate(1);
        let source = MockSource {
            native: vec![bad, tip_log(addr(0x01), units(1), "", 5, 0)],
            ..Default::default()
        };

        let ranked = aggregator(source).top_tippers(5).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].address, addr(0x01));
    }

    #[tokio::test]
    async fn recent_tips_are_block_descending_with_log_index_ties() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x01), units(1), "first", 5, 0),
                tip_log(addr(0x02), units(1), "same block, later log", 9, 1),
            ],
            token: vec![
                tip_log(addr(0x03), units(10), "same block, earlier log", 9, 0),
                tip_log(addr(0x04), units(10), "middle", 7, 0),
            ],
            ..Default::default()
        };

        let recent = aggregator(source).recent_tips(10).await.unwrap();

        let order: Vec<(u64, u64)> = recent
            .iter()
            .map(|t| (t.block_number, t.log_index))
            .collect();
        assert_eq!(order, vec![(9, 1), (9, 0), (7, 0), (5, 0)]);
    }

    #[tokio::test]
    async fn recent_tips_resolve_timestamps_and_truncate() {
        let source = MockSource {
            native: vec![
                tip_log(addr(0x01), units(1), "", 10, 0),
                tip_log(addr(0x02), units(1), "", 20, 0),
                tip_log(addr(0x03), units(1), "", 30, 0),
            ],
            ..Default::default()
        };

        let recent = aggregator(source).recent_tips(2).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].block_number, 30);
        assert_eq!(recent[0].timestamp, Some(360)); // mock: block * 12
        assert_eq!(recent[1].block_number, 20);
        assert_eq!(recent[1].timestamp, Some(240));
    }
}
