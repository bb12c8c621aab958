
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use lc_block_source::{BlockSourceError, EndpointError, MockBlockSource};
use lp_block::{parse_block_deltas, BlockId, ReceiverLeg};
use rstest::rstest;
use serde_json::json;
use tracing_test::traced_test;

use crate::{rank, run_scan, Extremes, FailurePolicy, Ledger, PacingPolicy, ScanConfig, ScanError};
use fake_source::{envelope, FakeSource};

const FAILING_BLOCK: u64 = 42;

fn reference_ledger(source: &FakeSource, leg: ReceiverLeg) -> Ledger {
    let mut ledger = Ledger::default();
    for (_, payload) in source.payloads() {
        ledger.merge(parse_block_deltas(payload, leg).unwrap().deltas);
    }
    ledger
}

/// A 100-block chain with one transfer per block, where block [`FAILING_BLOCK`] cannot be fetched.
fn mock_with_failing_block() -> MockBlockSource {
    let mut source = MockBlockSource::new();
    source.expect_fetch_tip().returning(|| Ok(BlockId::from(99)));
    source.expect_fetch_block().returning(|block_id| {
        if *block_id == BlockId::from(FAILING_BLOCK) {
            Err(BlockSourceError::endpoint(
                "eth_getBlockByNumber",
                EndpointError::Rpc { code: -32005, message: "limit exceeded".into() },
            ))
        } else {
            Ok(envelope(block_id, json!([{"from": "0xaaa", "to": "0xbbb", "value": "0x1"}])))
        }
    });
    source
}

#[rstest]
#[case::debit(ReceiverLeg::Debit)]
#[case::credit(ReceiverLeg::Credit)]
#[tokio::test(start_paused = true)]
async fn concurrent_scan_matches_sequential_reference(#[case] receiver_leg: ReceiverLeg) {
    let source = FakeSource::with_random_transactions(100, 1).with_random_delays(2, Duration::from_secs(2));
    let config = ScanConfig { receiver_leg, ..Default::default() };

    let report = run_scan(Arc::new(source.clone()), &config).await.unwrap();

    let reference = reference_ledger(&source, receiver_leg);
    assert_eq!(report.tip, BlockId::from(99));
    assert_eq!(report.blocks_planned, 100);
    assert_eq!(report.blocks_scanned, 100);
    assert_eq!(report.blocks_skipped, 0);
    assert_eq!(report.ranked, rank(&reference));
    assert_eq!(source.calls(), 100);
}

#[tokio::test(start_paused = true)]
async fn repeated_scans_agree() {
    let source = FakeSource::with_random_transactions(100, 3);

    let mut reports = vec![];
    for seed in 0..5 {
        let source = source.clone().with_random_delays(seed, Duration::from_millis(800));
        reports.push(run_scan(Arc::new(source), &ScanConfig::default()).await.unwrap());
    }

    assert!(reports.windows(2).all(|pair| pair[0].ranked == pair[1].ranked && pair[0].extremes == pair[1].extremes));
}

#[tokio::test(start_paused = true)]
async fn default_dispatch_pauses_once() {
    let source = FakeSource::with_empty_blocks(100);

    let start = tokio::time::Instant::now();
    run_scan(Arc::new(source), &ScanConfig::default()).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn disabled_pacing_does_not_pause() {
    let source = FakeSource::with_empty_blocks(100);
    let mut config = ScanConfig::default();
    config.dispatch.pacing = PacingPolicy::disabled();

    let start = tokio::time::Instant::now();
    run_scan(Arc::new(source), &config).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_aborts_scan() {
    let err = run_scan(Arc::new(mock_with_failing_block()), &ScanConfig::default()).await.unwrap_err();

    assert_matches!(
        err,
        ScanError::Fetch { block_id, source: BlockSourceError::Endpoint { .. } } if block_id == BlockId::from(FAILING_BLOCK)
    );
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_is_skipped_when_allowed() {
    let config = ScanConfig { failure_policy: FailurePolicy::SkipFailedBlocks, ..Default::default() };

    let report = run_scan(Arc::new(mock_with_failing_block()), &config).await.unwrap();

    assert_eq!(report.blocks_scanned, 99);
    assert_eq!(report.blocks_skipped, 1);
    assert_eq!(report.transfers, 99);
    // Both legs debit under the default convention, so 0xaaa and 0xbbb tie at -99.
    assert_matches!(
        report.extremes,
        Extremes::Tied { min, max } if min.address == "0xbbb" && max.address == "0xaaa"
    );
}

#[tokio::test]
async fn tip_failure_is_reported() {
    let mut source = MockBlockSource::new();
    source.expect_fetch_tip().returning(|| {
        Err(BlockSourceError::endpoint("eth_blockNumber", EndpointError::InvalidTip("latest".into())))
    });
    source.expect_fetch_block().never();

    assert_matches!(run_scan(Arc::new(source), &ScanConfig::default()).await, Err(ScanError::Tip(_)));
}

#[tokio::test]
#[traced_test]
async fn malformed_block_is_skipped() {
    let mut source = MockBlockSource::new();
    source.expect_fetch_tip().returning(|| Ok(BlockId::from(2)));
    source.expect_fetch_block().returning(|block_id| {
        if *block_id == BlockId::from(1) {
            Ok(json!({"jsonrpc": "2.0", "id": "getblock.io", "result": null}))
        } else {
            Ok(envelope(block_id, json!([{"from": "0xaaa", "to": "0xbbb", "value": "0x10"}])))
        }
    });
    let config = ScanConfig {
        window_size: NonZeroUsize::new(3).unwrap(),
        receiver_leg: ReceiverLeg::Credit,
        ..Default::default()
    };

    let report = run_scan(Arc::new(source), &config).await.unwrap();

    assert_eq!(report.blocks_scanned, 2);
    assert_eq!(report.blocks_skipped, 1);
    assert_matches!(report.extremes, Extremes::Tied { min, max } if min.address == "0xaaa" && max.address == "0xbbb");
    assert!(logs_contain("Unusable block payload"));
}

#[tokio::test]
async fn window_is_truncated_at_genesis() {
    let source = FakeSource::with_random_transactions(3, 4);

    let report = run_scan(Arc::new(source), &ScanConfig::default()).await.unwrap();

    assert_eq!(report.tip, BlockId::from(2));
    assert_eq!(report.blocks_planned, 3);
    assert_eq!(report.blocks_scanned, 3);
}

#[tokio::test]
async fn window_without_transfers_has_no_extremes() {
    let source = FakeSource::with_empty_blocks(10);

    let report = run_scan(Arc::new(source), &ScanConfig::default()).await.unwrap();

    assert!(report.ranked.is_empty());
    assert_eq!(report.extremes, Extremes::Empty);
}
