
use assert_matches::assert_matches;
use lp_block::BlockId;
use reqwest::StatusCode;
use serde_json::json;

use crate::{BlockSource, BlockSourceError, EndpointError};
use rpc_mock::RpcMock;

#[tokio::test]
async fn fetch_tip_parses_hex_quantity() {
    let rpc = RpcMock::start().await;
    let mock = rpc.mock_block_number("0x1312d00").await;

    let tip = rpc.client().fetch_tip().await.unwrap();

    assert_eq!(tip, BlockId::from(20_000_000));
    mock.assert_async().await;
}

#[tokio::test]
async fn fetch_tip_rejects_malformed_result() {
    let rpc = RpcMock::start().await;
    rpc.mock_block_number("latest").await;

    assert_matches!(
        rpc.client().fetch_tip().await,
        Err(BlockSourceError::Endpoint { method: "eth_blockNumber", source: EndpointError::InvalidTip(raw) }) if raw == "latest"
    );
}

#[tokio::test]
async fn fetch_block_returns_envelope() {
    let rpc = RpcMock::start().await;
    let transactions = json!([{"from": "0xaaa", "to": "0xbbb", "value": "0x10"}]);
    let mock = rpc.mock_block("0x64", transactions.clone()).await;

    let payload = rpc.client().fetch_block(&BlockId::from(100)).await.unwrap();

    assert_eq!(payload["jsonrpc"], "2.0");
    assert_eq!(payload["result"]["transactions"], transactions);
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_endpoint_error() {
    let rpc = RpcMock::start().await;
    rpc.mock_raw("eth_getBlockByNumber", 503, "{}").await;

    let err = rpc.client().fetch_block(&BlockId::from(1)).await.unwrap_err();

    assert_matches!(
        err,
        BlockSourceError::Endpoint { source: EndpointError::Status(StatusCode::SERVICE_UNAVAILABLE), .. }
    );
    assert_eq!(err.error_type(), "endpoint_error");
}

#[tokio::test]
async fn rpc_error_member_is_surfaced() {
    let rpc = RpcMock::start().await;
    rpc.mock_raw(
        "eth_getBlockByNumber",
        200,
        r#"{"jsonrpc":"2.0","id":"getblock.io","error":{"code":-32005,"message":"limit exceeded"}}"#,
    )
    .await;

    assert_matches!(
        rpc.client().fetch_block(&BlockId::from(1)).await,
        Err(BlockSourceError::Endpoint { source: EndpointError::Rpc { code: -32005, message }, .. })
            if message == "limit exceeded"
    );
}

#[tokio::test]
async fn non_json_body_is_an_endpoint_error() {
    let rpc = RpcMock::start().await;
    rpc.mock_raw("eth_blockNumber", 200, "<html>rate limited</html>").await;

    assert_matches!(
        rpc.client().fetch_tip().await,
        Err(BlockSourceError::Endpoint { source: EndpointError::InvalidBody(_), .. })
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let source = crate::JsonRpcBlockSource::new("http://127.0.0.1:9/".parse().unwrap());

    let err = source.fetch_tip().await.unwrap_err();

    assert_matches!(err, BlockSourceError::Transport { method: "eth_blockNumber", .. });
}
