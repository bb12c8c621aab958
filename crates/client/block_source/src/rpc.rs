use async_trait::async_trait;
use lp_block::{BlockId, BlockPayload};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::{BlockSourceError, EndpointError};
use crate::BlockSource;

pub const DEFAULT_ENDPOINT: &str = "https://go.getblock.io/";
const REQUEST_ID: &str = "getblock.io";

const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
const METHOD_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: &'a str,
}

/// [`BlockSource`] backed by an Ethereum-style JSON-RPC endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcBlockSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl JsonRpcBlockSource {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Builds the endpoint `<base>/<token>`, the form used by token-authenticated RPC providers.
    pub fn with_token(base: &Url, token: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(endpoint_with_token(base, token)?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, BlockSourceError> {
        let request = JsonRpcRequest { jsonrpc: "2.0", method, params, id: REQUEST_ID };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BlockSourceError::transport(method, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlockSourceError::endpoint(method, EndpointError::Status(status)));
        }

        let body = response.bytes().await.map_err(|e| BlockSourceError::transport(method, e))?;
        let body: Value = serde_json::from_slice(&body).map_err(|e| BlockSourceError::endpoint(method, e))?;

        // Check for JSON-RPC error
        if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
            return Err(BlockSourceError::endpoint(method, EndpointError::Rpc { code, message }));
        }

        Ok(body)
    }
}

/// `<base>/<token>`. A missing trailing slash on `base` is added so its last path segment is kept.
pub fn endpoint_with_token(base: &Url, token: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(token)
}

#[async_trait]
impl BlockSource for JsonRpcBlockSource {
    async fn fetch_tip(&self) -> Result<BlockId, BlockSourceError> {
        let body = self.call(METHOD_BLOCK_NUMBER, json!([])).await?;
        let raw = body
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BlockSourceError::endpoint(METHOD_BLOCK_NUMBER, EndpointError::InvalidTip(body["result"].to_string()))
            })?;

        let tip = raw
            .parse()
            .map_err(|_| BlockSourceError::endpoint(METHOD_BLOCK_NUMBER, EndpointError::InvalidTip(raw.to_string())))?;
        tracing::debug!(tip = %tip, "Fetched chain tip");
        Ok(tip)
    }

    async fn fetch_block(&self, block_id: &BlockId) -> Result<BlockPayload, BlockSourceError> {
        tracing::trace!(block_id = %block_id, method = METHOD_GET_BLOCK_BY_NUMBER, "Sending RPC request");
        self.call(METHOD_GET_BLOCK_BY_NUMBER, json!([block_id, true])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://go.getblock.io/", "https://go.getblock.io/abc123")]
    #[case("https://go.getblock.io", "https://go.getblock.io/abc123")]
    #[case("http://localhost:8545/rpc", "http://localhost:8545/rpc/abc123")]
    fn token_is_appended_as_path_segment(#[case] base: &str, #[case] expected: &str) {
        let source = JsonRpcBlockSource::with_token(&base.parse().unwrap(), "abc123").unwrap();
        assert_eq!(source.endpoint().as_str(), expected);
    }

    #[test]
    fn request_body_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: METHOD_GET_BLOCK_BY_NUMBER,
            params: json!([BlockId::from(100), true]),
            id: REQUEST_ID,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "method": "eth_getBlockByNumber", "params": ["0x64", true], "id": "getblock.io"})
        );
    }
}
