//! JSON-RPC ledger bridge.
//!
//! Speaks to a ledger node (or a signing bridge in front of one) over HTTP
//! JSON-RPC 2.0:
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `ledger_call` | `[contract, method, args]` | raw value |
//! | `ledger_sendTransaction` | `[{contract, from, method, args, value}]` | `0x` tx hash |
//! | `ledger_waitForReceipt` | `[txHash]` | receipt, or `null` while pending |
//! | `ledger_deploy` | `[from]` | contract address |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::domain::{Address, FundingError, TxHash};
use crate::gateway::decode;
use crate::ports::{LedgerTransport, TransactionRequest};

/// Error code the bridge uses when no contract lives at the address.
pub const UNKNOWN_CONTRACT_CODE: i32 = -32004;

/// Interval between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// HTTP JSON-RPC ledger transport.
pub struct JsonRpcLedger {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, FundingError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| FundingError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, FundingError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        trace!("[cf-rpc] -> {} {}", method, request.params);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    FundingError::Unreachable(format!("Cannot connect to {}", self.url))
                } else {
                    FundingError::Unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(FundingError::Unreachable(format!(
                "{} answered HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| FundingError::corrupt(format!("unparseable RPC response: {}", e)))?;

        if let Some(error) = body.error {
            debug!("[cf-rpc] {} failed: {} {}", method, error.code, error.message);
            return Err(if error.code == UNKNOWN_CONTRACT_CODE {
                FundingError::StaleConfiguration(error.message)
            } else {
                FundingError::Rejected(error.message)
            });
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl LedgerTransport for JsonRpcLedger {
    async fn call(
        &self,
        contract: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, FundingError> {
        self.rpc("ledger_call", json!([contract, method, args])).await
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, FundingError> {
        let params = json!([{
            "contract": tx.contract,
            "from": tx.from.to_string(),
            "method": tx.method,
            "args": tx.args,
            "value": tx.value.to_string(),
        }]);
        let hash = self.rpc("ledger_sendTransaction", params).await?;
        decode::tx_hash(&hash, "txHash")
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Value, FundingError> {
        let hash = format!("0x{}", hex::encode(tx_hash));
        // Polls until a receipt shows up; the caller bounds the wait.
        loop {
            match self.rpc("ledger_waitForReceipt", json!([hash])).await {
                Ok(receipt) if !receipt.is_null() => return Ok(receipt),
                Ok(_) => {}
                Err(FundingError::Unreachable(reason)) => {
                    debug!("[cf-rpc] Receipt poll for {} failed, polling on: {}", hash, reason);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn deploy(&self, from: Address) -> Result<String, FundingError> {
        let address = self.rpc("ledger_deploy", json!([from.to_string()])).await?;
        let address = decode::address(&address, "contract")?;
        Ok(address.to_string())
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// One scripted answer from the stub node.
    enum Reply {
        Result(Value),
        RpcError(i32, &'static str),
        Http(u16, &'static str),
        Hangup,
    }

    async fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return buf;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return buf.split_off(end + 4);
                }
            }
        }
    }

    /// Serve `replies` in order, one connection each. Returns the URL and the
    /// JSON-RPC method of every request seen.
    async fn stub_node(replies: Vec<Reply>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_request(&mut stream).await;
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let method = request["method"].as_str().unwrap_or_default().to_string();
                log.lock().push(method);

                let (status, content_type, payload) = match reply {
                    Reply::Result(result) => (
                        200,
                        "application/json",
                        json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
                            .to_string(),
                    ),
                    Reply::RpcError(code, message) => (
                        200,
                        "application/json",
                        json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "error": {"code": code, "message": message}
                        })
                        .to_string(),
                    ),
                    Reply::Http(status, html) => (status, "text/html", html.to_string()),
                    Reply::Hangup => continue,
                };
                let head = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: {}\r\ncontent-length: {}\r\n",
                    status,
                    content_type,
                    payload.len()
                );
                stream.write_all(head.as_bytes()).await.unwrap();
                stream.write_all(b"connection: close\r\n\r\n").await.unwrap();
                stream.write_all(payload.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (url, seen)
    }

    fn ledger(url: &str) -> JsonRpcLedger {
        JsonRpcLedger::new(url, Duration::from_secs(2)).unwrap()
    }

    fn receipt_for(hash: &TxHash) -> Value {
        json!({
            "txHash": format!("0x{}", hex::encode(hash)),
            "status": "success",
            "blockNumber": 12
        })
    }

    #[test]
    fn test_request_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "ledger_call",
            params: json!(["0xabc", "getProjects", []]),
            id: 7,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["params"][1], "getProjects");
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_null_result_is_kept() {
        let body: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(body.result.is_none());
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let ledger = JsonRpcLedger::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = ledger.call("0xabc", "getProjects", vec![]).await.unwrap_err();
        assert!(matches!(err, FundingError::Unreachable(_)));
        assert_eq!(ledger.endpoint(), "http://127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_unknown_contract_is_stale_configuration() {
        let (url, seen) = stub_node(vec![Reply::RpcError(
            UNKNOWN_CONTRACT_CODE,
            "no contract at 0xabc",
        )])
        .await;
        let err = ledger(&url)
            .call("0xabc", "getProjects", vec![])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FundingError::StaleConfiguration("no contract at 0xabc".to_string())
        );
        assert_eq!(*seen.lock(), vec!["ledger_call".to_string()]);
    }

    #[tokio::test]
    async fn test_other_rpc_error_is_rejected() {
        let (url, _) = stub_node(vec![Reply::RpcError(-32000, "execution reverted")]).await;
        let tx = TransactionRequest {
            contract: "0xabc".to_string(),
            from: Address([0x11; 20]),
            method: "donate".to_string(),
            args: vec![json!(0), json!(0)],
            value: 5u64.into(),
        };
        let err = ledger(&url).submit(tx).await.unwrap_err();
        assert_eq!(err, FundingError::Rejected("execution reverted".to_string()));
    }

    #[tokio::test]
    async fn test_pending_receipt_is_polled_until_present() {
        let hash = [0x5a; 32];
        let (url, seen) = stub_node(vec![
            Reply::Result(Value::Null),
            Reply::Result(receipt_for(&hash)),
        ])
        .await;
        let receipt = ledger(&url).wait_for_receipt(hash).await.unwrap();
        assert_eq!(receipt["blockNumber"], 12);
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_poll_rides_out_transport_blips() {
        let hash = [0x5b; 32];
        let (url, seen) = stub_node(vec![
            Reply::Hangup,
            Reply::Http(503, "<html>Service Unavailable</html>"),
            Reply::Result(receipt_for(&hash)),
        ])
        .await;
        let receipt = ledger(&url).wait_for_receipt(hash).await.unwrap();
        assert_eq!(receipt["status"], "success");
        assert_eq!(seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_receipt_poll_stops_on_rpc_error() {
        let (url, _) = stub_node(vec![Reply::RpcError(-32000, "unknown transaction")]).await;
        let err = ledger(&url).wait_for_receipt([0x5c; 32]).await.unwrap_err();
        assert!(matches!(err, FundingError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_proxy_error_page_is_unreachable() {
        let (url, _) = stub_node(vec![Reply::Http(503, "<html>Bad gateway</html>")]).await;
        let err = ledger(&url)
            .call("0xabc", "getProjects", vec![])
            .await
            .unwrap_err();
        match &err {
            FundingError::Unreachable(reason) => assert!(reason.contains("503")),
            other => panic!("expected unreachable, got {:?}", other),
        }
        assert!(err.is_retryable());
    }
}
