//! JSON-RPC over HTTP backend.
//!
//! Talks to a contract gateway that accepts `POST {base_url}/rpc` with a
//! [`LedgerRequest`] body and replies with an [`RpcEnvelope`]. Balance
//! queries go to the same endpoint with method `balance_of`.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use seedfall_types::{LedgerOp, PlayerId};

use crate::LedgerError;
use crate::protocol::{LedgerRequest, LedgerResponse, RpcEnvelope};

/// Ledger backend reaching the contract through an HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct BalanceReply {
    ok: bool,
    #[serde(default)]
    balance: Option<u64>,
    #[serde(default)]
    error: Option<crate::protocol::WireError>,
}

impl HttpLedger {
    /// Create a backend for the gateway at `base_url`.
    ///
    /// Every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport {
                op: LedgerOp::StartGame,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/rpc", base_url.trim_end_matches('/')),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// The full RPC endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a contract call through the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Timeout`] or [`LedgerError::Transport`] for
    /// network failures, and the mapped contract error for rejections.
    pub async fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, LedgerError> {
        let op = request.op();
        debug!(op = %op, endpoint = %self.endpoint, "sending ledger request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(op, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            warn!(op = %op, %status, "ledger gateway returned an error status");
            return Err(LedgerError::Transport {
                op,
                message: format!("gateway returned {status}: {body}"),
            });
        }

        let envelope: RpcEnvelope =
            response
                .json()
                .await
                .map_err(|e| LedgerError::UnexpectedResponse {
                    op,
                    detail: format!("reply is not a JSON-RPC envelope: {e}"),
                })?;

        envelope.into_result(request)
    }

    /// Seeds credited to `player` on the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Query`] if the query fails for any reason.
    pub async fn balance_of(&self, player: PlayerId) -> Result<u64, LedgerError> {
        let body = serde_json::json!({
            "method": "balance_of",
            "params": { "player": player },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Query {
                message: format!("balance_of request failed: {e}"),
            })?;

        let reply: BalanceReply = response.json().await.map_err(|e| LedgerError::Query {
            message: format!("balance_of reply parse failed: {e}"),
        })?;

        match reply {
            BalanceReply {
                ok: true,
                balance: Some(balance),
                ..
            } => Ok(balance),
            BalanceReply { error: Some(wire), .. } => Err(LedgerError::Query {
                message: format!("[{}] {}", wire.code, wire.message),
            }),
            BalanceReply { .. } => Err(LedgerError::Query {
                message: "balance_of reply carried neither balance nor error".to_owned(),
            }),
        }
    }

    fn transport_error(&self, op: LedgerOp, error: &reqwest::Error) -> LedgerError {
        if error.is_timeout() {
            LedgerError::Timeout {
                op,
                timeout_ms: self.timeout_ms,
            }
        } else {
            LedgerError::Transport {
                op,
                message: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_rpc_path() {
        let ledger = HttpLedger::new("http://localhost:8545/", Duration::from_secs(2)).unwrap();
        assert_eq!(ledger.endpoint(), "http://localhost:8545/rpc");
    }

    /// Serve one canned JSON reply on a local port and return the base URL.
    async fn one_shot_gateway(reply: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Read the whole request so closing the socket does not reset it.
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(buf.get(..n).unwrap());
                let text = String::from_utf8_lossy(&request);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
                reply.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn gateway_reply_is_decoded() {
        let url = one_shot_gateway(
            r#"{"ok": true, "result": {"kind": "fruit_dropped", "drop_count": 4, "claim_drops_left": 2}}"#,
        )
        .await;
        let ledger = HttpLedger::new(&url, Duration::from_secs(5)).unwrap();
        let response = ledger
            .execute(&LedgerRequest::DropFruit {
                session: seedfall_types::RemoteSessionId(7),
                entropy: 11,
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            LedgerResponse::FruitDropped {
                drop_count: 4,
                claim_drops_left: Some(2),
            }
        );
    }

    #[tokio::test]
    async fn gateway_rejection_maps_to_no_drops_remaining() {
        let url = one_shot_gateway(
            r#"{"ok": false, "error": {"code": "NO_DROPS_REMAINING", "message": "no drops remaining"}}"#,
        )
        .await;
        let ledger = HttpLedger::new(&url, Duration::from_secs(5)).unwrap();
        let err = ledger
            .execute(&LedgerRequest::DropFruit {
                session: seedfall_types::RemoteSessionId(7),
                entropy: 11,
            })
            .await
            .unwrap_err();
        assert!(err.is_no_drops_remaining());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to speak HTTP.
        let ledger = HttpLedger::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = ledger
            .execute(&LedgerRequest::StartGame {
                player: PlayerId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transport { .. } | LedgerError::Timeout { .. }
        ));
    }
}
