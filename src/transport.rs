//! JSON-RPC 2.0 plumbing shared by every gateway.
//!
//! All numeric and address material coming off the wire is normalized here
//! into fixed semantic types (`U256`, `Address`); nothing downstream ever
//! touches raw hex quantities.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
};

use ethers::types::{
    Address,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node returned rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc payload: {0}")]
    Payload(String),
}

/// A JSON-RPC request/response channel to an Ethereum-compatible endpoint.
///
/// Kept deliberately narrow so gateways can be exercised against a scripted
/// fake; see `test_helpers::MockTransport`.
pub trait RpcTransport {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, TransportError>>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            url,
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: RpcResponse = res.json().await?;
        if let Some(err) = payload.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        payload.result.ok_or_else(|| {
            TransportError::Payload("response carried neither result nor error".to_string())
        })
    }
}

/// Decodes a quantity that nodes variously encode as a hex string
/// (`"0x1b4"`), a decimal string (`net_version`), or a bare number.
pub fn decode_quantity(value: &Value) -> Result<U256, TransportError> {
    match value {
        Value::String(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x") {
                U256::from_str_radix(hex_digits, 16)
                    .map_err(|err| TransportError::Payload(format!("bad hex quantity {s:?}: {err}")))
            } else {
                U256::from_dec_str(s).map_err(|err| {
                    TransportError::Payload(format!("bad decimal quantity {s:?}: {err}"))
                })
            }
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| TransportError::Payload(format!("non-integral quantity {n}"))),
        other => Err(TransportError::Payload(format!(
            "expected a quantity, got {other}"
        ))),
    }
}

pub fn decode_u64(value: &Value) -> Result<u64, TransportError> {
    let quantity = decode_quantity(value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(TransportError::Payload(format!(
            "quantity {quantity} exceeds u64 range"
        )));
    }
    Ok(quantity.low_u64())
}

pub fn decode_address(value: &Value) -> Result<Address, TransportError> {
    let s = value
        .as_str()
        .ok_or_else(|| TransportError::Payload(format!("expected an address, got {value}")))?;
    s.parse()
        .map_err(|err| TransportError::Payload(format!("bad address {s:?}: {err}")))
}

pub fn decode_address_list(value: &Value) -> Result<Vec<Address>, TransportError> {
    let entries = value
        .as_array()
        .ok_or_else(|| TransportError::Payload(format!("expected an address list, got {value}")))?;
    entries.iter().map(decode_address).collect()
}

pub fn decode_bytes(value: &Value) -> Result<Vec<u8>, TransportError> {
    let s = value
        .as_str()
        .ok_or_else(|| TransportError::Payload(format!("expected hex bytes, got {value}")))?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|err| TransportError::Payload(format!("bad hex bytes {s:?}: {err}")))
}

/// Wire encoding of a quantity ("0x"-prefixed, no leading zeros).
pub fn to_quantity(value: U256) -> String {
    format!("{value:#x}")
}

/// Wire encoding of calldata bytes.
pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
