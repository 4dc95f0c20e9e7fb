//! Scripted transport fake for exercising the gateways without a node.

use std::sync::{
    Arc,
    Mutex,
};

use ethers::{
    abi::{
        self,
        Token,
    },
    types::{
        Address,
        U256,
    },
};
use serde_json::{
    Value,
    json,
};

use crate::transport::{
    RpcTransport,
    TransportError,
    to_hex_data,
    to_quantity,
};

#[derive(Debug)]
struct Rule {
    method: String,
    /// Matched against the serialized params; `None` matches any params.
    needle: Option<String>,
    response: Result<Value, String>,
    once: bool,
}

#[derive(Debug, Default)]
struct MockInner {
    rules: Vec<Rule>,
    calls: Vec<(String, Value)>,
    offline: Option<String>,
}

/// Rule-based JSON-RPC fake. Rules are matched in insertion order; the
/// shared call log supports the zero-network-call assertions the write-path
/// preconditions demand.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails as if the endpoint were unreachable.
    pub fn unreachable(message: &str) -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().offline = Some(message.to_string());
        mock
    }

    pub fn respond(&self, method: &str, response: Value) {
        self.push_rule(method, None, Ok(response), false);
    }

    pub fn respond_once(&self, method: &str, response: Value) {
        self.push_rule(method, None, Ok(response), true);
    }

    /// Responds only when the serialized params contain `needle`; used to
    /// key balance responses by address and `eth_call` responses by
    /// function selector.
    pub fn respond_when(&self, method: &str, needle: &str, response: Value) {
        self.push_rule(method, Some(needle.to_string()), Ok(response), false);
    }

    pub fn fail(&self, method: &str, message: &str) {
        self.push_rule(method, None, Err(message.to_string()), false);
    }

    pub fn fail_once(&self, method: &str, message: &str) {
        self.push_rule(method, None, Err(message.to_string()), true);
    }

    pub fn fail_when(&self, method: &str, needle: &str, message: &str) {
        self.push_rule(
            method,
            Some(needle.to_string()),
            Err(message.to_string()),
            false,
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    fn push_rule(
        &self,
        method: &str,
        needle: Option<String>,
        response: Result<Value, String>,
        once: bool,
    ) {
        self.inner.lock().unwrap().rules.push(Rule {
            method: method.to_string(),
            needle,
            response,
            once,
        });
    }
}

impl RpcTransport for MockTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((method.to_string(), params.clone()));
        if let Some(message) = &inner.offline {
            return Err(TransportError::Rpc {
                code: -32000,
                message: message.clone(),
            });
        }
        let rendered = params.to_string();
        let position = inner.rules.iter().position(|rule| {
            rule.method == method
                && rule
                    .needle
                    .as_ref()
                    .is_none_or(|needle| rendered.contains(needle.as_str()))
        });
        let Some(position) = position else {
            return Err(TransportError::Rpc {
                code: -32601,
                message: format!("no scripted response for {method}"),
            });
        };
        let response = if inner.rules[position].once {
            inner.rules.remove(position).response
        } else {
            inner.rules[position].response.clone()
        };
        response.map_err(|message| TransportError::Rpc {
            code: -32000,
            message,
        })
    }
}

/// Hex-quantity JSON value, as a node would return it.
pub fn quantity(value: U256) -> Value {
    json!(to_quantity(value))
}

pub fn quantity_u64(value: u64) -> Value {
    quantity(U256::from(value))
}

/// ABI-encoded `eth_call` result holding a single address.
pub fn encoded_address(address: Address) -> Value {
    json!(to_hex_data(&abi::encode(&[Token::Address(address)])))
}

/// ABI-encoded `eth_call` result holding a single uint256.
pub fn encoded_uint(value: U256) -> Value {
    json!(to_hex_data(&abi::encode(&[Token::Uint(value)])))
}

/// The "0x"-prefixed four-byte selector of a lottery ABI function, for use
/// as a `respond_when` needle on `eth_call`.
pub fn selector(function: &str) -> String {
    let abi = crate::contract::ContractGateway::lottery_abi();
    let signature = abi
        .function(function)
        .expect("function exists in the lottery ABI")
        .short_signature();
    to_hex_data(&signature)
}

/// Serialized form of an address as it appears in request params, for use
/// as a `respond_when` needle.
pub fn address_needle(address: Address) -> String {
    format!("{address:?}")
}
