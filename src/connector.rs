//! Provider selection and connection lifecycle.

use std::fmt;

use ethers::types::U256;
use futures::join;
use serde_json::{
    Value,
    json,
};
use tokio::sync::mpsc;
use tracing::{
    info,
    warn,
};

use crate::{
    error::Error,
    transport::{
        RpcTransport,
        TransportError,
        decode_quantity,
        decode_u64,
    },
};

pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
    /// Wallet-supplied endpoint; accounts are unlocked through the wallet's
    /// own access-request handshake.
    Injected,
    /// Configured local node reached directly over HTTP.
    LocalNode,
    /// No provider could be verified; all queries degrade.
    None,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderKind::Injected => "injected",
            ProviderKind::LocalNode => "local-node",
            ProviderKind::None => "none",
        };
        write!(f, "{label}")
    }
}

/// An established (or deliberately absent) link to a node.
///
/// Connections are replaced wholesale on every initialize/reset; no field is
/// ever mutated in place, so a reader holding a borrow always sees a
/// consistent connection.
#[derive(Clone, Debug)]
pub struct Connection<T> {
    kind: ProviderKind,
    transport: Option<T>,
}

impl<T> Connection<T> {
    fn disconnected() -> Self {
        Self {
            kind: ProviderKind::None,
            transport: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn is_established(&self) -> bool {
        self.transport.is_some()
    }

    pub fn transport(&self) -> Result<&T, Error> {
        self.transport.as_ref().ok_or(Error::Connection)
    }
}

/// Candidate transports, in the priority order `initialize` tries them.
#[derive(Clone, Debug)]
pub struct ProviderSources<T> {
    pub injected: Option<T>,
    pub local_node: Option<T>,
}

impl<T> ProviderSources<T> {
    pub fn local_only(local_node: T) -> Self {
        Self {
            injected: None,
            local_node: Some(local_node),
        }
    }

    pub fn none() -> Self {
        Self {
            injected: None,
            local_node: None,
        }
    }
}

/// Signals an injected provider emits when the user switches account or
/// network. On either signal the application discards everything and
/// re-initializes; there is no incremental reconciliation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainSignal {
    AccountsChanged,
    NetworkChanged,
}

/// Channel an embedder forwards wallet change notifications into. The
/// receiving side must treat every signal as "reload from scratch": rebuilt
/// connection, re-listed accounts, re-bound contract.
pub fn change_feed(capacity: usize) -> (mpsc::Sender<ChainSignal>, mpsc::Receiver<ChainSignal>) {
    mpsc::channel(capacity)
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NetworkInfo {
    pub network_id: U256,
    pub chain_id: U256,
    pub block_number: U256,
    pub gas_price: U256,
}

/// Owns the current [`Connection`] and the fallback policy that builds it.
pub struct ChainConnector<T> {
    sources: ProviderSources<T>,
    connection: Connection<T>,
}

impl<T: RpcTransport + Clone> ChainConnector<T> {
    pub fn new(sources: ProviderSources<T>) -> Self {
        Self {
            sources,
            connection: Connection::disconnected(),
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    /// Attempts each candidate provider in strict priority order: injected,
    /// then local node, then a disconnected placeholder. Verification
    /// failures are logged and swallowed; this never errors.
    pub async fn initialize(&mut self) -> &Connection<T> {
        let connection = Self::select_provider(&self.sources).await;
        // Single wholesale assignment: the old connection is discarded as a
        // unit, never patched field-by-field.
        self.connection = connection;
        info!(provider = %self.connection.kind(), "chain connection initialized");
        &self.connection
    }

    /// Discards the current connection and re-runs the full fallback chain.
    /// Used after an account or network change signal, which invalidates all
    /// previously bound state.
    pub async fn reset(&mut self) -> &Connection<T> {
        self.connection = Connection::disconnected();
        self.initialize().await
    }

    /// Lightweight liveness probe. Any transport failure reads as "not
    /// connected" rather than propagating.
    pub async fn is_connected(&self) -> bool {
        match self.connection.transport() {
            Ok(transport) => transport.request("eth_blockNumber", json!([])).await.is_ok(),
            Err(_) => false,
        }
    }

    pub async fn network_info(&self) -> Result<NetworkInfo, Error> {
        let transport = self.connection.transport()?;
        let (network_id, chain_id, block_number, gas_price) = join!(
            transport.request("net_version", json!([])),
            transport.request("eth_chainId", json!([])),
            transport.request("eth_blockNumber", json!([])),
            transport.request("eth_gasPrice", json!([])),
        );
        Ok(NetworkInfo {
            network_id: quantity(network_id)?,
            chain_id: quantity(chain_id)?,
            block_number: quantity(block_number)?,
            gas_price: quantity(gas_price)?,
        })
    }

    async fn select_provider(sources: &ProviderSources<T>) -> Connection<T> {
        if let Some(injected) = &sources.injected {
            match Self::verify_injected(injected).await {
                Ok(block) => {
                    info!(block, "injected provider verified");
                    return Connection {
                        kind: ProviderKind::Injected,
                        transport: Some(injected.clone()),
                    };
                }
                Err(err) => warn!(%err, "injected provider unusable, falling back"),
            }
        }
        if let Some(node) = &sources.local_node {
            match Self::verify_node(node).await {
                Ok(block) => {
                    info!(block, "local node verified");
                    return Connection {
                        kind: ProviderKind::LocalNode,
                        transport: Some(node.clone()),
                    };
                }
                Err(err) => warn!(%err, "local node unreachable"),
            }
        }
        warn!("no usable provider, continuing disconnected");
        Connection::disconnected()
    }

    /// Injected providers gate accounts behind an explicit access request;
    /// the block-number read then proves the session actually works.
    async fn verify_injected(transport: &T) -> Result<u64, TransportError> {
        transport.request("eth_requestAccounts", json!([])).await?;
        let block = transport.request("eth_blockNumber", json!([])).await?;
        decode_u64(&block)
    }

    async fn verify_node(transport: &T) -> Result<u64, TransportError> {
        let block = transport.request("eth_blockNumber", json!([])).await?;
        decode_u64(&block)
    }
}

fn quantity(result: Result<Value, TransportError>) -> Result<U256, Error> {
    let value = result.map_err(|err| {
        warn!(%err, "network metadata query failed");
        Error::Connection
    })?;
    decode_quantity(&value).map_err(|err| {
        warn!(%err, "malformed network metadata quantity");
        Error::Connection
    })
}
