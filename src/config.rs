//! Startup configuration: environment variables overlaid by CLI flags,
//! read once. No hot-reload.

use std::env;

use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::Address;
use url::Url;

use crate::{
    connector::{
        DEFAULT_LOCAL_RPC_URL,
        ProviderSources,
    },
    transport::HttpTransport,
};

pub const ENV_CONTRACT_ADDRESS: &str = "LOTTERY_ADDRESS";
pub const ENV_RPC_URL: &str = "LOTTERY_RPC_URL";
pub const ENV_WALLET_URL: &str = "LOTTERY_WALLET_URL";
pub const ENV_NETWORK_ID: &str = "LOTTERY_NETWORK_ID";
pub const ENV_DEBUG: &str = "LOTTERY_DEBUG";

/// Values passed on the command line; anything absent falls back to the
/// environment, then to defaults.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub contract_address: Option<String>,
    pub rpc_url: Option<String>,
    pub wallet_url: Option<String>,
    pub network_id: Option<u64>,
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub contract_address: Address,
    pub rpc_url: Url,
    /// Wallet-bridge endpoint treated as the injected provider, when one is
    /// advertised to the process.
    pub wallet_url: Option<Url>,
    pub network_id: Option<u64>,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(ConfigOverrides::default())
    }

    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let raw_address = overrides
            .contract_address
            .or_else(|| env::var(ENV_CONTRACT_ADDRESS).ok())
            .ok_or_else(|| {
                eyre!("contract address missing: pass --contract or set {ENV_CONTRACT_ADDRESS}")
            })?;
        let contract_address = raw_address
            .parse()
            .map_err(|err| eyre!("bad contract address {raw_address:?}: {err}"))?;

        let raw_rpc = overrides
            .rpc_url
            .or_else(|| env::var(ENV_RPC_URL).ok())
            .unwrap_or_else(|| DEFAULT_LOCAL_RPC_URL.to_string());
        let rpc_url = Url::parse(&raw_rpc).wrap_err_with(|| format!("bad RPC URL {raw_rpc:?}"))?;

        let wallet_url = overrides
            .wallet_url
            .or_else(|| env::var(ENV_WALLET_URL).ok())
            .map(|raw| Url::parse(&raw).wrap_err_with(|| format!("bad wallet URL {raw:?}")))
            .transpose()?;

        let network_id = overrides
            .network_id
            .or_else(|| env::var(ENV_NETWORK_ID).ok().and_then(|v| v.parse().ok()));

        let debug = overrides.debug
            || matches!(
                env::var(ENV_DEBUG).ok().as_deref(),
                Some("1") | Some("true")
            );

        Ok(Self {
            contract_address,
            rpc_url,
            wallet_url,
            network_id,
            debug,
        })
    }

    /// Builds the transport candidates the connector will try, in order.
    pub fn provider_sources(&self) -> Result<ProviderSources<HttpTransport>> {
        let injected = self
            .wallet_url
            .as_ref()
            .map(|url| HttpTransport::new(url.as_str()))
            .transpose()?;
        let local_node = Some(HttpTransport::new(self.rpc_url.as_str())?);
        Ok(ProviderSources {
            injected,
            local_node,
        })
    }
}
