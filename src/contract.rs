//! Lottery contract binding: code-presence verification, typed reads, and
//! the single state-changing enrollment call.

use ethers::{
    abi::{
        Abi,
        Token,
    },
    types::{
        Address,
        U256,
    },
    utils::parse_ether,
};
use serde_json::json;
use tracing::warn;

use crate::{
    connector::Connection,
    error::Error,
    transport::{
        RpcTransport,
        TransportError,
        decode_bytes,
        to_hex_data,
        to_quantity,
    },
};

/// Interface descriptor for the deployed lottery contract.
pub const LOTTERY_ABI: &str = include_str!("abi/lottery.json");

/// Fixed legacy gas parameters; nothing is negotiated per call.
const ENROLL_GAS_LIMIT: u64 = 3_000_000;
const ENROLL_GAS_PRICE_WEI: u64 = 20_000_000_000;

const MIN_STAKE_ETHER: u64 = 1;
const MAX_STAKE_ETHER: u64 = 1000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BindingState {
    Available,
    /// No deployed code was found (or the probe itself failed). Permanent
    /// for this binding: every later call fails fast without touching the
    /// network.
    Unavailable,
}

/// A contract address paired with its ABI, verified against a connection at
/// bind time.
pub struct ContractGateway {
    address: Address,
    abi: Abi,
    state: BindingState,
}

impl ContractGateway {
    /// The embedded lottery interface. Parsing a compile-time constant; a
    /// failure here is a programming error, not a runtime condition.
    pub fn lottery_abi() -> Abi {
        serde_json::from_str(LOTTERY_ABI).expect("embedded lottery ABI parses")
    }

    /// Binds `address` + `abi` against the given connection, probing for
    /// deployed code. A binding that comes up unavailable stays unavailable;
    /// recovery happens by building a fresh gateway on the next full
    /// initialization.
    pub async fn bind<T: RpcTransport>(
        connection: &Connection<T>,
        address: Address,
        abi: Abi,
    ) -> Self {
        let state = match Self::probe_code(connection, address).await {
            Ok(true) => BindingState::Available,
            Ok(false) => {
                warn!(contract = ?address, "no deployed code at contract address");
                BindingState::Unavailable
            }
            Err(err) => {
                warn!(contract = ?address, %err, "code probe failed, marking binding unavailable");
                BindingState::Unavailable
            }
        };
        Self {
            address,
            abi,
            state,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_available(&self) -> bool {
        self.state == BindingState::Available
    }

    pub async fn owner<T: RpcTransport>(&self, connection: &Connection<T>) -> Result<Address, Error> {
        match self.read(connection, "owner").await? {
            Token::Address(owner) => Ok(owner),
            other => Err(Error::Contract(format!(
                "owner() returned unexpected token {other:?}"
            ))),
        }
    }

    pub async fn participant_count<T: RpcTransport>(
        &self,
        connection: &Connection<T>,
    ) -> Result<U256, Error> {
        self.read_uint(connection, "getNumberOfParticipants").await
    }

    /// Current prize pool, in base units.
    pub async fn jackpot<T: RpcTransport>(&self, connection: &Connection<T>) -> Result<U256, Error> {
        self.read_uint(connection, "getJackPot").await
    }

    /// Validates a display-unit stake string and converts it to base units.
    /// Rejects anything that is not a finite positive amount within the
    /// 1..=1000 ether sanity bounds. Purely local; no network traffic.
    pub fn validate_stake(stake: &str) -> Result<U256, Error> {
        let invalid = || Error::InvalidStake {
            given: stake.to_string(),
        };
        let wei = parse_ether(stake.trim()).map_err(|_| invalid())?;
        let min = U256::exp10(18) * MIN_STAKE_ETHER;
        let max = U256::exp10(18) * MAX_STAKE_ETHER;
        if wei < min || wei > max {
            return Err(invalid());
        }
        Ok(wei)
    }

    /// Submits one enrollment transaction with the given participant name
    /// and stake (display units), paid from `from`.
    ///
    /// Preconditions are checked before any network call; a rejected
    /// submission is classified but never retried, since the stake may
    /// already have been partially consumed as gas.
    pub async fn enroll<T: RpcTransport>(
        &self,
        connection: &Connection<T>,
        name: &str,
        from: Address,
        stake: &str,
    ) -> Result<(), Error> {
        if name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        let value = Self::validate_stake(stake)?;
        if self.state == BindingState::Unavailable {
            return Err(Error::ContractUnavailable);
        }
        let transport = connection.transport()?;
        let data = self.encode_call("enroleInLottery", &[Token::String(name.to_string())])?;
        let tx = json!([{
            "from": from,
            "to": self.address,
            "value": to_quantity(value),
            "gas": to_quantity(U256::from(ENROLL_GAS_LIMIT)),
            "gasPrice": to_quantity(U256::from(ENROLL_GAS_PRICE_WEI)),
            "data": data,
        }]);
        transport
            .request("eth_sendTransaction", tx)
            .await
            .map_err(classify_submit_failure)?;
        Ok(())
    }

    async fn read<T: RpcTransport>(
        &self,
        connection: &Connection<T>,
        function: &str,
    ) -> Result<Token, Error> {
        if self.state == BindingState::Unavailable {
            return Err(Error::ContractUnavailable);
        }
        let transport = connection.transport()?;
        let data = self.encode_call(function, &[])?;
        let params = json!([{ "to": self.address, "data": data }, "latest"]);
        let raw = transport
            .request("eth_call", params)
            .await
            .map_err(|err| Error::Contract(format!("{function}() call failed: {err}")))?;
        let bytes = decode_bytes(&raw)
            .map_err(|err| Error::Contract(format!("{function}() returned bad payload: {err}")))?;
        let mut tokens = self
            .abi
            .function(function)
            .map_err(|err| Error::Contract(err.to_string()))?
            .decode_output(&bytes)
            .map_err(|err| Error::Contract(format!("{function}() output undecodable: {err}")))?;
        tokens
            .pop()
            .ok_or_else(|| Error::Contract(format!("{function}() returned nothing")))
    }

    async fn read_uint<T: RpcTransport>(
        &self,
        connection: &Connection<T>,
        function: &str,
    ) -> Result<U256, Error> {
        match self.read(connection, function).await? {
            Token::Uint(value) => Ok(value),
            other => Err(Error::Contract(format!(
                "{function}() returned unexpected token {other:?}"
            ))),
        }
    }

    fn encode_call(&self, function: &str, args: &[Token]) -> Result<String, Error> {
        let data = self
            .abi
            .function(function)
            .map_err(|err| Error::Contract(err.to_string()))?
            .encode_input(args)
            .map_err(|err| Error::Contract(err.to_string()))?;
        Ok(to_hex_data(&data))
    }

    async fn probe_code<T: RpcTransport>(
        connection: &Connection<T>,
        address: Address,
    ) -> Result<bool, Error> {
        let transport = connection.transport()?;
        let code = transport
            .request("eth_getCode", json!([address, "latest"]))
            .await
            .map_err(|err| Error::Contract(err.to_string()))?;
        Ok(code
            .as_str()
            .map(|s| !s.is_empty() && s != "0x")
            .unwrap_or(false))
    }
}

/// Best-effort classification of a rejected submission. The transport gives
/// no structured error code, so this pattern-matches the message wording;
/// anything unrecognized lands in the generic contract error.
fn classify_submit_failure(err: TransportError) -> Error {
    let detail = err.to_string();
    let message = detail.to_lowercase();
    if message.contains("insufficient funds") {
        Error::InsufficientFunds(detail)
    } else if message.contains("denied") || message.contains("rejected") {
        Error::UserRejected(detail)
    } else if message.contains("gas") {
        Error::Gas(detail)
    } else {
        Error::Contract(detail)
    }
}
