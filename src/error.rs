use crate::transport::TransportError;
use thiserror::Error;

/// Failures surfaced by the connectivity and aggregation layer.
///
/// Read-path variants are absorbed into the view model by the facade; only
/// write-path and precondition variants are expected to reach callers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no usable provider connection")]
    Connection,

    #[error("wallet exposes no accounts")]
    WalletUnavailable,

    #[error("balance query failed: {0}")]
    AccountQuery(#[source] TransportError),

    #[error("no deployed contract code at the configured address")]
    ContractUnavailable,

    #[error("stake must be a positive amount between 1 and 1000 ether, got {given:?}")]
    InvalidStake { given: String },

    #[error("participant name must not be empty")]
    EmptyName,

    #[error("account index {index} out of range ({available} accounts available)")]
    NoSuchAccount { index: usize, available: usize },

    #[error("insufficient funds for stake plus gas: {0}")]
    InsufficientFunds(String),

    #[error("transaction rejected by the wallet: {0}")]
    UserRejected(String),

    #[error("gas estimation or limit failure: {0}")]
    Gas(String),

    #[error("contract call failed: {0}")]
    Contract(String),
}

impl Error {
    /// True for the variants that are checked locally, before any network
    /// call is made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::InvalidStake { .. } | Error::EmptyName | Error::NoSuchAccount { .. }
        )
    }
}
