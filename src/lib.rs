//! Connectivity and aggregation layer for the lottery dapp: provider
//! selection with fallback, account/balance aggregation, contract binding
//! and reads, and the view-model facade the presentation layer consumes.

pub mod accounts;
pub mod app;
pub mod config;
pub mod connector;
pub mod contract;
pub mod error;
pub mod test_helpers;
pub mod transport;

pub use app::{
    LotteryApp,
    Phase,
    ViewModel,
};
pub use config::{
    AppConfig,
    ConfigOverrides,
};
pub use connector::{
    ChainConnector,
    ChainSignal,
    Connection,
    NetworkInfo,
    ProviderKind,
    ProviderSources,
    change_feed,
};
pub use contract::ContractGateway;
pub use error::Error;
pub use transport::{
    HttpTransport,
    RpcTransport,
    TransportError,
};
