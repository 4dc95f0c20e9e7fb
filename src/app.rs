//! Aggregation facade: the three operations the presentation layer calls,
//! and the flat view model they produce.

use ethers::types::{
    Address,
    U256,
};
use futures::join;
use serde::Serialize;
use tracing::warn;

use crate::{
    accounts::{
        AccountGateway,
        DEFAULT_BALANCE_LIMIT,
        account_at,
        checksum_address,
        format_balance,
        wei_to_display,
    },
    connector::{
        ChainConnector,
        Connection,
        ProviderKind,
        ProviderSources,
    },
    contract::ContractGateway,
    error::Error,
    transport::RpcTransport,
};

/// Aggregation session lifecycle. `Degraded` is not terminal: any later
/// initialize or submit re-attempts full connectivity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Uninitialized,
    Connecting,
    Ready,
    Degraded,
    Submitting,
}

/// Flat, presentation-ready aggregate. All amounts are display-unit strings;
/// raw base-unit values never cross this boundary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ViewModel {
    pub provider: String,
    pub accounts: Vec<String>,
    pub balances: Vec<String>,
    pub owner: String,
    pub participant_count: u64,
    pub jackpot: String,
    pub warnings: Vec<String>,
}

impl ViewModel {
    fn placeholder(provider: ProviderKind) -> Self {
        Self {
            provider: provider.to_string(),
            accounts: Vec::new(),
            balances: Vec::new(),
            owner: String::new(),
            participant_count: 0,
            jackpot: "0".to_string(),
            warnings: Vec::new(),
        }
    }
}

struct Snapshot {
    owner: Option<Address>,
    participant_count: Option<U256>,
    jackpot: Option<U256>,
    warnings: Vec<String>,
}

impl Snapshot {
    fn unavailable(reason: String) -> Self {
        Self {
            owner: None,
            participant_count: None,
            jackpot: None,
            warnings: vec![reason],
        }
    }
}

/// Composition root for one application session: owns the connector and the
/// contract binding, lends the connection to the gateways per cycle.
pub struct LotteryApp<T> {
    connector: ChainConnector<T>,
    contract_address: Address,
    contract: Option<ContractGateway>,
    accounts: Vec<Address>,
    view: Option<ViewModel>,
    phase: Phase,
}

impl<T: RpcTransport + Clone> LotteryApp<T> {
    pub fn new(sources: ProviderSources<T>, contract_address: Address) -> Self {
        Self {
            connector: ChainConnector::new(sources),
            contract_address,
            contract: None,
            accounts: Vec::new(),
            view: None,
            phase: Phase::Uninitialized,
        }
    }

    pub fn connector(&self) -> &ChainConnector<T> {
        &self.connector
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn view(&self) -> Option<&ViewModel> {
        self.view.as_ref()
    }

    /// Full initialize-on-load cycle: connect, then fan out to accounts,
    /// balances, and the contract read trio. Never errors; every sub-failure
    /// degrades into placeholder values plus a warning.
    pub async fn initialize_application(&mut self) -> ViewModel {
        self.phase = Phase::Connecting;
        self.connector.initialize().await;

        let mut warnings = Vec::new();
        let connection = self.connector.connection();
        if !connection.is_established() {
            warnings.push("no usable provider; showing placeholder data".to_string());
        }

        // Bindings never survive a connection swap; re-verify against the
        // connection just built.
        let contract = if connection.is_established() {
            Some(
                ContractGateway::bind(
                    connection,
                    self.contract_address,
                    ContractGateway::lottery_abi(),
                )
                .await,
            )
        } else {
            None
        };

        let gateway = AccountGateway::new(connection);
        let accounts = match gateway.list_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                if connection.is_established() {
                    warnings.push(format!("account discovery failed: {err}"));
                }
                Vec::new()
            }
        };

        let (balances, snapshot) = join!(
            Self::fetch_balances(connection, &accounts),
            Self::fetch_snapshot(connection, contract.as_ref()),
        );

        let view = assemble_view(connection.kind(), &accounts, balances, snapshot, warnings);
        self.contract = contract;
        self.accounts = accounts;
        self.finish_cycle(view)
    }

    /// Validates the entry locally, submits it, and on success refreshes
    /// balances and the contract snapshot so the view reflects
    /// post-transaction state. On failure the prior view model is left
    /// untouched and the classified error is surfaced.
    pub async fn submit_entry(
        &mut self,
        name: &str,
        account_index: usize,
        stake: &str,
    ) -> Result<ViewModel, Error> {
        // Precondition checks first: nothing below touches the network until
        // these pass.
        if name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        let stake_wei = ContractGateway::validate_stake(stake)?;
        let from = account_at(&self.accounts, account_index)?;
        let contract = self.contract.as_ref().ok_or(Error::ContractUnavailable)?;

        self.phase = Phase::Submitting;
        let connection = self.connector.connection();
        let gateway = AccountGateway::new(connection);
        if !gateway.has_sufficient_balance(from, stake_wei).await {
            self.phase = Phase::Degraded;
            return Err(Error::InsufficientFunds(format!(
                "account {account_index} cannot cover a {stake} ether stake"
            )));
        }

        if let Err(err) = contract.enroll(connection, name, from, stake).await {
            warn!(%err, "entry submission failed");
            self.phase = Phase::Degraded;
            return Err(err);
        }

        Ok(self.refresh_after_transaction().await)
    }

    /// Re-fetches balances and the contract snapshot against the existing
    /// connection and account list.
    async fn refresh_after_transaction(&mut self) -> ViewModel {
        let connection = self.connector.connection();
        let (balances, snapshot) = join!(
            Self::fetch_balances(connection, &self.accounts),
            Self::fetch_snapshot(connection, self.contract.as_ref()),
        );
        let view = assemble_view(
            connection.kind(),
            &self.accounts,
            balances,
            snapshot,
            Vec::new(),
        );
        self.finish_cycle(view)
    }

    fn finish_cycle(&mut self, view: ViewModel) -> ViewModel {
        self.phase = if view.warnings.is_empty() {
            Phase::Ready
        } else {
            Phase::Degraded
        };
        self.view = Some(view.clone());
        view
    }

    async fn fetch_balances(
        connection: &Connection<T>,
        accounts: &[Address],
    ) -> Result<Vec<U256>, Error> {
        if accounts.is_empty() {
            return Ok(Vec::new());
        }
        AccountGateway::new(connection)
            .get_balances(accounts, DEFAULT_BALANCE_LIMIT)
            .await
    }

    /// The three contract reads are evaluated independently: one failing
    /// read degrades to a placeholder without blocking the others.
    async fn fetch_snapshot(
        connection: &Connection<T>,
        contract: Option<&ContractGateway>,
    ) -> Snapshot {
        let Some(contract) = contract else {
            return Snapshot::unavailable("lottery contract unreachable".to_string());
        };
        let (owner, participant_count, jackpot) = join!(
            contract.owner(connection),
            contract.participant_count(connection),
            contract.jackpot(connection),
        );
        let mut warnings = Vec::new();
        let owner = match owner {
            Ok(value) => Some(value),
            Err(err) => {
                warnings.push(format!("contract owner unavailable: {err}"));
                None
            }
        };
        let participant_count = match participant_count {
            Ok(value) => Some(value),
            Err(err) => {
                warnings.push(format!("participant count unavailable: {err}"));
                None
            }
        };
        let jackpot = match jackpot {
            Ok(value) => Some(value),
            Err(err) => {
                warnings.push(format!("jackpot unavailable: {err}"));
                None
            }
        };
        Snapshot {
            owner,
            participant_count,
            jackpot,
            warnings,
        }
    }
}

fn assemble_view(
    provider: ProviderKind,
    accounts: &[Address],
    balances: Result<Vec<U256>, Error>,
    snapshot: Snapshot,
    mut warnings: Vec<String>,
) -> ViewModel {
    let mut view = ViewModel::placeholder(provider);
    view.accounts = accounts.iter().map(checksum_address).collect();
    view.balances = match balances {
        Ok(balances) => balances.into_iter().map(format_balance).collect(),
        Err(err) => {
            warnings.push(format!("balance aggregation failed: {err}"));
            accounts.iter().map(|_| format_balance(U256::zero())).collect()
        }
    };
    if let Some(owner) = snapshot.owner {
        view.owner = checksum_address(&owner);
    }
    if let Some(count) = snapshot.participant_count {
        view.participant_count = if count > U256::from(u64::MAX) {
            warn!(%count, "participant count exceeds u64 range, clamping");
            u64::MAX
        } else {
            count.low_u64()
        };
    }
    if let Some(jackpot) = snapshot.jackpot {
        view.jackpot = wei_to_display(jackpot);
    }
    warnings.extend(snapshot.warnings);
    view.warnings = warnings;
    view
}
