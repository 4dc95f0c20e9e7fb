//! Account enumeration, balance aggregation, and display formatting.

use ethers::{
    types::{
        Address,
        U256,
    },
    utils::{
        format_ether,
        to_checksum,
    },
};
use futures::future::try_join_all;
use serde_json::json;

use crate::{
    connector::Connection,
    error::Error,
    transport::{
        RpcTransport,
        decode_address_list,
        decode_quantity,
    },
};

/// Upper bound on how many accounts a single aggregation cycle fetches.
pub const DEFAULT_BALANCE_LIMIT: usize = 10;

const DISPLAY_DECIMALS: usize = 4;
const ADDRESS_HEAD_LEN: usize = 6;
const ADDRESS_TAIL_LEN: usize = 4;

/// Balance and account reads against a borrowed connection. The gateway
/// never outlives the aggregation cycle it was built for.
pub struct AccountGateway<'c, T> {
    connection: &'c Connection<T>,
}

impl<'c, T: RpcTransport> AccountGateway<'c, T> {
    pub fn new(connection: &'c Connection<T>) -> Self {
        Self { connection }
    }

    /// Accounts controllable through the current connection, in node order.
    pub async fn list_accounts(&self) -> Result<Vec<Address>, Error> {
        let transport = self
            .connection
            .transport()
            .map_err(|_| Error::WalletUnavailable)?;
        let value = transport
            .request("eth_accounts", json!([]))
            .await
            .map_err(|_| Error::WalletUnavailable)?;
        decode_address_list(&value).map_err(|_| Error::WalletUnavailable)
    }

    /// Base-unit balance of one account. No retry on failure.
    pub async fn get_balance(&self, address: Address) -> Result<U256, Error> {
        let transport = self.connection.transport()?;
        let value = transport
            .request("eth_getBalance", json!([address, "latest"]))
            .await
            .map_err(Error::AccountQuery)?;
        decode_quantity(&value).map_err(Error::AccountQuery)
    }

    /// Balances for the first `limit` addresses, fetched concurrently and
    /// returned in input order.
    ///
    /// Any single failed fetch aborts the whole aggregate with one
    /// `AccountQuery` error; partial results are deliberately not supported.
    pub async fn get_balances(
        &self,
        addresses: &[Address],
        limit: usize,
    ) -> Result<Vec<U256>, Error> {
        let window = &addresses[..addresses.len().min(limit)];
        let fetches = window.iter().map(|address| self.get_balance(*address));
        try_join_all(fetches).await
    }

    /// Best-effort funds pre-check before a submission; a failed read
    /// collapses to `false` rather than erroring.
    pub async fn has_sufficient_balance(&self, address: Address, required_wei: U256) -> bool {
        self.get_balance(address)
            .await
            .map(|balance| balance >= required_wei)
            .unwrap_or(false)
    }
}

/// Full-precision display-unit rendering with trailing zeros trimmed
/// ("1.5", "0" for zero).
pub fn wei_to_display(wei: U256) -> String {
    let full = format_ether(wei);
    match full.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => full,
    }
}

/// Fixed-width display-unit rendering, truncated (not rounded) to four
/// decimals, mirroring what the balance list shows.
pub fn format_balance(wei: U256) -> String {
    let full = format_ether(wei);
    let (whole, fraction) = full.split_once('.').unwrap_or((full.as_str(), ""));
    let mut fraction = fraction.to_string();
    fraction.truncate(DISPLAY_DECIMALS);
    while fraction.len() < DISPLAY_DECIMALS {
        fraction.push('0');
    }
    format!("{whole}.{fraction}")
}

pub fn checksum_address(address: &Address) -> String {
    to_checksum(address, None)
}

/// Truncated address for display: first six characters (including the 0x
/// prefix), an ellipsis, and the last four.
pub fn truncate_address(address: &Address) -> String {
    let full = to_checksum(address, None);
    format!(
        "{}...{}",
        &full[..ADDRESS_HEAD_LEN],
        &full[full.len() - ADDRESS_TAIL_LEN..]
    )
}

pub fn account_at(accounts: &[Address], index: usize) -> Result<Address, Error> {
    accounts.get(index).copied().ok_or(Error::NoSuchAccount {
        index,
        available: accounts.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::parse_ether;
    use proptest::prelude::*;

    #[test]
    fn wei_to_display__trims_trailing_zeros() {
        assert_eq!(wei_to_display(U256::zero()), "0");
        assert_eq!(wei_to_display(U256::exp10(18)), "1");
        assert_eq!(wei_to_display(U256::exp10(18) * 3 / 2), "1.5");
    }

    #[test]
    fn format_balance__truncates_to_four_decimals() {
        assert_eq!(format_balance(U256::zero()), "0.0000");
        assert_eq!(format_balance(U256::exp10(18)), "1.0000");
        // 1.23456789 ether shows as 1.2345, not rounded up.
        let wei = parse_ether("1.23456789").unwrap();
        assert_eq!(format_balance(wei), "1.2345");
    }

    #[test]
    fn truncate_address__keeps_head_and_tail() {
        let address: Address = "0x80A85018ac486650Ffd5513b1800b7b541Eb3E95"
            .parse()
            .unwrap();
        let shown = truncate_address(&address);
        assert_eq!(shown, "0x80A8...3E95");
    }

    #[test]
    fn account_at__rejects_out_of_range_index() {
        let accounts = vec![Address::from_low_u64_be(1)];
        assert_eq!(account_at(&accounts, 0).unwrap(), accounts[0]);
        let err = account_at(&accounts, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::NoSuchAccount {
                index: 1,
                available: 1
            }
        ));
    }

    proptest! {
        // Display-unit conversion is lossless: any base-unit amount survives
        // a round trip through its full-precision ether rendering.
        #[test]
        fn display_conversion__round_trips(wei in any::<u128>()) {
            let wei = U256::from(wei);
            let display = format_ether(wei);
            let back = parse_ether(display).unwrap();
            prop_assert_eq!(back, wei);
        }
    }
}
