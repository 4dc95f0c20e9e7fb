#![allow(non_snake_case)]

use ethers::types::{
    Address,
    U256,
};
use lottery_client::{
    ChainConnector,
    ContractGateway,
    Error,
    ProviderSources,
    test_helpers::{
        MockTransport,
        encoded_address,
        encoded_uint,
        quantity_u64,
        selector,
    },
};
use serde_json::json;

const CONTRACT: &str = "0x80A85018ac486650Ffd5513b1800b7b541Eb3E95";

fn contract_address() -> Address {
    CONTRACT.parse().unwrap()
}

async fn connected(mock: MockTransport) -> ChainConnector<MockTransport> {
    mock.respond("eth_blockNumber", quantity_u64(42));
    let mut connector = ChainConnector::new(ProviderSources::local_only(mock));
    connector.initialize().await;
    connector
}

fn with_deployed_code(mock: &MockTransport) {
    mock.respond("eth_getCode", json!("0x6080604052600080fd"));
}

#[tokio::test]
async fn bind__missing_code_disables_every_read() {
    // given: nothing deployed at the configured address
    let mock = MockTransport::new();
    mock.respond("eth_getCode", json!("0x"));
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();

    // when
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;

    // then: every read fails fast without touching the network again
    assert!(!gateway.is_available());
    assert!(matches!(
        gateway.owner(connection).await,
        Err(Error::ContractUnavailable)
    ));
    assert!(matches!(
        gateway.participant_count(connection).await,
        Err(Error::ContractUnavailable)
    ));
    assert!(matches!(
        gateway.jackpot(connection).await,
        Err(Error::ContractUnavailable)
    ));
    assert_eq!(mock.call_count("eth_getCode"), 1);
    assert_eq!(mock.call_count("eth_call"), 0);
}

#[tokio::test]
async fn bind__probe_failure_disables_the_binding() {
    let mock = MockTransport::new();
    mock.fail("eth_getCode", "connection reset");
    let connector = connected(mock).await;
    let connection = connector.connection();

    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;

    assert!(!gateway.is_available());
}

#[tokio::test]
async fn reads__decode_typed_values_from_the_contract() {
    let owner = Address::from_low_u64_be(99);
    let mock = MockTransport::new();
    with_deployed_code(&mock);
    mock.respond_when("eth_call", &selector("owner"), encoded_address(owner));
    mock.respond_when(
        "eth_call",
        &selector("getNumberOfParticipants"),
        encoded_uint(U256::from(5)),
    );
    mock.respond_when(
        "eth_call",
        &selector("getJackPot"),
        encoded_uint(U256::exp10(18) * 5),
    );
    let connector = connected(mock).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;

    assert_eq!(gateway.owner(connection).await.unwrap(), owner);
    assert_eq!(
        gateway.participant_count(connection).await.unwrap(),
        U256::from(5)
    );
    assert_eq!(
        gateway.jackpot(connection).await.unwrap(),
        U256::exp10(18) * 5
    );
}

#[tokio::test]
async fn enroll__rejects_stake_below_minimum_without_network_calls() {
    let mock = MockTransport::new();
    with_deployed_code(&mock);
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;
    let calls_before = mock.total_calls();

    let err = gateway
        .enroll(connection, "Alice", Address::from_low_u64_be(1), "0.5")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidStake { .. }));
    assert_eq!(mock.total_calls(), calls_before);
}

#[tokio::test]
async fn enroll__rejects_stake_above_ceiling_without_network_calls() {
    let mock = MockTransport::new();
    with_deployed_code(&mock);
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;
    let calls_before = mock.total_calls();

    let err = gateway
        .enroll(connection, "Alice", Address::from_low_u64_be(1), "1001")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidStake { .. }));
    assert_eq!(mock.total_calls(), calls_before);
}

#[tokio::test]
async fn enroll__rejects_an_empty_name_without_network_calls() {
    let mock = MockTransport::new();
    with_deployed_code(&mock);
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;
    let calls_before = mock.total_calls();

    let err = gateway
        .enroll(connection, "   ", Address::from_low_u64_be(1), "1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyName));
    assert_eq!(mock.total_calls(), calls_before);
}

#[tokio::test]
async fn enroll__fails_fast_on_an_unavailable_binding() {
    let mock = MockTransport::new();
    mock.respond("eth_getCode", json!("0x"));
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;

    let err = gateway
        .enroll(connection, "Alice", Address::from_low_u64_be(1), "1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ContractUnavailable));
    assert_eq!(mock.call_count("eth_sendTransaction"), 0);
}

#[tokio::test]
async fn enroll__sends_one_transaction_with_fixed_parameters() {
    // given
    let from = Address::from_low_u64_be(1);
    let mock = MockTransport::new();
    with_deployed_code(&mock);
    mock.respond("eth_sendTransaction", json!("0xabc123"));
    let connector = connected(mock.clone()).await;
    let connection = connector.connection();
    let gateway =
        ContractGateway::bind(connection, contract_address(), ContractGateway::lottery_abi())
            .await;

    // when
    gateway
        .enroll(connection, "Alice", from, "1")
        .await
        .unwrap();

    // then: exactly one send, value of one ether, fixed legacy gas terms
    assert_eq!(mock.call_count("eth_sendTransaction"), 1);
    let params = mock.params_of("eth_sendTransaction");
    let tx = &params[0][0];
    assert_eq!(tx["value"], "0xde0b6b3a7640000");
    assert_eq!(tx["gas"], "0x2dc6c0");
    assert_eq!(tx["gasPrice"], "0x4a817c800");
    let data = tx["data"].as_str().unwrap();
    assert!(data.starts_with(&selector("enroleInLottery")));
}

#[tokio::test]
async fn enroll__classifies_rejection_messages() {
    let cases: Vec<(&str, fn(&Error) -> bool)> = vec![
        ("insufficient funds for gas * price + value", |err| {
            matches!(err, Error::InsufficientFunds(_))
        }),
        ("User denied transaction signature", |err| {
            matches!(err, Error::UserRejected(_))
        }),
        ("intrinsic gas too low", |err| matches!(err, Error::Gas(_))),
        ("execution reverted", |err| matches!(err, Error::Contract(_))),
    ];

    for (message, is_expected) in cases {
        let mock = MockTransport::new();
        with_deployed_code(&mock);
        mock.fail("eth_sendTransaction", message);
        let connector = connected(mock).await;
        let connection = connector.connection();
        let gateway = ContractGateway::bind(
            connection,
            contract_address(),
            ContractGateway::lottery_abi(),
        )
        .await;

        let err = gateway
            .enroll(connection, "Alice", Address::from_low_u64_be(1), "1")
            .await
            .unwrap_err();

        assert!(is_expected(&err), "message {message:?} classified as {err}");
    }
}
