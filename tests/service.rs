use std::net::SocketAddr;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rusty_teller::{
    AccountStore, AgencyClient, AllowList, Client, Dispatcher, Error, Server, TellerClient,
};
use serde_json::json;
use tokio::sync::oneshot;

struct TestServer {
    addr: SocketAddr,
    store: Arc<AccountStore>,
    _stop: oneshot::Sender<()>,
}

async fn start_with(dispatcher: Dispatcher) -> TestServer {
    let store = Arc::clone(dispatcher.store());
    let server = Server::bind("127.0.0.1:0", dispatcher).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.serve_with_shutdown(async {
        let _ = stopped.await;
    }));
    TestServer {
        addr,
        store,
        _stop: stop,
    }
}

async fn start() -> TestServer {
    start_with(Dispatcher::new(Arc::new(AccountStore::new()))).await
}

#[tokio::test]
async fn test_create_then_read() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();

    let message = agency.create_account("A", dec!(100)).await.unwrap();
    assert_eq!(message, "Account created successfully.");
    assert_eq!(agency.consult_balance("A").await.unwrap(), dec!(100.0));
}

#[tokio::test]
async fn test_deposit_accumulates() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    let mut teller = TellerClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", dec!(100)).await.unwrap();
    let message = teller.deposit("A", dec!(50)).await.unwrap();
    assert_eq!(message, "Deposited 50.00 to A's account. New balance: 150.00");
    assert_eq!(teller.consult_balance("A").await.unwrap(), dec!(150.0));
}

#[tokio::test]
async fn test_withdraw_boundary() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    let mut teller = TellerClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", dec!(200)).await.unwrap();
    let message = teller.withdraw("A", dec!(200)).await.unwrap();
    assert_eq!(message, "Withdrew 200.00 from A's account. New balance: 0.00");

    let message = teller.withdraw("A", dec!(1)).await.unwrap();
    assert_eq!(message, "Insufficient funds.");
    assert_eq!(teller.consult_balance("A").await.unwrap(), dec!(0.0));
}

#[tokio::test]
async fn test_overflowing_deposit_keeps_server_up() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    let mut teller = TellerClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", Decimal::MAX).await.unwrap();
    let message = teller.deposit("A", dec!(1)).await.unwrap();
    assert_eq!(message, "Amount out of range.");
    assert_eq!(teller.consult_balance("A").await.unwrap(), Decimal::MAX);

    // Same connection and a fresh one both still get answers.
    let message = teller.withdraw("A", dec!(1)).await.unwrap();
    assert!(message.starts_with("Withdrew 1.00 from A's account."));
    let mut other = TellerClient::connect(server.addr, None).await.unwrap();
    assert_eq!(
        other.consult_balance("A").await.unwrap(),
        Decimal::MAX - dec!(1)
    );
}

#[tokio::test]
async fn test_messages_round_to_cents() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    let mut teller = TellerClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", dec!(0)).await.unwrap();
    let message = teller.deposit("A", dec!(1.009)).await.unwrap();
    assert_eq!(message, "Deposited 1.01 to A's account. New balance: 1.01");
    assert_eq!(teller.consult_balance("A").await.unwrap(), dec!(1.009));
}

#[tokio::test]
async fn test_duplicate_create_rejected() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", dec!(10)).await.unwrap();
    let message = agency.create_account("A", dec!(999)).await.unwrap();
    assert_eq!(message, "Account already exists.");
    assert_eq!(agency.consult_balance("A").await.unwrap(), dec!(10.0));
}

#[tokio::test]
async fn test_missing_account_outcomes() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    let mut teller = TellerClient::connect(server.addr, None).await.unwrap();

    assert!(matches!(
        agency.consult_balance("ghost").await,
        Err(Error::AccountNotFound)
    ));
    assert_eq!(
        teller.deposit("ghost", dec!(1)).await.unwrap(),
        "Account does not exist."
    );
    assert_eq!(
        teller.withdraw("ghost", dec!(1)).await.unwrap(),
        "Account does not exist."
    );
    assert_eq!(
        agency.delete_account("ghost").await.unwrap(),
        "Account does not exist."
    );
    assert!(server.store.is_empty().await);
}

#[tokio::test]
async fn test_delete_then_recreate() {
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();

    agency.create_account("A", dec!(5)).await.unwrap();
    assert_eq!(
        agency.delete_account("A").await.unwrap(),
        "Account deleted successfully."
    );
    assert!(matches!(
        agency.consult_balance("A").await,
        Err(Error::AccountNotFound)
    ));

    assert_eq!(
        agency.create_account("A", dec!(5)).await.unwrap(),
        "Account created successfully."
    );
    assert_eq!(agency.consult_balance("A").await.unwrap(), dec!(5.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_serialize() {
    const N: usize = 64;
    let server = start().await;
    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    agency.create_account("A", Decimal::ZERO).await.unwrap();

    let addr = server.addr;
    let handles: Vec<_> = (0..N)
        .map(|_| {
            tokio::spawn(async move {
                let mut teller = TellerClient::connect(addr, None).await?;
                teller.deposit("A", dec!(1)).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(agency.consult_balance("A").await.unwrap(), Decimal::from(N));
}

#[tokio::test]
async fn test_unknown_operation_is_rejected() {
    let server = start().await;
    let mut client = Client::connect(server.addr, None).await.unwrap();

    let result = client
        .call_method("Accounts.Transfer", json!({"from": "A", "to": "B"}))
        .await;
    assert!(matches!(result, Err(Error::UnknownOperation(_))));

    // the connection is still usable afterwards
    assert_eq!(
        client.create_account("A", dec!(1), "").await.unwrap(),
        "Account created successfully."
    );
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let server = start().await;
    let mut client = Client::connect(server.addr, None).await.unwrap();

    let result = client
        .call_method("Accounts.Deposit", json!({"name": "A"}))
        .await;
    assert!(matches!(result, Err(Error::MalformedPayload(_))));
}

#[tokio::test]
async fn test_allow_list_gates_agency_operations() {
    let dispatcher =
        Dispatcher::new(Arc::new(AccountStore::new())).with_policy(AllowList::new(["7777"]));
    let server = start_with(dispatcher).await;

    let mut agency = AgencyClient::connect(server.addr, None).await.unwrap();
    agency.create_account("A", dec!(1)).await.unwrap();

    let mut intruder = AgencyClient::connect(server.addr, None)
        .await
        .unwrap()
        .with_id("1234");
    assert!(matches!(
        intruder.delete_account("A").await,
        Err(Error::Unauthorized(_))
    ));
    assert_eq!(intruder.consult_balance("A").await.unwrap(), dec!(1));
}

#[tokio::test]
async fn test_connect_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(matches!(
        TellerClient::connect(addr, None).await,
        Err(Error::Io(_))
    ));
}
