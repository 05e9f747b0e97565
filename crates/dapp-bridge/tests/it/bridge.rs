//! End to end behaviour of the dispatcher with its collaborators.

use crate::utils::{
    AutoUi, DEV_ADDRESS, ManualUi, MockBroadcaster, RECIPIENT, TestBridge, dev_signer, error_code,
    presented,
};
use alloy_consensus::TxEnvelope;
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Bytes, U256, keccak256};
use alloy_signer::Signer;
use dapp_bridge::{
    Account, BridgeConfig, BridgeDispatcher, BridgeServices, CallbackId, CallbackValue,
    ConfirmType, ErrorCode, FlowError, HostEvent, LoggingManager, NetworkContext, NetworkError,
    PageMessage, RegistryError, ResponseResult, SessionContext, SessionHandle, SigningError,
    Violation,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};

fn transfer() -> serde_json::Value {
    json!({"to": RECIPIENT.to_string(), "value": "0xde0b6b3a7640000"})
}

fn greeting() -> serde_json::Value {
    json!({
        "types": {
            "EIP712Domain": [{"name": "name", "type": "string"}],
            "Greeting": [{"name": "text", "type": "string"}]
        },
        "primaryType": "Greeting",
        "domain": {"name": "bridge"},
        "message": {"text": "gm"}
    })
}

fn nonce_of(raw: &Bytes) -> u64 {
    let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
    envelope.as_legacy().unwrap().tx().nonce
}

#[tokio::test(flavor = "multi_thread")]
async fn approved_personal_message_is_signed() {
    let ui = Arc::new(AutoUi::approving());
    let mut bridge = TestBridge::spawn(ui.clone());

    bridge.call(7, "signPersonalMessage", json!({"data": "0xdeadbeef"}));
    let response = bridge.response().await;

    let expected = dev_signer().sign_message(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();
    let signature = Bytes::copy_from_slice(&expected.as_bytes());
    assert_eq!(response.callback_id, CallbackId(7));
    assert_eq!(
        response.result,
        ResponseResult::success(CallbackValue::SignPersonalMessage(signature.clone()))
    );
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"callbackID": 7, "result": {"signPersonalMessage": signature}})
    );

    let presented = ui.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].confirm_type, ConfirmType::Sign);
    assert_eq!(bridge.keystore.call_count(), 1);
    assert_eq!(bridge.keystore.calls()[0].kind, "personalMessage");
    assert_eq!(bridge.dispatcher.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_request_never_reaches_keystore() {
    let ui = Arc::new(AutoUi::rejecting());
    let mut bridge = TestBridge::spawn(ui.clone());

    bridge.call(7, "signPersonalMessage", json!({"data": "0xdeadbeef"}));
    let response = bridge.response().await;

    assert_eq!(response.callback_id, CallbackId(7));
    assert_eq!(error_code(&response), Some(ErrorCode::UserRejected));
    assert_eq!(ui.presented().len(), 1);
    assert_eq!(bridge.keystore.call_count(), 0);

    match bridge.event().await {
        HostEvent::RequestFailed { callback_id, method, error, account, chain_id } => {
            assert_eq!(callback_id, CallbackId(7));
            assert_eq!(method, "signPersonalMessage");
            assert_eq!(error, FlowError::UserRejected);
            assert_eq!(account, Some(DEV_ADDRESS));
            assert_eq!(chain_id, 1);
        }
        event => panic!("unexpected event {event:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_only_account_fails_without_ui() {
    let ui = Arc::new(AutoUi::approving());
    let mut bridge = TestBridge::spawn_with(
        ui.clone(),
        Account::watch_only(DEV_ADDRESS),
        MockBroadcaster::default(),
    );

    let calls = [
        ("signTransaction", transfer()),
        ("sendTransaction", transfer()),
        ("signMessage", json!({"data": "0xdeadbeef"})),
        ("signPersonalMessage", json!({"data": "hello"})),
        ("signTypedMessage", json!({"data": greeting()})),
    ];
    for (id, (method, params)) in (1..).zip(calls) {
        bridge.call(id, method, params);

        // answered before the call returns
        let response = bridge.try_response().expect("watch only calls are answered immediately");
        assert_eq!(response.callback_id, CallbackId(id), "{method}");
        assert_eq!(error_code(&response), Some(ErrorCode::Unauthorized), "{method}");
        assert_eq!(
            bridge.try_event(),
            Some(HostEvent::OnlyWatchAccount {
                callback_id: CallbackId(id),
                account: Some(DEV_ADDRESS)
            }),
            "{method}"
        );
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ui.presented().is_empty());
    assert_eq!(bridge.keystore.call_count(), 0);
    assert_eq!(bridge.broadcaster.nonce_requests(), 0);
    assert!(bridge.broadcaster.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_id_is_rejected_and_first_call_proceeds() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    bridge.call(7, "signPersonalMessage", json!({"data": "0xdeadbeef"}));
    let first = presented(&mut requests).await;
    assert_eq!(first.request.callback_id, CallbackId(7));

    bridge.call(7, "signMessage", json!({"data": "0x01"}));
    let duplicate = bridge.response().await;
    assert_eq!(duplicate.callback_id, CallbackId(7));
    assert_eq!(error_code(&duplicate), Some(ErrorCode::InvalidRequest));
    assert_eq!(
        bridge.event().await,
        HostEvent::ProtocolViolation {
            callback_id: Some(CallbackId(7)),
            violation: Violation::Registry(RegistryError::DuplicateId(CallbackId(7))),
        }
    );
    assert_eq!(bridge.dispatcher.pending_count(), 1);

    first.approve();
    let response = bridge.response().await;
    assert_eq!(response.callback_id, CallbackId(7));
    assert!(matches!(
        response.result,
        ResponseResult::Success(ref value) if value.get("signPersonalMessage").is_some()
    ));
    assert_eq!(bridge.keystore.call_count(), 1);
    assert!(bridge.try_response().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_calls_are_invalid_requests() {
    let mut bridge = TestBridge::spawn(Arc::new(AutoUi::approving()));

    bridge.call(1, "eth_requestAccounts", json!([]));
    let response = bridge.try_response().unwrap();
    assert_eq!(response.callback_id, CallbackId(1));
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));
    assert!(matches!(
        bridge.try_event(),
        Some(HostEvent::ProtocolViolation { violation: Violation::Decode(_), .. })
    ));

    bridge.call(2, "signPersonalMessage", json!({}));
    let response = bridge.try_response().unwrap();
    assert_eq!(response.callback_id, CallbackId(2));
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));

    bridge.call(3, "sendTransaction", json!({"to": "0x1234"}));
    assert_eq!(error_code(&bridge.try_response().unwrap()), Some(ErrorCode::InvalidRequest));

    // ids of rejected calls stay free
    assert_eq!(bridge.dispatcher.pending_count(), 0);
    bridge.call(1, "signPersonalMessage", json!({"data": "0x01"}));
    assert!(bridge.response().await.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_raw_calls() {
    let mut bridge = TestBridge::spawn(Arc::new(AutoUi::approving()));

    bridge.dispatcher.handle_raw(r#"{"callbackID": 9, "method": 42}"#);
    let response = bridge.try_response().unwrap();
    assert_eq!(response.callback_id, CallbackId(9));
    assert_eq!(error_code(&response), Some(ErrorCode::InvalidRequest));
    assert_eq!(
        bridge.try_event(),
        Some(HostEvent::ProtocolViolation {
            callback_id: Some(CallbackId(9)),
            violation: Violation::Malformed,
        })
    );

    bridge.dispatcher.handle_raw("not json");
    assert!(bridge.try_response().is_none());
    assert_eq!(
        bridge.try_event(),
        Some(HostEvent::ProtocolViolation { callback_id: None, violation: Violation::Malformed })
    );

    bridge.dispatcher.handle_message(PageMessage::Raw(
        r#"{"callbackID": 10, "method": "signMessage", "params": {"data": "0x01"}}"#.to_string(),
    ));
    let response = bridge.response().await;
    assert_eq!(response.callback_id, CallbackId(10));
    assert!(response.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn confirmations_are_presented_one_at_a_time_in_order() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    for id in 1..=3 {
        bridge.call(id, "signMessage", json!({"data": format!("0x0{id}")}));
    }
    assert_eq!(bridge.dispatcher.pending_count(), 3);

    for id in 1..=3 {
        let current = presented(&mut requests).await;
        assert_eq!(current.request.callback_id, CallbackId(id));

        // nothing else is shown while the user decides
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(requests.try_next().is_err());

        current.approve();
        let response = bridge.response().await;
        assert_eq!(response.callback_id, CallbackId(id));
        assert!(response.is_success());
    }
    assert_eq!(bridge.dispatcher.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn flow_keeps_the_context_it_was_created_with() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    bridge.call(1, "signPersonalMessage", json!({"data": "hello"}));
    let current = presented(&mut requests).await;
    assert_eq!(current.request.account, Account::signing(DEV_ADDRESS));
    assert_eq!(current.request.network, NetworkContext::mainnet());

    let session = bridge.dispatcher.session();
    session.set_network(NetworkContext::new(5, "goerli"));
    session.set_account(Some(Account::watch_only(RECIPIENT)));

    current.approve();
    assert!(bridge.response().await.is_success());
    let calls = bridge.keystore.calls();
    assert_eq!(calls[0].account, DEV_ADDRESS);
    assert_eq!(calls[0].chain_id, 1);

    // later calls see the new session
    bridge.call(2, "signPersonalMessage", json!({"data": "hello"}));
    let response = bridge.try_response().unwrap();
    assert_eq!(error_code(&response), Some(ErrorCode::Unauthorized));
    assert_eq!(
        bridge.try_event(),
        Some(HostEvent::OnlyWatchAccount { callback_id: CallbackId(2), account: Some(RECIPIENT) })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn send_transaction_broadcasts_and_returns_hash() {
    let ui = Arc::new(AutoUi::approving());
    let broadcaster = MockBroadcaster::with_nonce(5);
    let mut bridge = TestBridge::spawn_with(ui.clone(), Account::signing(DEV_ADDRESS), broadcaster);

    bridge.call(3, "sendTransaction", transfer());
    let response = bridge.response().await;

    let sent = bridge.broadcaster.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(nonce_of(&sent[0]), 5);
    let hash = keccak256(&sent[0]);
    assert_eq!(response.result, ResponseResult::success(CallbackValue::SentTransaction(hash)));
    assert_eq!(
        bridge.event().await,
        HostEvent::TransactionSent { callback_id: CallbackId(3), hash }
    );

    let presented = ui.presented();
    assert_eq!(presented[0].confirm_type, ConfirmType::SignThenSend);
    let tx = presented[0].action.transaction().unwrap();
    assert_eq!(tx.nonce, Some(5));
    let fee = U256::from(tx.gas_limit) * U256::from(tx.gas_price);
    assert_eq!(presented[0].max_cost(), Some(U256::from(10u128.pow(18)) + fee));
    assert_eq!(bridge.broadcaster.nonce_requests(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_transaction_never_broadcasts() {
    let ui = Arc::new(AutoUi::approving());
    let mut bridge = TestBridge::spawn(ui.clone());

    let mut params = transfer();
    params["nonce"] = json!("0x2");
    params["from"] = json!(DEV_ADDRESS.to_string());
    bridge.call(4, "signTransaction", params);
    let response = bridge.response().await;

    let value = match response.result {
        ResponseResult::Success(value) => serde_json::from_value::<CallbackValue>(value).unwrap(),
        err => panic!("unexpected response {err:?}"),
    };
    let CallbackValue::SignTransaction(raw) = value else {
        panic!("expected a signed transaction");
    };
    assert_eq!(nonce_of(&raw), 2);

    assert!(bridge.broadcaster.sent().is_empty());
    assert_eq!(bridge.broadcaster.nonce_requests(), 0);
    assert_eq!(ui.presented()[0].confirm_type, ConfirmType::Sign);
    assert_eq!(
        bridge.event().await,
        HostEvent::TransactionSigned { callback_id: CallbackId(4), hash: keccak256(&raw) }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_broadcast_is_a_network_error() {
    let mut bridge = TestBridge::spawn_with(
        Arc::new(AutoUi::approving()),
        Account::signing(DEV_ADDRESS),
        MockBroadcaster::rejecting(),
    );

    bridge.call(5, "sendTransaction", transfer());
    let response = bridge.response().await;
    assert_eq!(error_code(&response), Some(ErrorCode::TransactionRejected));
    assert_eq!(bridge.keystore.call_count(), 1);

    // diagnostics stay with the host
    let ResponseResult::Error(err) = &response.result else { unreachable!() };
    assert!(!err.message.contains("insufficient funds"));
    match bridge.event().await {
        HostEvent::RequestFailed { error, .. } => {
            let rejected = NetworkError::Rejected("insufficient funds".into());
            assert_eq!(error, FlowError::Network(rejected));
        }
        event => panic!("unexpected event {event:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn keystore_failure_is_an_internal_error() {
    // the session account has no key in the keystore
    let mut bridge = TestBridge::spawn_with(
        Arc::new(AutoUi::approving()),
        Account::signing(RECIPIENT),
        MockBroadcaster::default(),
    );

    bridge.call(9, "sendTransaction", json!({"to": DEV_ADDRESS.to_string(), "value": "0x1"}));
    let response = bridge.response().await;
    assert_eq!(response.callback_id, CallbackId(9));
    assert_eq!(error_code(&response), Some(ErrorCode::InternalError));
    assert_eq!(bridge.keystore.call_count(), 1);
    assert!(bridge.broadcaster.sent().is_empty());
    match bridge.event().await {
        HostEvent::RequestFailed { callback_id, error, account, .. } => {
            assert_eq!(callback_id, CallbackId(9));
            assert_eq!(error, FlowError::Signing(SigningError::UnknownAccount(RECIPIENT)));
            assert_eq!(account, Some(RECIPIENT));
        }
        event => panic!("unexpected event {event:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_nonce_fails_before_approval() {
    let ui = Arc::new(AutoUi::approving());
    let broadcaster = MockBroadcaster::offline();
    let mut bridge = TestBridge::spawn_with(ui.clone(), Account::signing(DEV_ADDRESS), broadcaster);

    bridge.call(6, "sendTransaction", transfer());
    let response = bridge.response().await;
    assert_eq!(error_code(&response), Some(ErrorCode::ResourceUnavailable));
    assert!(ui.presented().is_empty());
    assert_eq!(bridge.keystore.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_sender_is_unauthorized() {
    let ui = Arc::new(AutoUi::approving());
    let mut bridge = TestBridge::spawn(ui.clone());

    let mut params = transfer();
    params["from"] = json!(RECIPIENT.to_string());
    bridge.call(8, "sendTransaction", params);

    let response = bridge.try_response().unwrap();
    assert_eq!(error_code(&response), Some(ErrorCode::Unauthorized));
    assert!(matches!(
        bridge.try_event(),
        Some(HostEvent::RequestFailed { error: FlowError::AccountMismatch { .. }, .. })
    ));
    assert!(ui.presented().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn teardown_cancels_everything_pending() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    bridge.call(2, "signPersonalMessage", json!({"data": "0x02"}));
    bridge.call(1, "sendTransaction", transfer());
    let current = presented(&mut requests).await;
    assert_eq!(current.request.callback_id, CallbackId(2));

    bridge.dispatcher.teardown();
    assert!(bridge.dispatcher.is_torn_down());
    assert_eq!(bridge.dispatcher.pending_count(), 0);

    let first = bridge.response().await;
    let second = bridge.response().await;
    assert_eq!((first.callback_id, second.callback_id), (CallbackId(1), CallbackId(2)));
    assert_eq!(error_code(&first), Some(ErrorCode::Disconnected));
    assert_eq!(error_code(&second), Some(ErrorCode::Disconnected));

    // a late approval has no effect
    current.approve();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.keystore.call_count(), 0);
    assert!(bridge.broadcaster.sent().is_empty());
    assert!(bridge.try_response().is_none());

    bridge.call(3, "signMessage", json!({"data": "0x01"}));
    let late = bridge.try_response().unwrap();
    assert_eq!(late.callback_id, CallbackId(3));
    assert_eq!(error_code(&late), Some(ErrorCode::Disconnected));

    bridge.dispatcher.teardown();
    assert!(bridge.try_response().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_dispatcher_tears_down() {
    let (ui, mut requests) = ManualUi::new();
    let TestBridge { dispatcher, mut channels, keystore, .. } = TestBridge::spawn(Arc::new(ui));

    dispatcher.handle_call(dapp_bridge::InboundCall::new(
        4,
        "signMessage",
        json!({"data": "0x01"}),
    ));
    let current = presented(&mut requests).await;
    drop(dispatcher);

    let response = channels.responses.try_next().unwrap().unwrap();
    assert_eq!(response.callback_id, CallbackId(4));
    assert_eq!(error_code(&response), Some(ErrorCode::Disconnected));

    current.approve();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(keystore.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn url_change_keeps_pending_calls() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    bridge.call(1, "signMessage", json!({"data": "0x01"}));
    let current = presented(&mut requests).await;

    bridge.dispatcher.handle_message(PageMessage::UrlChanged("https://example.org/next".into()));
    assert_eq!(bridge.dispatcher.pending_count(), 1);
    assert!(bridge.try_response().is_none());

    current.reject();
    let response = bridge.response().await;
    assert_eq!(error_code(&response), Some(ErrorCode::UserRejected));
}

#[tokio::test(flavor = "multi_thread")]
async fn typed_message_is_signed() {
    let mut bridge = TestBridge::spawn(Arc::new(AutoUi::approving()));

    bridge.call(11, "signTypedMessage", json!({"data": greeting()}));
    let response = bridge.response().await;
    assert!(matches!(
        response.result,
        ResponseResult::Success(ref value) if value.get("signTypedMessage").is_some()
    ));
    assert_eq!(bridge.keystore.calls()[0].kind, "typedMessage");
}

#[tokio::test(flavor = "multi_thread")]
async fn logging_manager_is_shared() {
    let bridge = TestBridge::spawn(Arc::new(AutoUi::approving()));
    assert!(bridge.logging.is_enabled());
    bridge.dispatcher.logging().set_enabled(false);
    assert!(!bridge.logging.is_enabled());

    // the config seeds the manager it is given
    let logging = LoggingManager::default();
    let services = BridgeServices::new(
        bridge.keystore.clone(),
        bridge.broadcaster.clone(),
        Arc::new(AutoUi::approving()),
    );
    let session = SessionHandle::new(SessionContext::new(None, NetworkContext::mainnet()));
    let config = BridgeConfig::default().with_user_logs(false);
    let (dispatcher, _channels) =
        BridgeDispatcher::new(&config, session, services, logging.clone());
    assert!(!logging.is_enabled());
    dispatcher.logging().set_enabled(true);
    assert!(logging.is_enabled());
}
