//! Randomized interleavings of calls, decisions and session changes.

use crate::utils::{DEV_ADDRESS, ManualUi, RECIPIENT, TestBridge};
use dapp_bridge::{Account, CallbackResponse};
use futures::StreamExt;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

fn random_call(rng: &mut StdRng) -> (&'static str, Value) {
    match rng.random_range(0..6) {
        0 => ("signMessage", json!({"data": "0x01"})),
        1 => ("signPersonalMessage", json!({"data": "hello"})),
        2 => ("sendTransaction", json!({"to": RECIPIENT.to_string(), "value": "0x1"})),
        3 => ("signTransaction", json!({"to": RECIPIENT.to_string(), "nonce": "0x0"})),
        4 => ("eth_accounts", json!([])),
        _ => ("signMessage", json!({"data": 42})),
    }
}

/// Drives one bridge through `steps` random operations and returns how many calls were issued
/// per id together with every response the page received.
async fn run(seed: u64, steps: usize) -> (BTreeMap<u64, usize>, Vec<CallbackResponse>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));
    let mut calls = BTreeMap::<u64, usize>::new();
    let mut next_id = 1;

    for _ in 0..steps {
        match rng.random_range(0..10) {
            0..=4 => {
                let (method, params) = random_call(&mut rng);
                bridge.call(next_id, method, params);
                *calls.entry(next_id).or_default() += 1;
                next_id += 1;
            }
            5 if next_id > 1 => {
                let id = rng.random_range(1..next_id);
                let (method, params) = random_call(&mut rng);
                bridge.call(id, method, params);
                *calls.entry(id).or_default() += 1;
            }
            6..=8 => {
                if let Ok(Some(current)) = requests.try_next() {
                    if rng.random_bool(0.7) {
                        current.approve();
                    } else {
                        current.reject();
                    }
                }
            }
            _ => {
                let account = if rng.random_bool(0.8) {
                    Account::signing(DEV_ADDRESS)
                } else {
                    Account::watch_only(DEV_ADDRESS)
                };
                bridge.dispatcher.session().set_account(Some(account));
            }
        }
        if rng.random_bool(0.3) {
            tokio::task::yield_now().await;
        }
    }

    if rng.random_bool(0.25) {
        bridge.dispatcher.teardown();
    } else {
        // flows may still be signing, so only wait briefly for each confirmation
        while bridge.dispatcher.pending_count() > 0 {
            let next = tokio::time::timeout(Duration::from_millis(50), requests.next()).await;
            if let Ok(Some(current)) = next {
                current.approve();
            }
        }
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut responses = Vec::new();
    while let Some(response) = bridge.try_response() {
        responses.push(response);
    }
    (calls, responses)
}

#[tokio::test(flavor = "multi_thread")]
async fn every_call_is_answered_exactly_once() {
    crate::init_tracing();
    for seed in 0..16 {
        let (calls, responses) = run(seed, 120).await;

        let mut answered = BTreeMap::<u64, usize>::new();
        for response in &responses {
            *answered.entry(response.callback_id.0).or_default() += 1;
        }
        assert_eq!(answered, calls, "seed {seed}");
        assert_eq!(responses.len(), calls.values().sum::<usize>(), "seed {seed}");
    }
}
