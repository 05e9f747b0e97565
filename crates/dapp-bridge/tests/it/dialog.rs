//! alert, confirm and prompt emulation through a running bridge.

use crate::utils::{ManualUi, TestBridge, presented};
use dapp_bridge::{DialogAnswer, DialogId, DialogKind, PendingDialog};
use futures::StreamExt;
use serde_json::json;
use std::{sync::Arc, time::Duration};

async fn next_dialog(bridge: &mut TestBridge) -> PendingDialog {
    tokio::time::timeout(Duration::from_secs(5), bridge.channels.dialogs.next())
        .await
        .expect("timed out waiting for a dialog")
        .expect("dialog channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn one_dialog_per_frame_at_a_time() {
    let (ui, _requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));
    let dialogs = bridge.dispatcher.dialogs().clone();

    let first = tokio::spawn({
        let dialogs = dialogs.clone();
        async move { dialogs.confirm("main", "first?").await }
    });
    let shown = next_dialog(&mut bridge).await;
    assert_eq!(shown.request.message, "first?");

    let second = tokio::spawn({
        let dialogs = dialogs.clone();
        async move { dialogs.prompt("main", "second?", None).await }
    });
    let other_frame = tokio::spawn({
        let dialogs = dialogs.clone();
        async move { dialogs.alert("ads", "elsewhere").await }
    });

    // another frame is not blocked
    let elsewhere = next_dialog(&mut bridge).await;
    assert_eq!(elsewhere.request.frame, "ads");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(bridge.channels.dialogs.try_next().is_err());

    shown.completion.accept(None);
    assert!(first.await.unwrap());

    let queued = next_dialog(&mut bridge).await;
    assert_eq!(queued.request.message, "second?");
    assert_eq!(queued.request.kind, DialogKind::Prompt { default_text: None });
    queued.completion.accept(Some("bob".to_string()));
    assert_eq!(second.await.unwrap(), Some("bob".to_string()));

    elsewhere.completion.dismiss();
    other_frame.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn dialogs_do_not_touch_page_calls() {
    let (ui, mut requests) = ManualUi::new();
    let mut bridge = TestBridge::spawn(Arc::new(ui));

    bridge.call(1, "signMessage", json!({"data": "0x01"}));
    let pending_call = presented(&mut requests).await;

    let dialogs = bridge.dispatcher.dialogs().clone();
    let answer = tokio::spawn(async move {
        dialogs.present("main", "still there?", DialogKind::Confirm).await
    });
    let dialog = next_dialog(&mut bridge).await;
    assert_eq!(dialog.request.id, DialogId(1));

    // a mismatched answer is coerced into the dialog's shape
    dialog.completion.complete(DialogAnswer::Text(Some("yes".into())));
    assert_eq!(answer.await.unwrap(), DialogAnswer::Confirmed(false));

    assert_eq!(bridge.dispatcher.pending_count(), 1);
    assert!(bridge.try_response().is_none());

    pending_call.approve();
    let response = bridge.response().await;
    assert_eq!(response.callback_id.0, 1);
    assert!(response.is_success());
}
