// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests through the update loop.
//!
//! Each test creates an isolated TestHarness with a temp SQLite database and
//! mock transport/providers, queues events, closes the transport and lets
//! the loop drain. Tests are independent and order-insensitive.

use std::time::Duration;

use gulabo_agent::replies;
use gulabo_agent::{BotLoop, PipelineDeps};
use gulabo_core::types::{MessageContent, UserId};
use gulabo_core::{CreditLedger, StorageAdapter};
use gulabo_test_utils::events;
use gulabo_test_utils::{Sent, TestHarness};
use tokio_util::sync::CancellationToken;

const USER: i64 = 1001;

/// Runs every queued event through a fresh loop and waits for it to stop.
async fn run_to_completion(h: &TestHarness) {
    let deps = PipelineDeps {
        transport: h.transport.clone(),
        storage: h.storage.clone(),
        ledger: h.ledger.clone(),
        generation: h.generation.clone(),
        transcription: h.transcription.clone(),
        speech: h.speech.clone(),
    };
    let bot = BotLoop::new(deps, &h.config);
    h.transport.close();
    tokio::time::timeout(Duration::from_secs(10), bot.run(CancellationToken::new()))
        .await
        .expect("loop should stop once the transport closes")
        .expect("loop should stop cleanly");
}

// ---- Scenario 1: new user round trip ----

#[tokio::test]
async fn new_user_text_round_trip() {
    let h = TestHarness::builder()
        .with_responses(vec!["Hi! I missed you.".into()])
        .build()
        .await
        .unwrap();
    h.transport.inject(events::text(USER, "hi")).await;

    run_to_completion(&h).await;

    let user = h.storage.get_user(UserId(USER)).await.unwrap();
    assert!(user.is_some());
    assert_eq!(h.balance(USER).await, Some(9));
    assert_eq!(h.transcript_len(USER).await, 2);
    assert_eq!(h.transport.voice_count().await, 1);
}

// ---- Scenario 2: zero balance ----

#[tokio::test]
async fn zero_balance_gets_offer_and_no_provider_calls() {
    let h = TestHarness::builder().build().await.unwrap();
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();
    h.transport.inject(events::text(USER, "are you there?")).await;

    run_to_completion(&h).await;

    assert!(h.generation.calls().await.is_empty());
    assert!(h.transcription.calls().await.is_empty());
    assert!(h.speech.calls().await.is_empty());
    match h.transport.sent().await.as_slice() {
        [Sent::Offer { buttons, .. }] => assert_eq!(buttons.len(), 3),
        other => panic!("expected one recharge offer, got {other:?}"),
    }
}

// ---- Scenario 3: confirmed payment ----

#[tokio::test]
async fn payment_for_middle_tier_credits_125() {
    let h = TestHarness::builder().build().await.unwrap();
    h.storage
        .setup_new_user(&events::profile(USER), 3)
        .await
        .unwrap();
    h.transport
        .inject(events::payment(USER, "recharge_125", "tg-charge-1"))
        .await;

    run_to_completion(&h).await;

    assert_eq!(h.balance(USER).await, Some(128));
    let texts = h.transport.sent_texts().await;
    assert_eq!(texts, vec![replies::payment_received(128)]);
    assert!(texts[0].contains("128"));
}

// ---- Scenario 4: silent voice note ----

#[tokio::test]
async fn empty_transcription_sends_nothing() {
    let h = TestHarness::builder().build().await.unwrap();
    h.transport.add_voice_file("file-1", vec![0; 32]).await;
    h.transport.inject(events::voice(USER, "file-1")).await;

    run_to_completion(&h).await;

    assert!(h.transport.sent().await.is_empty());
    assert!(h.generation.calls().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
}

// ---- Failure isolation ----

#[tokio::test]
async fn failed_generation_has_no_side_effects() {
    let h = TestHarness::builder().build().await.unwrap();
    h.generation.fail_next().await;
    h.transport.inject(events::text(USER, "hello")).await;

    run_to_completion(&h).await;

    assert!(h.speech.calls().await.is_empty());
    assert_eq!(h.transcript_len(USER).await, 0);
    assert_eq!(h.balance(USER).await, Some(10));
    assert!(h.transport.sent().await.is_empty());
}

#[tokio::test]
async fn transcript_keeps_history_plus_one_pair() {
    let h = TestHarness::builder()
        .with_responses(vec!["first".into(), "second".into()])
        .build()
        .await
        .unwrap();
    h.transport.inject(events::text(USER, "one")).await;
    h.transport.inject(events::text(USER, "two")).await;

    run_to_completion(&h).await;

    let conversation = h
        .storage
        .get_conversation(UserId(USER))
        .await
        .unwrap()
        .unwrap();
    let contents: Vec<_> = gulabo_core::transcript::decode(&conversation.messages)
        .into_iter()
        .map(|t| t.content)
        .collect();
    assert_eq!(contents, vec!["one", "first", "two", "second"]);
}

#[tokio::test]
async fn clearing_twice_leaves_the_same_empty_transcript() {
    let h = TestHarness::builder().build().await.unwrap();
    h.transport.inject(events::text(USER, "hello")).await;
    h.transport.inject(events::text(USER, "/clear")).await;
    h.transport.inject(events::text(USER, "/clear")).await;

    run_to_completion(&h).await;

    let conversation = h
        .storage
        .get_conversation(UserId(USER))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.messages, gulabo_core::transcript::EMPTY);
    let cleared = h
        .transport
        .sent_texts()
        .await
        .into_iter()
        .filter(|t| t == replies::HISTORY_CLEARED)
        .count();
    assert_eq!(cleared, 2);
}

#[tokio::test]
async fn unsupported_message_is_dropped() {
    let h = TestHarness::builder().build().await.unwrap();
    h.transport
        .inject(events::message(USER, MessageContent::Unsupported))
        .await;

    run_to_completion(&h).await;

    assert!(h.transport.sent().await.is_empty());
}

// ---- Recharge round trip ----

#[tokio::test]
async fn full_recharge_round_trip() {
    let h = TestHarness::builder().build().await.unwrap();
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();
    h.transport.inject(events::callback(USER, "recharge_50")).await;
    h.transport
        .inject(events::pre_checkout(USER, "recharge_50"))
        .await;
    h.transport
        .inject(events::payment(USER, "recharge_50", "tg-charge-2"))
        .await;
    h.transport
        .inject(events::payment(USER, "recharge_50", "tg-charge-2"))
        .await;

    run_to_completion(&h).await;

    assert_eq!(h.ledger.balance(UserId(USER)).await.unwrap(), Some(50));
    let sent = h.transport.sent().await;
    assert!(sent.iter().any(|s| matches!(s, Sent::CallbackAnswer { .. })));
    assert!(sent.iter().any(|s| matches!(s, Sent::Invoice { invoice, .. } if invoice.payload == "recharge_50")));
    assert!(sent.iter().any(|s| matches!(s, Sent::PreCheckoutAnswer { ok: true, .. })));
    assert_eq!(h.transport.sent_texts().await, vec![replies::payment_received(50)]);
}

#[tokio::test]
async fn concurrent_messages_never_push_balance_negative() {
    let h = TestHarness::builder()
        .with_starting_credits(2)
        .serialize_per_user(false)
        .build()
        .await
        .unwrap();
    for i in 0..6 {
        h.transport.inject(events::text(USER, &format!("msg {i}"))).await;
    }

    run_to_completion(&h).await;

    let balance = h.balance(USER).await.unwrap();
    assert!(balance >= 0, "balance went negative: {balance}");
}

#[tokio::test]
async fn dev_commands_are_inert_in_production() {
    let h = TestHarness::builder().production(true).build().await.unwrap();
    h.transport
        .inject(events::text(USER, "/dev_add_10_credits"))
        .await;

    run_to_completion(&h).await;

    assert_eq!(h.balance(USER).await, Some(10));
    assert_eq!(
        h.transport.sent_texts().await,
        vec![replies::UNKNOWN_COMMAND.to_string()]
    );
}
