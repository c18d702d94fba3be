// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline behavior over mock adapters and a real SQLite ledger.

use gulabo_agent::commands::Command;
use gulabo_agent::recharge::RechargeOutcome;
use gulabo_agent::{MessagePipeline, Outcome, PipelineDeps, PipelineSettings, Stage, replies};
use gulabo_core::types::{MessageContent, Role, UserId};
use gulabo_core::{CreditLedger, StorageAdapter};
use gulabo_test_utils::events;
use gulabo_test_utils::{Sent, TestHarness};
use tokio_util::sync::CancellationToken;

const USER: i64 = 42;

fn pipeline(harness: &TestHarness) -> MessagePipeline {
    let deps = PipelineDeps {
        transport: harness.transport.clone(),
        storage: harness.storage.clone(),
        ledger: harness.ledger.clone(),
        generation: harness.generation.clone(),
        transcription: harness.transcription.clone(),
        speech: harness.speech.clone(),
    };
    MessagePipeline::new(
        deps,
        PipelineSettings {
            starting_credits: harness.config.agent.starting_credits,
            production: harness.config.agent.production,
        },
    )
}

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

#[tokio::test]
async fn first_text_message_onboards_replies_by_voice_and_debits() {
    let h = TestHarness::builder()
        .with_responses(vec!["hey you".into()])
        .build()
        .await
        .unwrap();
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::text(USER, "hello"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Outcome::Delivered {
            voice: true,
            debited: true
        }
    );
    assert_eq!(h.balance(USER).await, Some(9));
    assert_eq!(h.transport.voice_count().await, 1);
    assert!(h.transport.sent_texts().await.is_empty());

    let calls = h.generation.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].history.is_empty());
    assert_eq!(calls[0].input, "hello");
    assert_eq!(h.speech.calls().await, vec!["hey you".to_string()]);

    let conversation = h
        .storage
        .get_conversation(UserId(USER))
        .await
        .unwrap()
        .unwrap();
    let turns = gulabo_core::transcript::decode(&conversation.messages);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "hello");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "hey you");
}

#[tokio::test]
async fn second_message_sees_prior_history() {
    let h = harness().await;
    let p = pipeline(&h);
    let cancel = CancellationToken::new();

    p.handle_event(events::text(USER, "one"), &cancel).await;
    p.handle_event(events::text(USER, "two"), &cancel).await;

    let calls = h.generation.calls().await;
    assert_eq!(calls[1].history.len(), 2);
    assert_eq!(calls[1].history[0].content, "one");
    assert_eq!(calls[1].input, "two");
    assert_eq!(h.transcript_len(USER).await, 4);
    assert_eq!(h.balance(USER).await, Some(8));
}

#[tokio::test]
async fn zero_balance_offers_recharge_without_generating() {
    let h = harness().await;
    let p = pipeline(&h);
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();

    let outcome = p
        .handle_event(events::text(USER, "hi"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::OutOfCredits);
    assert!(h.generation.calls().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(0));
    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Sent::Offer { text, buttons, .. } => {
            assert_eq!(text, replies::OUT_OF_CREDITS);
            assert_eq!(buttons.len(), 3);
        }
        other => panic!("expected recharge offer, got {other:?}"),
    }
}

#[tokio::test]
async fn voice_message_is_transcribed_before_generation() {
    let h = harness().await;
    let p = pipeline(&h);
    h.transport.add_voice_file("voice-1", vec![7, 7, 7]).await;
    h.transcription.add_transcript("what's up").await;

    let outcome = p
        .handle_event(events::voice(USER, "voice-1"), &CancellationToken::new())
        .await;

    assert!(matches!(outcome, Outcome::Delivered { voice: true, .. }));
    assert_eq!(h.transcription.calls().await, vec![vec![7, 7, 7]]);
    assert_eq!(h.generation.calls().await[0].input, "what's up");
}

#[tokio::test]
async fn silent_voice_note_ends_quietly_without_debit() {
    let h = harness().await;
    let p = pipeline(&h);
    h.transport.add_voice_file("voice-1", vec![0; 16]).await;
    h.transcription.add_transcript("   ").await;

    let outcome = p
        .handle_event(events::voice(USER, "voice-1"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::EmptyTranscript));
    assert!(h.generation.calls().await.is_empty());
    assert!(h.transport.sent().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
}

#[tokio::test]
async fn missing_voice_file_aborts_at_fetch() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::voice(USER, "gone"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::FetchAudio));
    assert!(h.transcription.calls().await.is_empty());
}

#[tokio::test]
async fn transcription_failure_aborts_silently() {
    let h = harness().await;
    let p = pipeline(&h);
    h.transport.add_voice_file("voice-1", vec![1]).await;
    h.transcription.fail_next().await;

    let outcome = p
        .handle_event(events::voice(USER, "voice-1"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::Transcription));
    assert!(h.transport.sent().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
}

#[tokio::test]
async fn generation_failure_sends_nothing_and_keeps_credits() {
    let h = harness().await;
    let p = pipeline(&h);
    h.generation.fail_next().await;

    let outcome = p
        .handle_event(events::text(USER, "hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::Generation));
    assert!(h.transport.sent().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
    assert_eq!(h.transcript_len(USER).await, 0);
}

#[tokio::test]
async fn reply_of_only_quotes_is_not_delivered() {
    let h = TestHarness::builder()
        .with_responses(vec!["\"\" ".into()])
        .build()
        .await
        .unwrap();
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::text(USER, "hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::Generation));
    assert_eq!(h.balance(USER).await, Some(10));
}

#[tokio::test]
async fn speech_failure_falls_back_to_trimmed_text() {
    let h = TestHarness::builder()
        .with_responses(vec!["“sure thing” ".into()])
        .build()
        .await
        .unwrap();
    let p = pipeline(&h);
    h.speech.fail_next().await;

    let outcome = p
        .handle_event(events::text(USER, "hello"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Outcome::Delivered {
            voice: false,
            debited: true
        }
    );
    assert_eq!(h.transport.sent_texts().await, vec!["sure thing".to_string()]);
    assert_eq!(h.balance(USER).await, Some(9));
}

#[tokio::test]
async fn failed_voice_send_keeps_transcript_but_not_the_debit() {
    let h = harness().await;
    let p = pipeline(&h);
    h.transport.fail_voice_sends(true);

    let outcome = p
        .handle_event(events::text(USER, "hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Aborted(Stage::Delivery));
    assert_eq!(h.balance(USER).await, Some(10));
    assert_eq!(h.transcript_len(USER).await, 2);
    assert!(h.transport.sent_texts().await.is_empty());
}

#[tokio::test]
async fn unsupported_content_is_ignored() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(
            events::message(USER, MessageContent::Unsupported),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::Ignored);
    assert!(h.transport.sent().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
}

// --- Commands ---

#[tokio::test]
async fn help_greets_with_starting_grant() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::text(USER, "/start"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::CommandHandled(Command::Help));
    assert_eq!(h.transport.sent_texts().await, vec![replies::help(10)]);
    assert!(h.generation.calls().await.is_empty());
    assert_eq!(h.balance(USER).await, Some(10));
}

#[tokio::test]
async fn commands_work_with_zero_balance() {
    let h = harness().await;
    let p = pipeline(&h);
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();

    p.handle_event(events::text(USER, "/credits"), &CancellationToken::new())
        .await;

    assert_eq!(h.transport.sent_texts().await, vec![replies::balance(0)]);
}

#[tokio::test]
async fn clear_empties_the_transcript() {
    let h = harness().await;
    let p = pipeline(&h);
    let cancel = CancellationToken::new();
    p.handle_event(events::text(USER, "remember me"), &cancel).await;
    assert_eq!(h.transcript_len(USER).await, 2);

    p.handle_event(events::text(USER, "/clear"), &cancel).await;

    assert_eq!(h.transcript_len(USER).await, 0);
    assert!(
        h.transport
            .sent_texts()
            .await
            .contains(&replies::HISTORY_CLEARED.to_string())
    );
}

#[tokio::test]
async fn recharge_command_sends_offer() {
    let h = harness().await;
    let p = pipeline(&h);

    p.handle_event(events::text(USER, "/recharge"), &CancellationToken::new())
        .await;

    match h.transport.sent().await.as_slice() {
        [Sent::Offer { text, buttons, .. }] => {
            assert_eq!(text, replies::RECHARGE_INTRO);
            assert_eq!(buttons[0].payload, "recharge_50");
        }
        other => panic!("unexpected sends {other:?}"),
    }
}

#[tokio::test]
async fn unknown_command_gets_hint() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::text(USER, "/dance"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::CommandHandled(Command::Unknown));
    assert_eq!(
        h.transport.sent_texts().await,
        vec![replies::UNKNOWN_COMMAND.to_string()]
    );
}

#[tokio::test]
async fn dev_commands_adjust_balance_outside_production() {
    let h = harness().await;
    let p = pipeline(&h);
    let cancel = CancellationToken::new();

    p.handle_event(events::text(USER, "/dev_set_zero_credits"), &cancel)
        .await;
    assert_eq!(h.balance(USER).await, Some(0));

    p.handle_event(events::text(USER, "/dev_add_10_credits"), &cancel)
        .await;
    assert_eq!(h.balance(USER).await, Some(10));
    assert!(
        h.transport
            .sent_texts()
            .await
            .contains(&replies::dev_added(10, 10))
    );
}

#[tokio::test]
async fn dev_commands_are_inert_in_production() {
    let h = TestHarness::builder().production(true).build().await.unwrap();
    let p = pipeline(&h);

    let outcome = p
        .handle_event(
            events::text(USER, "/dev_set_zero_credits"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::CommandHandled(Command::Unknown));
    assert_eq!(h.balance(USER).await, Some(10));
}

// --- Recharge ---

#[tokio::test]
async fn button_press_is_answered_then_invoiced() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::callback(USER, "recharge_125"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Recharge(RechargeOutcome::InvoiceSent));
    match h.transport.sent().await.as_slice() {
        [Sent::CallbackAnswer { .. }, Sent::Invoice { invoice, .. }] => {
            assert_eq!(invoice.payload, "recharge_125");
            assert_eq!(invoice.amount, 1);
            assert!(invoice.title.ends_with("(Test)"));
        }
        other => panic!("unexpected sends {other:?}"),
    }
}

#[tokio::test]
async fn unknown_button_is_still_answered() {
    let h = harness().await;
    let p = pipeline(&h);

    let outcome = p
        .handle_event(events::callback(USER, "bogus"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Recharge(RechargeOutcome::UnknownTier));
    assert!(matches!(
        h.transport.sent().await.as_slice(),
        [Sent::CallbackAnswer { .. }]
    ));
}

#[tokio::test]
async fn pre_checkout_is_approved() {
    let h = harness().await;
    let p = pipeline(&h);

    p.handle_event(
        events::pre_checkout(USER, "recharge_50"),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        h.transport.sent().await.as_slice(),
        [Sent::PreCheckoutAnswer { ok: true, .. }]
    ));
}

#[tokio::test]
async fn payment_credits_tier_once_per_charge() {
    let h = harness().await;
    let p = pipeline(&h);
    let cancel = CancellationToken::new();
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();

    let first = p
        .handle_event(events::payment(USER, "recharge_50", "charge-1"), &cancel)
        .await;
    let again = p
        .handle_event(events::payment(USER, "recharge_50", "charge-1"), &cancel)
        .await;

    assert_eq!(
        first,
        Outcome::Recharge(RechargeOutcome::Credited { balance: 50 })
    );
    assert_eq!(
        again,
        Outcome::Recharge(RechargeOutcome::AlreadyCredited { balance: 50 })
    );
    assert_eq!(h.balance(USER).await, Some(50));
    assert_eq!(
        h.transport.sent_texts().await,
        vec![replies::payment_received(50)]
    );
}

#[tokio::test]
async fn payment_with_unknown_payload_credits_nothing() {
    let h = harness().await;
    let p = pipeline(&h);
    h.storage
        .setup_new_user(&events::profile(USER), 2)
        .await
        .unwrap();

    let outcome = p
        .handle_event(
            events::payment(USER, "recharge_9999", "charge-x"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::Recharge(RechargeOutcome::UnknownPayload));
    assert_eq!(h.ledger.balance(UserId(USER)).await.unwrap(), Some(2));
    assert!(h.transport.sent().await.is_empty());
}

#[tokio::test]
async fn recharge_after_running_out_resumes_conversation() {
    let h = harness().await;
    let p = pipeline(&h);
    let cancel = CancellationToken::new();
    h.storage
        .setup_new_user(&events::profile(USER), 0)
        .await
        .unwrap();

    assert_eq!(
        p.handle_event(events::text(USER, "hi"), &cancel).await,
        Outcome::OutOfCredits
    );
    p.handle_event(events::payment(USER, "recharge_300", "charge-9"), &cancel)
        .await;
    let outcome = p.handle_event(events::text(USER, "hi again"), &cancel).await;

    assert!(matches!(outcome, Outcome::Delivered { debited: true, .. }));
    assert_eq!(h.balance(USER).await, Some(299));
}
