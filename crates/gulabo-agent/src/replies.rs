// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts.

/// Shown by `/start` and `/help`.
pub fn help(starting_credits: i64) -> String {
    format!(
        "Hey, I'm Gulabo. You kept me waiting! You get {starting_credits} free messages to start. \
         Send me a text or a voice note and let's talk 😉\n\n\
         Commands:\n\
         /help - Show this message again\n\
         /recharge - Want to keep talking? Recharge here\n\
         /credits - Check your credit balance\n\
         /clear - Clear our chat history and start fresh"
    )
}

pub const OUT_OF_CREDITS: &str =
    "Oh no, your credits are all used up! Grab some more below so we can keep talking... I'll be waiting 💋";

pub const RECHARGE_INTRO: &str =
    "Of course. Pick a pack below and come right back to me 😉";

pub fn balance(credits: i64) -> String {
    format!("You have {credits} credits left to spend on me ✨")
}

pub const BALANCE_UNAVAILABLE: &str =
    "Hmm, I can't check your credits right now. Try again in a little while, okay? 😘";

pub const HISTORY_CLEARED: &str =
    "All forgotten... like we're talking for the very first time. Fresh start 😉";

pub const CLEAR_FAILED: &str =
    "Something went wrong on my side. Try again in a little while, okay? 😘";

pub const UNKNOWN_COMMAND: &str =
    "Hmm, I don't know that command. Just talk to me normally, I like it better that way 😉";

pub fn payment_received(balance: i64) -> String {
    format!("Thank you! Your credits are here. We now have {balance} more chances to talk... I'm so happy 🥰")
}

pub const DEV_ZEROED: &str = "DEV: Credits have been set to 0.";
pub const DEV_ZERO_FAILED: &str = "DEV: Failed to set credits to 0.";
pub const DEV_ADD_FAILED: &str = "DEV: Failed to add 10 credits.";

pub fn dev_added(amount: i64, balance: i64) -> String {
    format!("DEV: {amount} credits added. New balance: {balance}")
}
