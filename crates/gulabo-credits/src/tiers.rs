// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recharge tier catalog.
//!
//! Prices are in Telegram Stars. The payload token is the only state carried
//! through the payment round trip; credit amounts are always looked up here,
//! never taken from the payment event.

/// Currency code for Telegram Stars.
pub const CURRENCY: &str = "XTR";

/// One fixed recharge option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RechargeTier {
    /// Token set as the invoice payload and the button's callback data.
    pub payload: &'static str,
    /// Credits granted on confirmed payment.
    pub credits: i64,
    /// Price in Stars.
    pub price: u32,
    /// Button label shown in the recharge offer.
    pub label: &'static str,
}

/// All tiers, in the order they are offered.
pub const TIERS: [RechargeTier; 3] = [
    RechargeTier {
        payload: "recharge_50",
        credits: 50,
        price: 100,
        label: "💋 50 Credits (100 Stars)",
    },
    RechargeTier {
        payload: "recharge_125",
        credits: 125,
        price: 200,
        label: "💖 125 Credits (200 Stars) - 20% Bonus",
    },
    RechargeTier {
        payload: "recharge_300",
        credits: 300,
        price: 450,
        label: "🔥 300 Credits (450 Stars) - 33% Bonus",
    },
];

/// Look up the tier for a payload token.
pub fn tier_for_payload(payload: &str) -> Option<&'static RechargeTier> {
    TIERS.iter().find(|t| t.payload == payload)
}
