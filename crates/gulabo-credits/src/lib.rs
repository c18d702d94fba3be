// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit accounting for the Gulabo bot backend.
//!
//! This crate provides:
//! - **Ledger**: the SQLite-backed [`CreditLedger`](gulabo_core::CreditLedger),
//!   every mutation a single atomic statement
//! - **Tiers**: the compiled-in recharge catalog mapping payload tokens to credits

pub mod ledger;
pub mod tiers;

pub use ledger::SqliteCreditLedger;
pub use tiers::{tier_for_payload, RechargeTier, CURRENCY, TIERS};
