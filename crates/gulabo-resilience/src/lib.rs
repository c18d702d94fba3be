// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives shared by every hosted-provider client.
//!
//! - [`PermitPool`]: bounded concurrency per provider
//! - [`RetryPolicy`]: bounded attempts with doubling backoff
//! - [`ProviderGate`]: both combined, holding a permit only while a call is in flight
//!
//! All waits observe the caller's `CancellationToken` and surface
//! [`GulaboError::Cancelled`](gulabo_core::GulaboError::Cancelled) immediately.

pub mod gate;
pub mod permit;
pub mod retry;

pub use gate::ProviderGate;
pub use permit::PermitPool;
pub use retry::RetryPolicy;
