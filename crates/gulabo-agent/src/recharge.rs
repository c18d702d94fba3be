// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment/recharge flow.
//!
//! Offer shown → invoice sent → pre-checkout approved → payment confirmed.
//! The tier payload is the only state carried through the payment rails;
//! the credit amount is always looked up from it, never from the amount paid.

use std::sync::Arc;

use gulabo_core::types::{
    CallbackQuery, ChatId, Invoice, OfferButton, PaymentCredit, PaymentEvent, PreCheckoutQuery,
};
use gulabo_core::{CreditLedger, GulaboError, Transport};
use gulabo_credits::{tier_for_payload, RechargeTier, CURRENCY, TIERS};
use tracing::{error, info, warn};

use crate::replies;

/// Price of every invoice outside production.
const TEST_INVOICE_AMOUNT: u32 = 1;

/// What a recharge step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RechargeOutcome {
    InvoiceSent,
    /// Callback data matched no tier.
    UnknownTier,
    CheckoutAnswered,
    Credited { balance: i64 },
    /// The charge id was already processed.
    AlreadyCredited { balance: i64 },
    /// Payment payload matched no tier; nothing credited.
    UnknownPayload,
    /// The ledger rejected the credit; the user was not credited.
    CreditFailed,
}

pub struct RechargeFlow {
    transport: Arc<dyn Transport>,
    ledger: Arc<dyn CreditLedger>,
    production: bool,
}

impl RechargeFlow {
    pub fn new(
        transport: Arc<dyn Transport>,
        ledger: Arc<dyn CreditLedger>,
        production: bool,
    ) -> Self {
        Self {
            transport,
            ledger,
            production,
        }
    }

    /// Sends `intro` with one button per tier.
    pub async fn send_offer(&self, chat: ChatId, intro: &str) -> Result<(), GulaboError> {
        info!(chat_id = %chat, "sending recharge options");
        self.transport
            .send_offer(chat, intro, &offer_buttons())
            .await?;
        Ok(())
    }

    /// Acknowledges the press, then sends the invoice for the chosen tier.
    pub async fn handle_callback(&self, query: &CallbackQuery) -> RechargeOutcome {
        info!(
            user_id = %query.sender.id,
            data = query.data.as_deref().unwrap_or(""),
            "received callback query"
        );
        if let Err(e) = self.transport.answer_callback(&query.id).await {
            error!(error = %e, "failed to acknowledge callback query");
        }

        let Some(tier) = query.data.as_deref().and_then(tier_for_payload) else {
            return RechargeOutcome::UnknownTier;
        };

        let invoice = invoice_for(tier, self.production);
        info!(
            chat_id = %query.chat_id,
            payload = invoice.payload.as_str(),
            amount = invoice.amount,
            "sending invoice"
        );
        if let Err(e) = self.transport.send_invoice(query.chat_id, &invoice).await {
            error!(error = %e, "failed to send recharge invoice");
        }
        RechargeOutcome::InvoiceSent
    }

    /// Approves every pre-checkout query.
    pub async fn handle_pre_checkout(&self, query: &PreCheckoutQuery) -> RechargeOutcome {
        if tier_for_payload(&query.payload).is_none() {
            warn!(payload = query.payload.as_str(), "pre-checkout for unknown payload");
        }
        if let Err(e) = self.transport.answer_pre_checkout(&query.id, true).await {
            error!(error = %e, "failed to answer pre-checkout query");
        }
        RechargeOutcome::CheckoutAnswered
    }

    /// Credits the tier behind the payment payload, once per charge id.
    pub async fn handle_payment(&self, event: &PaymentEvent) -> RechargeOutcome {
        let user = event.sender.id;
        let payment = &event.payment;
        info!(
            user_id = %user,
            invoice_payload = payment.payload.as_str(),
            total_amount = payment.total_amount,
            "successful payment received"
        );

        let Some(tier) = tier_for_payload(&payment.payload) else {
            error!(
                user_id = %user,
                invoice_payload = payment.payload.as_str(),
                "unknown or unsupported invoice payload received"
            );
            return RechargeOutcome::UnknownPayload;
        };

        let balance = match self
            .ledger
            .credit_payment(user, &payment.charge_id, tier.credits)
            .await
        {
            Ok(PaymentCredit::Applied { balance }) => balance,
            Ok(PaymentCredit::Duplicate { balance }) => {
                warn!(
                    user_id = %user,
                    charge_id = payment.charge_id.as_str(),
                    "payment already credited, ignoring redelivery"
                );
                return RechargeOutcome::AlreadyCredited { balance };
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to add user credits after payment");
                return RechargeOutcome::CreditFailed;
            }
        };

        metrics::counter!("gulabo_recharge_credited_total").increment(tier.credits as u64);
        if let Err(e) = self
            .transport
            .send_text(event.chat_id, &replies::payment_received(balance))
            .await
        {
            error!(error = %e, "failed to send payment confirmation message");
        }
        RechargeOutcome::Credited { balance }
    }
}

pub fn offer_buttons() -> Vec<OfferButton> {
    TIERS
        .iter()
        .map(|tier| OfferButton {
            label: tier.label.to_string(),
            payload: tier.payload.to_string(),
        })
        .collect()
}

/// Builds the invoice for `tier`.
///
/// Outside production the invoice costs one Star and is marked as a test,
/// but keeps the real payload so confirmation credits the real tier.
pub fn invoice_for(tier: &RechargeTier, production: bool) -> Invoice {
    let title = format!("{} Credits", tier.credits);
    let description = format!("Get {} message credits to keep talking with Gulabo.", tier.credits);
    if production {
        Invoice {
            title,
            description,
            payload: tier.payload.to_string(),
            currency: CURRENCY.to_string(),
            amount: tier.price,
        }
    } else {
        Invoice {
            title: format!("{title} (Test)"),
            description,
            payload: tier.payload.to_string(),
            currency: CURRENCY.to_string(),
            amount: TEST_INVOICE_AMOUNT,
        }
    }
}
