// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound keyboards, invoice prices and command menus.

use gulabo_core::types::{BotCommandInfo, Invoice, OfferButton};
use teloxide::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, LabeledPrice};

/// One callback button per row.
pub fn offer_keyboard(buttons: &[OfferButton]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.payload.clone())]),
    )
}

/// A single price line covering the whole invoice.
pub fn invoice_prices(invoice: &Invoice) -> Vec<LabeledPrice> {
    vec![LabeledPrice::new(invoice.title.clone(), invoice.amount)]
}

pub fn bot_commands(commands: &[BotCommandInfo]) -> Vec<BotCommand> {
    commands
        .iter()
        .map(|c| BotCommand::new(c.command.trim_start_matches('/'), c.description.clone()))
        .collect()
}
