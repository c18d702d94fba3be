// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command recognition.

use gulabo_core::types::BotCommandInfo;

/// A slash command recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Recharge,
    Credits,
    Clear,
    DevNoCredits,
    DevSetZeroCredits,
    DevAddCredits,
    /// Anything else starting with `/`.
    Unknown,
}

impl Command {
    /// Parses `text` as a command.
    ///
    /// Returns `None` when the text is not a command at all. Development
    /// commands are only recognized when `production` is false.
    pub fn parse(text: &str, production: bool) -> Option<Self> {
        let token = text.trim_start().split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(n, _bot)| n);

        let command = match name {
            "start" | "help" => Command::Help,
            "recharge" => Command::Recharge,
            "credits" => Command::Credits,
            "clear" => Command::Clear,
            "dev_no_credits" if !production => Command::DevNoCredits,
            "dev_set_zero_credits" if !production => Command::DevSetZeroCredits,
            "dev_add_10_credits" if !production => Command::DevAddCredits,
            _ => Command::Unknown,
        };
        Some(command)
    }

    pub fn is_dev(self) -> bool {
        matches!(
            self,
            Command::DevNoCredits | Command::DevSetZeroCredits | Command::DevAddCredits
        )
    }
}

/// Credits granted by `/dev_add_10_credits`.
pub const DEV_TOP_UP: i64 = 10;

const PUBLIC_MENU: &[(&str, &str)] = &[
    ("help", "How to talk to me"),
    ("recharge", "Buy more credits"),
    ("credits", "Check your credit balance"),
    ("clear", "Clear chat history and start fresh"),
];

const DEV_MENU: &[(&str, &str)] = &[
    ("dev_no_credits", "Show the out-of-credits offer"),
    ("dev_set_zero_credits", "Set your balance to zero"),
    ("dev_add_10_credits", "Add 10 credits"),
];

/// The public command menu.
pub fn public_commands() -> Vec<BotCommandInfo> {
    menu_entries(PUBLIC_MENU).collect()
}

/// The menu registered with the transport at startup: the public commands,
/// followed by the development commands outside production.
pub fn command_menu(production: bool) -> Vec<BotCommandInfo> {
    let dev: &[(&str, &str)] = if production { &[] } else { DEV_MENU };
    menu_entries(PUBLIC_MENU).chain(menu_entries(dev)).collect()
}

fn menu_entries(
    entries: &'static [(&'static str, &'static str)],
) -> impl Iterator<Item = BotCommandInfo> {
    entries.iter().map(|(command, description)| BotCommandInfo {
        command: command.to_string(),
        description: description.to_string(),
    })
}
