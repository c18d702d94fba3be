// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Gulabo bot backend.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides (prefixed and legacy
//! unprefixed keys), and diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use gulabo_config::load_and_validate;
//!
//! let config = load_and_validate(None).expect("config errors");
//! println!("Bot name: {}", config.agent.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::GulaboConfig;

/// Load configuration and validate it.
///
/// With `explicit` set, that file takes the place of `./gulabo.toml` in the
/// hierarchy. On a Figment error the TOML sources are re-read so diagnostics
/// can point into them.
pub fn load_and_validate(explicit: Option<&Path>) -> Result<GulaboConfig, Vec<ConfigError>> {
    let loaded = match explicit {
        Some(path) => loader::load_config_from_path(path),
        None => loader::load_config(),
    };
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources(explicit);
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<GulaboConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources(explicit: Option<&Path>) -> Vec<(String, String)> {
    let mut sources = Vec::new();

    let local = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(loader::LOCAL_CONFIG).to_path_buf());
    if let Ok(content) = std::fs::read_to_string(&local) {
        let path = if local.is_absolute() {
            local.display().to_string()
        } else {
            std::env::current_dir()
                .map(|d| d.join(&local).display().to_string())
                .unwrap_or_else(|_| local.display().to_string())
        };
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path()
        && let Ok(content) = std::fs::read_to_string(&path)
    {
        sources.push((path.display().to_string(), content));
    }

    let system_path = Path::new(loader::SYSTEM_CONFIG);
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}
