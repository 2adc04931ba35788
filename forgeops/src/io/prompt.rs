//! Reading secret values from the operator.

use anyhow::{Context, Result};
use dialoguer::Password;

/// Source of secret values, keyed by secret name.
pub trait SecretSource {
    fn read(&mut self, name: &str) -> Result<String>;
}

/// Masked interactive prompt on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl SecretSource for TerminalPrompt {
    fn read(&mut self, name: &str) -> Result<String> {
        let value = Password::new()
            .with_prompt(format!("{name} ({})", describe(name)))
            .allow_empty_password(true)
            .interact()
            .with_context(|| format!("read value for {name}"))?;
        Ok(value.trim().to_string())
    }
}

/// Hint shown next to the well-known deployment secrets.
pub fn describe(name: &str) -> &'static str {
    match name {
        "PRIVATE_KEY" => "SSH private key",
        "SERVER_ADDRESS" => "server IP/hostname",
        "SERVER_USERNAME" => "SSH username",
        "SERVER_PATH" => "deployment path",
        _ => "secret value",
    }
}
