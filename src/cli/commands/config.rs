//! `lexrag config show`

use anyhow::{Context, Result};

use crate::domain::models::Config;

/// Print the effective configuration, API keys redacted.
pub fn handle_show(config: &Config, json: bool) -> Result<()> {
    let redacted = config.redacted();
    if json {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
    } else {
        let yaml = serde_yaml::to_string(&redacted).context("Failed to render configuration")?;
        print!("{yaml}");
    }
    Ok(())
}
