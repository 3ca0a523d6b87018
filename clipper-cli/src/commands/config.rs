use std::fs;

use anyhow::{Context, Result};
use shared::config::ClientConfig;

/// Writes a default configuration file in the current directory.
///
/// # Arguments
/// * `format` - The format of the configuration file ("yaml" or "json").
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str) -> Result<()> {
    let rendered = ClientConfig::with_defaults().render(format)?;
    let file_name = format!("clipper.{format}");

    fs::write(&file_name, rendered.as_bytes())
        .with_context(|| format!("failed to write {file_name}"))?;

    println!("Configuration file '{file_name}' generated successfully.");
    Ok(())
}
