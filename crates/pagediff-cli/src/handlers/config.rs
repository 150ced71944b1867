//! Config command handler

use super::load_analysis_config;
use crate::error::CliResult;
use crate::ConfigArgs;

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    print!("{}", render_config(args)?);
    Ok(())
}

/// Effective configuration as YAML
pub fn render_config(args: &ConfigArgs) -> CliResult<String> {
    let config = load_analysis_config(args.config.as_deref())?;
    Ok(config.to_yaml()?)
}
