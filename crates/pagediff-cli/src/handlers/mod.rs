//! Command handlers - extracted from main.rs for testability

pub mod audit;
pub mod compare;
pub mod config;

pub use audit::execute_audit;
pub use compare::execute_compare;
pub use config::execute_config;

use crate::error::CliResult;
use pagediff::{AnalysisConfig, PageDiffResult};
use std::path::Path;

/// Load a configuration file, or the defaults when none is given
pub fn load_analysis_config(path: Option<&Path>) -> PageDiffResult<AnalysisConfig> {
    path.map_or_else(|| Ok(AnalysisConfig::default()), AnalysisConfig::load)
}

/// Write rendered output to a file, or stdout when no file is given
pub fn emit(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => {
            let mut contents = text.to_string();
            if !contents.ends_with('\n') {
                contents.push('\n');
            }
            std::fs::write(path, contents)?;
        }
        None if text.ends_with('\n') => print!("{text}"),
        None => println!("{text}"),
    }
    Ok(())
}
