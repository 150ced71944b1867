//! Pagediff CLI Library
//!
//! Command-line front end for the Pagediff comparison engine.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{AuditArgs, Cli, ColorArg, Commands, CompareArgs, ConfigArgs, FormatArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{format_psnr, render_analysis, render_report, OutputFormat, ProgressReporter};
