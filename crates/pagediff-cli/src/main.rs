//! Pagediff CLI: compare rendered web pages
//!
//! ## Usage
//!
//! ```bash
//! pagediff compare before.png after.png                  # Visual diff
//! pagediff compare before.png after.png \
//!     --reference-markup before.html --candidate-markup after.html --format json
//! pagediff audit page.html                               # WCAG report for one page
//! pagediff config > pagediff.yaml                        # Default configuration
//! ```

use clap::Parser;
use pagediff_cli::{
    handlers::{execute_audit, execute_compare, execute_config},
    init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    let use_color = config.use_color();
    console::set_colors_enabled(use_color);
    console::set_colors_enabled_stderr(use_color);
    init_logging(config.verbosity, config.log_json)?;

    match cli.command {
        Commands::Compare(args) => execute_compare(&config, &args),
        Commands::Audit(args) => execute_audit(&config, &args),
        Commands::Config(args) => execute_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(ColorChoice::from(cli.color))
        .with_log_json(cli.log_json)
}
