//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pagediff: compare two rendered web pages and their accessibility
#[derive(Parser, Debug)]
#[command(name = "pagediff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log events as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a reference and a candidate page
    Compare(CompareArgs),

    /// Score a single page against the WCAG rule set
    Audit(AuditArgs),

    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the compare command
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Screenshot of the reference page (PNG or JPEG)
    pub reference: PathBuf,

    /// Screenshot of the candidate page (PNG or JPEG)
    pub candidate: PathBuf,

    /// HTML or JSON DOM snapshot of the reference page
    #[arg(long)]
    pub reference_markup: Option<PathBuf>,

    /// HTML or JSON DOM snapshot of the candidate page
    #[arg(long)]
    pub candidate_markup: Option<PathBuf>,

    /// Pick up markup from `.html` or `.json` files next to each image
    #[arg(long, conflicts_with_all = ["reference_markup", "candidate_markup"])]
    pub sibling_markup: bool,

    /// Capture timeout in milliseconds when using --sibling-markup
    #[arg(long, default_value = "30000")]
    pub timeout_ms: u64,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Resize both images to the smaller common size instead of rejecting a mismatch
    #[arg(long)]
    pub resize: bool,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the audit command
#[derive(Parser, Debug)]
pub struct AuditArgs {
    /// HTML or JSON DOM snapshot to audit
    pub markup: PathBuf,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Load and validate this file instead of printing the defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
