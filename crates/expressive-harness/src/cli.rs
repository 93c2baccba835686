//! Command-line arguments of spec binaries

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Run the spec files compiled into this binary.
///
/// ENVIRONMENT VARIABLES:
///     EXPRESSIVE_NO_COLOR  Set to disable colored output (NO_COLOR also works)
///     EXPRESSIVE_JSON      Set to '1' for a JSON summary by default
///     EXPRESSIVE_LOG       Tracing filter, e.g. 'expressive_core=debug'
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "expressive")]
#[command(ignore_errors = true)]
pub struct HarnessArgs {
    /// Spec files or directories to run (defaults to all)
    pub sources: Vec<PathBuf>,
    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
    /// Print a JSON summary instead of the text report
    #[arg(long)]
    pub json: bool,
    /// Only print failures and totals
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl HarnessArgs {
    /// Parse arguments, tolerating flags meant for other test harnesses
    pub fn from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).unwrap_or_else(|err| {
            tracing::debug!(%err, "falling back to default arguments");
            Self::default()
        })
    }
}
