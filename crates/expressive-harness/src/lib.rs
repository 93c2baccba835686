//! Expressive harness - entry point for spec binaries
//!
//! A spec binary is an integration test target with `harness = false` whose
//! `main` hands its spec files to [`main`]:
//!
//! ```no_run
//! use expressive_core::{DslError, SuiteBuilder};
//! use expressive_harness::spec_file;
//!
//! fn declare(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
//!     s.describe("arithmetic", |s| {
//!         s.it("adds", |_| async {
//!             assert_eq!(2 + 2, 4);
//!             Ok(())
//!         });
//!         Ok(())
//!     })?;
//!     Ok(())
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     expressive_harness::main(&[spec_file!(declare)])
//! }
//! ```

pub mod cli;
pub mod config;
pub mod loader;
pub mod reporter;

pub use cli::HarnessArgs;
pub use config::Config;
pub use loader::{DeclareFn, LoadError, Loader, SpecFile};
pub use reporter::{ReportedError, Reporter, Stats, Summary};

use anyhow::{Context as _, Result};
use expressive_core::Registry;
use std::future::Future;
use std::io::Write;
use std::process::ExitCode;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

/// Load, run and report `files`; the exit code reflects the overall result
pub fn main(files: &[SpecFile]) -> ExitCode {
    let args = HarnessArgs::from_args(std::env::args_os());
    let config = Config::from_env();
    init_logging(&config.log_filter);

    match run(files, &args, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Declare the selected files into the global registry and run them
///
/// Returns whether the run passed.
pub fn run(files: &[SpecFile], args: &HarnessArgs, config: &Config) -> Result<bool> {
    let loader = Loader::new(args.sources.clone());
    let loaded = Registry::with_global(|registry| loader.load(files, registry))?;
    tracing::debug!(loaded, "spec files loaded");

    let registry = Registry::take_global();
    let reporter = Reporter::stdout()
        .with_color(!(args.no_color || config.no_color))
        .with_json(args.json || config.json)
        .with_quiet(args.quiet);

    block_on(execute(&registry, &reporter))?
}

/// Run setup, every top-level spec and teardown, then write the report
///
/// A failing `before_anything` hook skips the specs; teardown still runs.
pub async fn execute<W: Write>(registry: &Registry, reporter: &Reporter<W>) -> Result<bool> {
    let setup = registry.setup().await;
    let passed = match &setup {
        Ok(()) => {
            let mut runner = registry.runner();
            runner.run(reporter).await;
            runner.did_pass()
        }
        Err(err) => {
            tracing::error!(%err, "before_anything hook failed, skipping specs");
            false
        }
    };

    let teardown = registry.teardown().await;
    if let Err(err) = &teardown {
        tracing::error!(%err, "after_everything hook failed");
    }

    reporter.finish().context("failed to write report")?;
    Ok(passed && setup.is_ok() && teardown.is_ok() && reporter.is_ok())
}

/// Drive a `!Send` future to completion on a current-thread runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let local_set = LocalSet::new();
    Ok(runtime.block_on(local_set.run_until(future)))
}

/// Install the stderr log subscriber; later calls are no-ops
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("warning: invalid log filter '{filter}': {err}");
        EnvFilter::new(config::DEFAULT_LOG_FILTER)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
