//! Spec reporter - live progress and final summary

use colored::{Color, Colorize};
use expressive_core::{Event, Listener, Unit};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::time::{Duration, Instant};

const SUCCESS_MARK: &str = "✓";
const FAILURE_MARK: &str = "✖";
const SKIPPED_MARK: &str = "-";

/// Pass/pending/fail counts over test cases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub passed: usize,
    pub pending: usize,
    pub failed: usize,
}

/// An error event kept for the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub description: String,
    pub message: String,
}

/// Machine-readable run summary
#[derive(Debug, Serialize)]
pub struct Summary {
    #[serde(flatten)]
    pub stats: Stats,
    pub errors: Vec<ReportedError>,
    pub duration_ms: u64,
    pub ok: bool,
}

/// Listener that prints progress as units run and a summary at the end
pub struct Reporter<W: Write> {
    out: RefCell<W>,
    color: bool,
    json: bool,
    quiet: bool,
    stats: RefCell<Stats>,
    ok: Cell<bool>,
    errors: RefCell<Vec<ReportedError>>,
    /// First failed progress write, surfaced by `finish`
    write_error: RefCell<Option<io::Error>>,
    started_at: Instant,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            color: true,
            json: false,
            quiet: false,
            stats: RefCell::new(Stats::default()),
            ok: Cell::new(true),
            errors: RefCell::new(Vec::new()),
            write_error: RefCell::new(None),
            started_at: Instant::now(),
        }
    }

    /// Enable or disable ANSI colors
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Replace the text report with a JSON summary
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Suppress per-test progress lines
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn stats(&self) -> Stats {
        *self.stats.borrow()
    }

    pub fn errors(&self) -> Vec<ReportedError> {
        self.errors.borrow().clone()
    }

    /// No failing unit and no error events so far
    pub fn is_ok(&self) -> bool {
        self.ok.get() && self.errors.borrow().is_empty()
    }

    /// Write the final report
    ///
    /// Fails with the first progress write error if one occurred earlier.
    pub fn finish(&self) -> io::Result<()> {
        let elapsed = self.started_at.elapsed();
        let written = if self.json {
            self.write_json(elapsed)
        } else {
            self.write_summary(elapsed)
        };
        match self.write_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => written,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn unit_started(&self, unit: &dyn Unit) {
        if !unit.is_suite() || self.progress_hidden() {
            return;
        }
        let line = if unit.container().is_some() {
            format!("{}{}", indent(unit), unit.description())
        } else {
            format!("\n{}", unit.description())
        };
        self.write_line(&line);
    }

    fn unit_finished(&self, unit: &dyn Unit) {
        self.record(unit);
        if unit.is_suite() || self.progress_hidden() {
            return;
        }
        let line = if unit.did_succeed() {
            format!(
                "{}{} {}",
                indent(unit),
                self.paint(SUCCESS_MARK, Color::Green),
                self.paint(unit.description(), Color::BrightBlack)
            )
        } else if unit.is_pending() {
            format!(
                "{}{} {}",
                indent(unit),
                self.paint(SKIPPED_MARK, Color::Yellow),
                self.paint(unit.description(), Color::Yellow)
            )
        } else {
            format!(
                "{}{} {}",
                indent(unit),
                self.paint(FAILURE_MARK, Color::Red),
                self.paint(unit.description(), Color::Red)
            )
        };
        self.write_line(&line);
    }

    fn record(&self, unit: &dyn Unit) {
        let mut stats = self.stats.borrow_mut();
        if unit.did_succeed() {
            if !unit.is_suite() {
                stats.passed += 1;
            }
        } else if unit.is_pending() {
            if !unit.is_suite() {
                stats.pending += 1;
            }
        } else {
            self.ok.set(false);
            if !unit.is_suite() {
                stats.failed += 1;
            }
        }
    }

    fn progress_hidden(&self) -> bool {
        self.quiet || self.json
    }

    fn totals(&self) -> String {
        let Stats {
            passed,
            pending,
            failed,
        } = self.stats();
        if failed > 0 && pending == 0 {
            format!("{passed} passing, {failed} failing")
        } else if failed > 0 {
            format!("{passed} passing, {pending} pending, {failed} failing")
        } else {
            format!("{passed} passing")
        }
    }

    fn write_summary(&self, elapsed: Duration) -> io::Result<()> {
        let mut report = String::new();

        for (index, error) in self.errors.borrow().iter().enumerate() {
            report.push_str(&format!("\n{}) {}\n", index + 1, error.description));
            report.push_str(&format!("\n    {}\n", self.paint(&error.message, Color::Red)));
        }

        report.push_str("\n\n");
        if self.is_ok() {
            report.push_str(&self.paint(&self.totals(), Color::Green));
            let pending = self.stats().pending;
            if pending > 0 {
                report.push_str(", ");
                report.push_str(&self.paint(&format!("{pending} pending"), Color::Yellow));
            }
        } else {
            report.push_str(&self.paint(&self.totals(), Color::Red));
        }
        report.push(' ');
        report.push_str(&self.paint(&format!("({} ms)", elapsed.as_millis()), Color::BrightBlack));
        report.push_str("\n\n");

        let mut out = self.out.borrow_mut();
        out.write_all(report.as_bytes())?;
        out.flush()
    }

    fn write_json(&self, elapsed: Duration) -> io::Result<()> {
        let summary = Summary {
            stats: self.stats(),
            errors: self.errors(),
            duration_ms: elapsed.as_millis() as u64,
            ok: self.is_ok(),
        };

        let mut out = self.out.borrow_mut();
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
        out.flush()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.borrow_mut();
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(%err, "failed to write progress");
            let mut first = self.write_error.borrow_mut();
            if first.is_none() {
                *first = Some(err);
            }
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> Listener for Reporter<W> {
    fn on_event(&self, event: &Event<'_>) {
        match event {
            Event::Created(_) => {}
            Event::Started(unit) => self.unit_started(*unit),
            Event::Completed(unit) | Event::Skipped(unit) => self.unit_finished(*unit),
            Event::Error { source, error } => {
                self.errors.borrow_mut().push(ReportedError {
                    description: source.full_description(),
                    message: error.to_string(),
                });
            }
        }
    }
}

/// Two spaces per enclosing suite
fn indent(unit: &dyn Unit) -> String {
    "  ".repeat(unit.depth())
}
