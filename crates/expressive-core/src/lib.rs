//! Expressive core - BDD suite declaration and execution engine
//!
//! Suites, cases, hooks and shared properties are declared with a
//! [`SuiteBuilder`] into a [`Registry`]. Declarations become blueprints in a
//! [`SpecTree`] arena; a [`Runner`] instantiates them fresh and runs them
//! sequentially, reporting progress to a [`Listener`].
//!
//! # Execution guarantees
//!
//! - Siblings never overlap; every hook, body and child run is awaited before
//!   the next one starts.
//! - `before` and `after` hooks cascade from the outermost enclosing suite to
//!   the innermost one, in that order for both kinds.
//! - A failing body, hook or construction is reported as an [`Event::Error`]
//!   and never stops the remaining siblings.
//! - There are no timeouts: a future that never resolves stalls the run.
//!
//! # Example
//!
//! ```
//! use expressive_core::{EventLog, PropertyValue, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .builder()
//!     .describe("arithmetic", |s| {
//!         s.property("x", PropertyValue::constant(2))?;
//!         s.it("adds", |ctx| async move {
//!             assert_eq!(*ctx.get::<i32>("x")? + 2, 4);
//!             Ok(())
//!         });
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let log = EventLog::new();
//! let mut runner = registry.runner();
//! futures_util::FutureExt::now_or_never(runner.run(&log)).unwrap();
//! assert!(runner.did_pass());
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod event;
pub mod hook;
pub mod registry;
pub mod runner;
pub mod spec;
pub mod suite;
pub mod unit;

pub use builder::SuiteBuilder;
pub use context::{Context, DescribedType, Description, PropertyOptions, PropertyValue};
pub use error::{DslError, PropertyError, TestError, TestResult};
pub use event::{ErrorSource, Event, EventKind, EventLog, Fanout, Listener};
pub use hook::HookKind;
pub use registry::Registry;
pub use runner::Runner;
pub use spec::{Site, SpecId, SpecTree, UnitSpec};
pub use suite::SuiteInstance;
pub use unit::{execute, finish, Body, CaseInstance, ContainerLink, ContainerRef, Outcome, Unit, UnitState};
