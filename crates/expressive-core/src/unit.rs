//! Unit - base abstraction for any runnable item

use crate::context::Context;
use crate::error::{TestError, TestResult};
use crate::event::{ErrorSource, Event, Listener};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

/// Test body or hook, invoked with the instance's context
pub type Body = Rc<dyn Fn(Context) -> LocalBoxFuture<'static, TestResult>>;

pub(crate) fn boxed_body<F, Fut>(body: F) -> Body
where
    F: Fn(Context) -> Fut + 'static,
    Fut: Future<Output = TestResult> + 'static,
{
    Rc::new(move |ctx| body(ctx).boxed_local())
}

/// Await a body or hook, converting a panic into a [`TestError::Panicked`]
pub(crate) async fn guarded<Fut>(future: Fut) -> TestResult
where
    Fut: Future<Output = TestResult>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(TestError::from_panic(payload)),
    }
}

/// Lifecycle state of a unit instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unrun,
    Running,
    Skipped,
    Succeeded,
    Failed,
}

/// Back-reference to an enclosing suite; never owns it
#[derive(Debug)]
pub struct ContainerLink {
    description: String,
    container: Option<ContainerRef>,
}

pub type ContainerRef = Rc<ContainerLink>;

impl ContainerLink {
    pub fn new(description: impl Into<String>, container: Option<ContainerRef>) -> ContainerRef {
        Rc::new(Self {
            description: description.into(),
            container,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn container(&self) -> Option<&ContainerRef> {
        self.container.as_ref()
    }

    pub fn full_description(&self) -> String {
        match &self.container {
            Some(container) => format!("{} {}", container.full_description(), self.description),
            None => self.description.clone(),
        }
    }

    /// Number of links up to and including this one
    pub fn depth(&self) -> usize {
        1 + self.container.as_ref().map_or(0, |c| c.depth())
    }
}

/// State shared by every unit implementation
#[derive(Debug)]
pub struct UnitState {
    description: String,
    container: Option<ContainerRef>,
    outcome: Outcome,
    pending: bool,
    completed: bool,
}

impl UnitState {
    pub fn new(description: impl Into<String>, container: Option<ContainerRef>) -> Self {
        Self {
            description: description.into(),
            container,
            outcome: Outcome::Unrun,
            pending: false,
            completed: false,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn container(&self) -> Option<&ContainerRef> {
        self.container.as_ref()
    }

    pub fn full_description(&self) -> String {
        match &self.container {
            Some(container) => format!("{} {}", container.full_description(), self.description),
            None => self.description.clone(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Whether `run()` has already been entered (or the unit was completed without running)
    pub fn has_run(&self) -> bool {
        self.outcome != Outcome::Unrun || self.completed
    }

    /// Returns true the first time only
    pub fn mark_completed(&mut self) -> bool {
        !std::mem::replace(&mut self.completed, true)
    }
}

/// A runnable item: a leaf test case or a suite
pub trait Unit {
    fn state(&self) -> &UnitState;

    fn state_mut(&mut self) -> &mut UnitState;

    /// The instance's attribute context, shared with hooks that run around it
    fn context(&self) -> &Context;

    /// Run the unit; never fails, failures surface as `error` events
    fn run<'a>(&'a mut self, listener: &'a dyn Listener) -> LocalBoxFuture<'a, ()>;

    /// Emit `completed` unless it was already emitted
    fn complete(&mut self, listener: &dyn Listener);

    fn description(&self) -> &str {
        self.state().description()
    }

    fn full_description(&self) -> String {
        self.state().full_description()
    }

    fn container(&self) -> Option<&ContainerRef> {
        self.state().container()
    }

    /// Number of enclosing suites
    fn depth(&self) -> usize {
        self.container().map_or(0, |c| c.depth())
    }

    fn outcome(&self) -> Outcome {
        self.state().outcome()
    }

    fn did_succeed(&self) -> bool {
        self.state().outcome() == Outcome::Succeeded
    }

    fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    fn set_pending(&mut self, pending: bool) {
        self.state_mut().set_pending(pending)
    }

    fn is_suite(&self) -> bool {
        false
    }
}

/// Emit `completed` for `unit` at most once
pub fn finish<U: Unit>(unit: &mut U, listener: &dyn Listener) {
    if unit.state_mut().mark_completed() {
        listener.on_event(&Event::Completed(&*unit));
    }
}

/// Leaf run semantics shared by [`CaseInstance`] and custom units
///
/// Pending units emit `skipped` and never invoke `body`. Otherwise `started`
/// is emitted, `body` is awaited with the unit's context, a failure or panic is
/// reported as an `error` event, and `completed` is emitted once.
pub async fn execute<U, F, Fut>(unit: &mut U, listener: &dyn Listener, body: F)
where
    U: Unit,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = TestResult>,
{
    if unit.state().has_run() {
        tracing::warn!(unit = %unit.full_description(), "unit already ran, ignoring");
        return;
    }

    if unit.is_pending() {
        tracing::debug!(unit = %unit.full_description(), "skipping pending unit");
        unit.state_mut().set_outcome(Outcome::Skipped);
        listener.on_event(&Event::Skipped(&*unit));
        return;
    }

    tracing::debug!(unit = %unit.full_description(), "running unit");
    unit.state_mut().set_outcome(Outcome::Running);
    listener.on_event(&Event::Started(&*unit));

    let ctx = unit.context().clone();
    match guarded(async move { body(ctx).await }).await {
        Ok(()) => unit.state_mut().set_outcome(Outcome::Succeeded),
        Err(error) => {
            tracing::debug!(unit = %unit.full_description(), %error, "unit failed");
            unit.state_mut().set_outcome(Outcome::Failed);
            listener.on_event(&Event::Error {
                source: ErrorSource::Unit(&*unit),
                error: &error,
            });
        }
    }

    finish(unit, listener);
}

/// Instance of a declared test case
pub struct CaseInstance {
    state: UnitState,
    context: Context,
    body: Option<Body>,
}

impl CaseInstance {
    /// A case without a body is always pending
    pub fn new(
        description: impl Into<String>,
        body: Option<Body>,
        pending: bool,
        container: Option<ContainerRef>,
        context: Context,
    ) -> Self {
        let mut state = UnitState::new(description, container);
        state.set_pending(pending || body.is_none());
        Self {
            state,
            context,
            body,
        }
    }
}

impl Unit for CaseInstance {
    fn state(&self) -> &UnitState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut UnitState {
        &mut self.state
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn run<'a>(&'a mut self, listener: &'a dyn Listener) -> LocalBoxFuture<'a, ()> {
        let body = self.body.clone();
        execute(self, listener, move |ctx| async move {
            match body {
                Some(body) => body(ctx).await,
                None => Ok(()),
            }
        })
        .boxed_local()
    }

    fn complete(&mut self, listener: &dyn Listener) {
        finish(self, listener)
    }
}
