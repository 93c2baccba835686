//! Suite builder - the declarative DSL
//!
//! A [`SuiteBuilder`] keeps the stack of suites currently being declared, so
//! nested declaration calls resolve their enclosing suite implicitly:
//!
//! ```
//! use expressive_core::{PropertyValue, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .builder()
//!     .describe("Stack", |s| {
//!         s.property("empty", PropertyValue::generator(|_| Vec::<i32>::new()))?;
//!         s.it("starts empty", |ctx| async move {
//!             assert!(ctx.get::<Vec<i32>>("empty")?.is_empty());
//!             Ok(())
//!         });
//!         s.describe("when pushed", |s| {
//!             s.it_pending("grows");
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(registry.tests().len(), 1);
//! ```
//!
//! The builder borrows the registry mutably, so declaration can never overlap
//! with a run.

use crate::context::{Context, DescribedType, Description, PropertyOptions, PropertyValue};
use crate::error::{DslError, TestResult};
use crate::hook::HookKind;
use crate::registry::Registry;
use crate::spec::{SpecId, SuiteNode, UnitSpec};
use crate::unit::{boxed_body, Body};
use std::future::Future;
use std::rc::Rc;

pub struct SuiteBuilder<'r> {
    registry: &'r mut Registry,
    stack: Vec<SpecId>,
}

impl<'r> SuiteBuilder<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            stack: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Suite currently being declared
    pub fn current(&self) -> Option<SpecId> {
        self.stack.last().copied()
    }

    /// Declare a suite
    ///
    /// `body` runs with this builder while the new suite is innermost. With no
    /// enclosing suite the result is registered at the top level, otherwise it
    /// is appended to the enclosing suite's children.
    pub fn describe<D, F>(&mut self, what: D, body: F) -> Result<SpecId, DslError>
    where
        D: Into<Description>,
        F: FnOnce(&mut Self) -> Result<(), DslError>,
    {
        let description = what.into();
        let parent = self.current();
        tracing::trace!(suite = description.text(), "declaring suite");

        let id = self.registry.tree_mut().add_suite(parent, description);
        self.stack.push(id);
        let result = body(self);
        self.stack.pop();
        result?;

        match parent {
            Some(parent) => self.registry.tree_mut().attach(parent, id),
            None => self.registry.add(id),
        }
        Ok(id)
    }

    /// Alias of [`describe`](Self::describe)
    pub fn context<D, F>(&mut self, what: D, body: F) -> Result<SpecId, DslError>
    where
        D: Into<Description>,
        F: FnOnce(&mut Self) -> Result<(), DslError>,
    {
        self.describe(what, body)
    }

    /// Declare a suite about `T`; its instances can look `T` up through
    /// [`Context::described_type`]
    pub fn describe_type<T: 'static>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), DslError>,
    ) -> Result<SpecId, DslError> {
        self.describe(DescribedType::of::<T>(), body)
    }

    /// Declare a test case
    ///
    /// Outside of any suite the case is created but not attached anywhere.
    pub fn it<F, Fut>(&mut self, description: impl Into<String>, body: F) -> SpecId
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.declare_case(description.into(), Some(boxed_body(body)), false)
    }

    /// Declare a pending case with no body
    pub fn it_pending(&mut self, description: impl Into<String>) -> SpecId {
        self.declare_case(description.into(), None, false)
    }

    /// Declare a case that is pending despite having a body
    pub fn xit<F, Fut>(&mut self, description: impl Into<String>, body: F) -> SpecId
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.declare_case(description.into(), Some(boxed_body(body)), true)
    }

    /// Add a hand-written blueprint to the enclosing suite
    pub fn unit<S: UnitSpec + 'static>(&mut self, spec: S) -> SpecId {
        let parent = self.current();
        let id = self.registry.tree_mut().add_custom(parent, Rc::new(spec));
        if let Some(parent) = parent {
            self.registry.tree_mut().attach(parent, id);
        }
        id
    }

    /// Define a memoized (generators) or constant attribute on the innermost suite
    pub fn property(&mut self, name: &str, value: PropertyValue) -> Result<(), DslError> {
        self.property_with(name, value, PropertyOptions::default())
    }

    pub fn property_with(
        &mut self,
        name: &str,
        value: PropertyValue,
        options: PropertyOptions,
    ) -> Result<(), DslError> {
        tracing::trace!(property = name, memoize = options.memoize, "declaring property");
        self.enclosing("property")?
            .properties_mut()
            .define(name, value, options);
        Ok(())
    }

    /// Run before every test nested at or below the innermost suite
    pub fn before<F, Fut>(&mut self, hook: F) -> Result<(), DslError>
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.hook(HookKind::Before, boxed_body(hook))
    }

    /// Run after every test nested at or below the innermost suite
    pub fn after<F, Fut>(&mut self, hook: F) -> Result<(), DslError>
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.hook(HookKind::After, boxed_body(hook))
    }

    /// Run once when the innermost suite starts
    pub fn before_all<F, Fut>(&mut self, hook: F) -> Result<(), DslError>
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.hook(HookKind::BeforeAll, boxed_body(hook))
    }

    /// Run once when the innermost suite ends
    pub fn after_all<F, Fut>(&mut self, hook: F) -> Result<(), DslError>
    where
        F: Fn(Context) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.hook(HookKind::AfterAll, boxed_body(hook))
    }

    pub fn hook(&mut self, kind: HookKind, hook: Body) -> Result<(), DslError> {
        self.enclosing(kind.name())?.hooks_mut().push(kind, hook);
        Ok(())
    }

    /// Registry-level hook run once before anything else
    pub fn before_anything<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.registry.before_anything(hook)
    }

    /// Registry-level hook run once after everything else
    pub fn after_everything<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.registry.after_everything(hook)
    }

    fn declare_case(&mut self, description: String, body: Option<Body>, pending: bool) -> SpecId {
        let parent = self.current();
        let id = self
            .registry
            .tree_mut()
            .add_case(parent, description, body, pending);
        if let Some(parent) = parent {
            self.registry.tree_mut().attach(parent, id);
        }
        id
    }

    fn enclosing(&mut self, call: &'static str) -> Result<&mut SuiteNode, DslError> {
        let id = self.current().ok_or(DslError::NoEnclosingSuite { call })?;
        self.registry
            .tree_mut()
            .suite_mut(id)
            .ok_or(DslError::NoEnclosingSuite { call })
    }
}
