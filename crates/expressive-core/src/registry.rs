//! Registry - top-level specs and run-wide hooks
//!
//! Spec files declare into a registry, usually the thread's global one via
//! [`Registry::with_global`]. The registry owns the [`SpecTree`] arena that
//! every declared blueprint lives in.

use crate::builder::SuiteBuilder;
use crate::error::TestResult;
use crate::runner::Runner;
use crate::spec::{SpecId, SpecTree};
use crate::unit::guarded;
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Registry-level hook (`before_anything` / `after_everything`)
pub type GlobalHook = Rc<dyn Fn() -> LocalBoxFuture<'static, TestResult>>;

thread_local! {
    static GLOBAL: RefCell<Registry> = RefCell::new(Registry::new());
}

#[derive(Default)]
pub struct Registry {
    tree: SpecTree,
    tests: Vec<SpecId>,
    before_hooks: Vec<GlobalHook>,
    after_hooks: Vec<GlobalHook>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the thread's global registry
    ///
    /// # Panics
    /// Panics if called re-entrantly from inside `f`
    pub fn with_global<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        GLOBAL.with(|global| f(&mut global.borrow_mut()))
    }

    /// Move the global registry out, leaving an empty one behind
    pub fn take_global() -> Registry {
        GLOBAL.with(|global| std::mem::take(&mut *global.borrow_mut()))
    }

    pub fn builder(&mut self) -> SuiteBuilder<'_> {
        SuiteBuilder::new(self)
    }

    pub fn tree(&self) -> &SpecTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut SpecTree {
        &mut self.tree
    }

    /// Register a top-level spec
    pub fn add(&mut self, id: SpecId) {
        self.tests.push(id);
    }

    /// Top-level specs in registration order
    pub fn tests(&self) -> &[SpecId] {
        &self.tests
    }

    pub fn before_anything<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.before_hooks.push(Rc::new(move || hook().boxed_local()));
    }

    pub fn after_everything<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.after_hooks.push(Rc::new(move || hook().boxed_local()));
    }

    /// Run the `before_anything` hooks in sequence
    pub async fn setup(&self) -> TestResult {
        run_global_hooks(&self.before_hooks).await
    }

    /// Run the `after_everything` hooks in sequence
    pub async fn teardown(&self) -> TestResult {
        run_global_hooks(&self.after_hooks).await
    }

    /// Runner over every registered top-level spec
    pub fn runner(&self) -> Runner<'_> {
        Runner::new(&self.tree, self.tests.clone())
    }
}

async fn run_global_hooks(hooks: &[GlobalHook]) -> TestResult {
    for hook in hooks {
        guarded(async move { hook().await }).await?;
    }
    Ok(())
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tests", &self.tests)
            .field("nodes", &self.tree.len())
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TestError;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_setup_and_teardown_run_in_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();

        for label in ["first", "second"] {
            let calls = Rc::clone(&calls);
            registry.before_anything(move || {
                calls.borrow_mut().push(format!("setup {label}"));
                async { Ok(()) }
            });
        }
        let teardown_calls = Rc::clone(&calls);
        registry.after_everything(move || {
            teardown_calls.borrow_mut().push("teardown".to_string());
            async { Ok(()) }
        });

        registry.setup().await.unwrap();
        registry.teardown().await.unwrap();

        assert_eq!(
            *calls.borrow(),
            vec!["setup first", "setup second", "teardown"]
        );
    }

    #[tokio::test]
    async fn test_empty_hook_lists_resolve() {
        let registry = Registry::new();
        assert!(registry.setup().await.is_ok());
        assert!(registry.teardown().await.is_ok());
    }

    #[tokio::test]
    async fn test_setup_stops_at_first_failure() {
        let ran = Rc::new(RefCell::new(false));
        let mut registry = Registry::new();
        registry.before_anything(|| async { Err(TestError::msg("no database")) });
        let flag = Rc::clone(&ran);
        registry.before_anything(move || {
            *flag.borrow_mut() = true;
            async { Ok(()) }
        });

        assert_eq!(
            registry.setup().await,
            Err(TestError::msg("no database"))
        );
        assert!(!*ran.borrow());
    }

    #[test]
    fn test_global_registry_round_trip() {
        Registry::with_global(|registry| {
            registry.builder().describe("global", |_| Ok(())).unwrap();
        });

        let taken = Registry::take_global();
        assert_eq!(taken.tests().len(), 1);
        assert!(Registry::with_global(|registry| registry.tests().is_empty()));
    }
}
