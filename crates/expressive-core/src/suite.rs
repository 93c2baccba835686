//! Suite - composite unit with cascading hooks
//!
//! A suite run has three phases:
//! 1. entry: `started`, then the `before_all` hooks
//! 2. children: each child spec is instantiated and run in declaration order,
//!    wrapped in the `before`/`after` cascades of every enclosing level
//! 3. exit: `completed`, then the `after_all` hooks
//!
//! Failures in any phase become `error` events; they never stop sibling
//! children from running.

use crate::context::Context;
use crate::error::TestResult;
use crate::event::{ErrorSource, Event, Listener};
use crate::hook::{run_hooks, HookKind};
use crate::spec::{SpecId, SpecTree, SuiteNode};
use crate::unit::{finish, ContainerLink, ContainerRef, Outcome, Unit, UnitState};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::rc::Rc;
use tracing::Instrument;

/// Instance of a declared suite
pub struct SuiteInstance<'t> {
    state: UnitState,
    context: Context,
    tree: &'t SpecTree,
    id: SpecId,
    instances: Vec<Box<dyn Unit + 't>>,
    succeeded: bool,
}

impl<'t> SuiteInstance<'t> {
    pub fn new(
        tree: &'t SpecTree,
        id: SpecId,
        container: Option<ContainerRef>,
        context: Context,
    ) -> Self {
        Self {
            state: UnitState::new(tree.description(id), container),
            context,
            tree,
            id,
            instances: Vec::new(),
            succeeded: false,
        }
    }

    pub fn id(&self) -> SpecId {
        self.id
    }

    /// Child specs in declaration order
    pub fn tests(&self) -> &'t [SpecId] {
        self.tree.children(self.id)
    }

    /// Children instantiated by the current (or last) run
    pub fn instances(&self) -> &[Box<dyn Unit + 't>] {
        &self.instances
    }

    fn as_container(&self) -> ContainerRef {
        ContainerLink::new(self.state.description(), self.state.container().cloned())
    }

    fn settle(&mut self) {
        let outcome = if self.did_succeed() {
            Outcome::Succeeded
        } else {
            Outcome::Failed
        };
        self.state.set_outcome(outcome);
    }

    async fn run_suite(&mut self, listener: &dyn Listener) {
        if self.state.has_run() {
            tracing::warn!("suite already ran, ignoring");
            return;
        }

        if self.state.is_pending() {
            self.state.set_outcome(Outcome::Skipped);
            listener.on_event(&Event::Skipped(&*self));
            return;
        }

        let tree = self.tree;
        let Some(node) = tree.suite(self.id) else {
            return;
        };

        self.instances.clear();
        self.succeeded = true;
        self.state.set_outcome(Outcome::Running);
        listener.on_event(&Event::Started(&*self));

        match run_hooks(node.hooks().get(HookKind::BeforeAll), &self.context).await {
            Ok(()) => self.run_children(node, listener).await,
            Err(error) => {
                tracing::debug!(%error, "before_all failed, skipping children");
                self.succeeded = false;
                listener.on_event(&Event::Error {
                    source: ErrorSource::Unit(&*self),
                    error: &error,
                });
            }
        }

        self.settle();
        finish(self, listener);

        if let Err(error) = run_hooks(node.hooks().get(HookKind::AfterAll), &self.context).await {
            tracing::debug!(%error, "after_all failed");
            self.succeeded = false;
            self.settle();
            listener.on_event(&Event::Error {
                source: ErrorSource::Unit(&*self),
                error: &error,
            });
        }

        tracing::debug!(succeeded = self.did_succeed(), "suite finished");
    }

    /// Levels this instance was actually run under, outermost first
    ///
    /// A nested suite run on its own has no live containers, so the hooks of
    /// its declared ancestors are left out.
    fn live_levels(&self, container: &ContainerLink) -> Vec<SpecId> {
        let mut levels = self.tree.ancestry(self.id);
        let skipped = levels.len().saturating_sub(container.depth());
        levels.drain(..skipped);
        levels
    }

    async fn run_children(&mut self, node: &'t SuiteNode, listener: &dyn Listener) {
        let tree = self.tree;
        let container = self.as_container();
        let levels = self.live_levels(&container);

        for &child_id in node.children() {
            let mut child = match tree.instantiate(child_id, Some(Rc::clone(&container))) {
                Ok(child) => child,
                Err(error) => {
                    tracing::debug!(%error, "child construction failed");
                    self.succeeded = false;
                    let description = tree.description(child_id);
                    listener.on_event(&Event::Error {
                        source: ErrorSource::Spec {
                            id: child_id,
                            description: &description,
                        },
                        error: &error,
                    });
                    continue;
                }
            };

            listener.on_event(&Event::Created(&*child));

            if let Err(error) = run_child(tree, &levels, child.as_mut(), listener).await {
                self.succeeded = false;
                listener.on_event(&Event::Error {
                    source: ErrorSource::Unit(&*child),
                    error: &error,
                });
                child.complete(listener);
            }

            self.instances.push(child);
        }
    }
}

/// Run one child inside the hook cascades of `levels`
///
/// Cascades only wrap leaf units; nested suites apply them to their own leaves.
/// A failing `before` cascade skips the child and its `after` cascade.
async fn run_child(
    tree: &SpecTree,
    levels: &[SpecId],
    child: &mut (dyn Unit + '_),
    listener: &dyn Listener,
) -> TestResult {
    let cascades = !child.is_suite();
    let ctx = child.context().clone();

    if cascades {
        cascade(tree, levels, HookKind::Before, &ctx).await?;
    }

    child.run(listener).await;

    if cascades {
        cascade(tree, levels, HookKind::After, &ctx).await?;
    }

    Ok(())
}

/// Each level's hooks of `kind`, outermost level first (for both before and after)
async fn cascade(tree: &SpecTree, levels: &[SpecId], kind: HookKind, ctx: &Context) -> TestResult {
    for &level in levels {
        if let Some(node) = tree.suite(level) {
            tracing::trace!(suite = node.description(), hook = %kind, "running hooks");
            run_hooks(node.hooks().get(kind), ctx).await?;
        }
    }
    Ok(())
}

impl<'t> Unit for SuiteInstance<'t> {
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
        let span = tracing::debug_span!("suite", description = %self.full_description());
        self.run_suite(listener).instrument(span).boxed_local()
    }

    fn complete(&mut self, listener: &dyn Listener) {
        finish(self, listener)
    }

    /// Own hook success and every instantiated child succeeded or is pending
    fn did_succeed(&self) -> bool {
        self.succeeded
            && self
                .instances
                .iter()
                .all(|child| child.did_succeed() || child.is_pending())
    }

    fn is_suite(&self) -> bool {
        true
    }
}
