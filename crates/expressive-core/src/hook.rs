//! Hook lists attached to each suite level

use crate::context::Context;
use crate::error::TestResult;
use crate::unit::{guarded, Body};
use std::fmt;

/// Which hook list a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Before every test nested at or below the level
    Before,
    /// After every test nested at or below the level
    After,
    /// Once when the suite starts
    BeforeAll,
    /// Once when the suite ends
    AfterAll,
}

impl HookKind {
    pub fn name(self) -> &'static str {
        match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::BeforeAll => "before_all",
            HookKind::AfterAll => "after_all",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four hook lists of one suite, each in registration order
#[derive(Clone, Default)]
pub struct HookLists {
    before: Vec<Body>,
    after: Vec<Body>,
    before_all: Vec<Body>,
    after_all: Vec<Body>,
}

impl HookLists {
    pub fn get(&self, kind: HookKind) -> &[Body] {
        match kind {
            HookKind::Before => &self.before,
            HookKind::After => &self.after,
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
        }
    }

    pub(crate) fn push(&mut self, kind: HookKind, hook: Body) {
        match kind {
            HookKind::Before => self.before.push(hook),
            HookKind::After => self.after.push(hook),
            HookKind::BeforeAll => self.before_all.push(hook),
            HookKind::AfterAll => self.after_all.push(hook),
        }
    }

    pub fn len(&self, kind: HookKind) -> usize {
        self.get(kind).len()
    }
}

impl fmt::Debug for HookLists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookLists")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .finish()
    }
}

/// Run hooks strictly in sequence, stopping at the first failure
pub(crate) async fn run_hooks(hooks: &[Body], ctx: &Context) -> TestResult {
    for hook in hooks {
        let ctx = ctx.clone();
        guarded(async move { hook(ctx).await }).await?;
    }
    Ok(())
}
