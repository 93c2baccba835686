//! Runner - execute top-level specs sequentially

use crate::error::TestError;
use crate::event::{ErrorSource, Event, Listener};
use crate::spec::{SpecId, SpecTree};
use crate::unit::Unit;

/// Runs an ordered list of top-level specs, isolating each one's failures
pub struct Runner<'t> {
    tree: &'t SpecTree,
    specs: Vec<SpecId>,
    /// `None` until the first run
    instances: Option<Vec<Box<dyn Unit + 't>>>,
    failures: Vec<TestError>,
}

impl<'t> Runner<'t> {
    /// Runner over `specs`; a nested suite given here runs detached from its
    /// declared parents, without their `before`/`after` hooks
    pub fn new(tree: &'t SpecTree, specs: Vec<SpecId>) -> Self {
        Self {
            tree,
            specs,
            instances: None,
            failures: Vec::new(),
        }
    }

    pub fn specs(&self) -> &[SpecId] {
        &self.specs
    }

    /// Instances created by the last run
    pub fn instances(&self) -> &[Box<dyn Unit + 't>] {
        self.instances.as_deref().unwrap_or(&[])
    }

    /// Construction failures of the last run
    pub fn failures(&self) -> &[TestError] {
        &self.failures
    }

    /// Construct and run every spec in order
    ///
    /// A spec that fails to construct is reported as an `error` event and
    /// the remaining specs still run.
    pub async fn run(&mut self, listener: &dyn Listener) {
        let tree = self.tree;
        let mut instances = Vec::with_capacity(self.specs.len());
        self.failures.clear();

        tracing::debug!(specs = self.specs.len(), "starting run");

        for &id in &self.specs {
            let mut unit = match tree.instantiate(id, None) {
                Ok(unit) => unit,
                Err(error) => {
                    tracing::debug!(%error, "top-level construction failed");
                    let description = tree.description(id);
                    listener.on_event(&Event::Error {
                        source: ErrorSource::Spec {
                            id,
                            description: &description,
                        },
                        error: &error,
                    });
                    self.failures.push(error);
                    continue;
                }
            };

            listener.on_event(&Event::Created(&*unit));
            unit.run(listener).await;
            instances.push(unit);
        }

        self.instances = Some(instances);
        tracing::debug!(passed = self.did_pass(), "run finished");
    }

    /// True after a run with no construction failures where every top-level
    /// unit succeeded
    pub fn did_pass(&self) -> bool {
        match &self.instances {
            Some(instances) => {
                self.failures.is_empty() && instances.iter().all(|unit| unit.did_succeed())
            }
            None => false,
        }
    }
}
