//! Spec tree - arena of suite and case blueprints
//!
//! Blueprints are addressed by [`SpecId`] and link to their enclosing suite by
//! index. The tree is only extended through the builder; once a runner borrows
//! it, it is read-only. Instances are created fresh from blueprints for every
//! run with [`SpecTree::instantiate`].

use crate::context::{Context, DescribedType, Description, PropertyTable};
use crate::error::TestError;
use crate::hook::HookLists;
use crate::suite::SuiteInstance;
use crate::unit::{Body, CaseInstance, ContainerRef, Unit};
use std::fmt;
use std::rc::Rc;

/// Index of a blueprint in its [`SpecTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(usize);

impl SpecId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a custom unit is being instantiated
pub struct Site {
    pub container: Option<ContainerRef>,
    pub context: Context,
}

/// A user-defined blueprint; instantiation may fail
pub trait UnitSpec {
    fn description(&self) -> String;

    fn instantiate(&self, site: Site) -> Result<Box<dyn Unit>, TestError>;
}

pub struct SuiteNode {
    description: Description,
    parent: Option<SpecId>,
    children: Vec<SpecId>,
    hooks: HookLists,
    properties: Rc<PropertyTable>,
}

impl SuiteNode {
    pub fn description(&self) -> &str {
        self.description.text()
    }

    pub fn described_type(&self) -> Option<DescribedType> {
        self.description.described_type()
    }

    pub fn children(&self) -> &[SpecId] {
        &self.children
    }

    pub fn hooks(&self) -> &HookLists {
        &self.hooks
    }

    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut HookLists {
        &mut self.hooks
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyTable {
        Rc::make_mut(&mut self.properties)
    }
}

pub struct CaseNode {
    description: String,
    parent: Option<SpecId>,
    body: Option<Body>,
    pending: bool,
}

impl CaseNode {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_pending(&self) -> bool {
        self.pending || self.body.is_none()
    }
}

pub struct CustomNode {
    parent: Option<SpecId>,
    spec: Rc<dyn UnitSpec>,
}

/// A blueprint in the tree
pub enum SpecNode {
    Suite(SuiteNode),
    Case(CaseNode),
    Custom(CustomNode),
}

impl SpecNode {
    fn parent(&self) -> Option<SpecId> {
        match self {
            SpecNode::Suite(node) => node.parent,
            SpecNode::Case(node) => node.parent,
            SpecNode::Custom(node) => node.parent,
        }
    }
}

#[derive(Default)]
pub struct SpecTree {
    nodes: Vec<SpecNode>,
}

impl SpecTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    /// Panics if `id` was not issued by this tree
    pub fn node(&self, id: SpecId) -> &SpecNode {
        &self.nodes[id.0]
    }

    pub fn suite(&self, id: SpecId) -> Option<&SuiteNode> {
        match self.node(id) {
            SpecNode::Suite(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_suite(&self, id: SpecId) -> bool {
        self.suite(id).is_some()
    }

    pub fn description(&self, id: SpecId) -> String {
        match self.node(id) {
            SpecNode::Suite(node) => node.description().to_string(),
            SpecNode::Case(node) => node.description.clone(),
            SpecNode::Custom(node) => node.spec.description(),
        }
    }

    pub fn parent(&self, id: SpecId) -> Option<SpecId> {
        self.node(id).parent()
    }

    /// Declaration-ordered children; empty for non-suites
    pub fn children(&self, id: SpecId) -> &[SpecId] {
        match self.suite(id) {
            Some(node) => node.children(),
            None => &[],
        }
    }

    /// The suite `id` and its enclosing suites, outermost first
    pub fn ancestry(&self, id: SpecId) -> Vec<SpecId> {
        let mut chain = Vec::new();
        let mut current = if self.is_suite(id) {
            Some(id)
        } else {
            self.parent(id)
        };
        while let Some(suite) = current {
            chain.push(suite);
            current = self.parent(suite);
        }
        chain.reverse();
        chain
    }

    /// Context for a fresh instance of `id`: its levels' tables, nearest first
    pub fn context_for(&self, id: SpecId) -> Context {
        let scope = self
            .ancestry(id)
            .into_iter()
            .rev()
            .filter_map(|suite| self.suite(suite))
            .map(|node| Rc::clone(&node.properties))
            .collect();
        Context::new(scope)
    }

    /// Construct a fresh instance of `id`
    pub fn instantiate(
        &self,
        id: SpecId,
        container: Option<ContainerRef>,
    ) -> Result<Box<dyn Unit + '_>, TestError> {
        let context = self.context_for(id);
        match self.node(id) {
            SpecNode::Suite(_) => Ok(Box::new(SuiteInstance::new(self, id, container, context))),
            SpecNode::Case(node) => Ok(Box::new(CaseInstance::new(
                node.description.clone(),
                node.body.clone(),
                node.pending,
                container,
                context,
            ))),
            SpecNode::Custom(node) => node.spec.instantiate(Site { container, context }),
        }
    }

    pub(crate) fn add_suite(&mut self, parent: Option<SpecId>, description: Description) -> SpecId {
        let mut properties = PropertyTable::default();
        if let Some(described) = description.described_type() {
            properties.set_described(described);
        }
        self.push(SpecNode::Suite(SuiteNode {
            description,
            parent,
            children: Vec::new(),
            hooks: HookLists::default(),
            properties: Rc::new(properties),
        }))
    }

    pub(crate) fn add_case(
        &mut self,
        parent: Option<SpecId>,
        description: String,
        body: Option<Body>,
        pending: bool,
    ) -> SpecId {
        self.push(SpecNode::Case(CaseNode {
            description,
            parent,
            body,
            pending,
        }))
    }

    pub(crate) fn add_custom(&mut self, parent: Option<SpecId>, spec: Rc<dyn UnitSpec>) -> SpecId {
        self.push(SpecNode::Custom(CustomNode { parent, spec }))
    }

    pub(crate) fn suite_mut(&mut self, id: SpecId) -> Option<&mut SuiteNode> {
        match &mut self.nodes[id.0] {
            SpecNode::Suite(node) => Some(node),
            _ => None,
        }
    }

    /// Append `id` to the children of `parent`
    pub(crate) fn attach(&mut self, parent: SpecId, id: SpecId) {
        if let Some(suite) = self.suite_mut(parent) {
            suite.children.push(id);
        }
    }

    fn push(&mut self, node: SpecNode) -> SpecId {
        let id = SpecId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

impl fmt::Debug for SpecTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for index in 0..self.nodes.len() {
            let id = SpecId(index);
            let kind = match self.node(id) {
                SpecNode::Suite(_) => "suite",
                SpecNode::Case(_) => "case",
                SpecNode::Custom(_) => "custom",
            };
            list.entry(&(index, kind, self.description(id), self.parent(id)));
        }
        list.finish()
    }
}
