//! Context definitions - inheritable named attributes per nesting level
//!
//! Every suite level owns a [`PropertyTable`]. An instance's [`Context`] holds
//! the tables of its own nesting levels ordered nearest-first, so a name defined
//! in an inner level shadows the same name from outer levels for that branch
//! only. Memoized attributes are cached per context, which means per instance.

use crate::error::PropertyError;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Generator invoked with the accessing instance's context
pub type Generator = Rc<dyn Fn(&Context) -> Rc<dyn Any>>;

/// Value passed to a property declaration
#[derive(Clone)]
pub enum PropertyValue {
    /// Fixed value shared by every instance
    Constant(Rc<dyn Any>),
    /// Computed from the instance on access
    Generator(Generator),
}

impl PropertyValue {
    pub fn constant<T: 'static>(value: T) -> Self {
        PropertyValue::Constant(Rc::new(value))
    }

    pub fn generator<T, F>(generate: F) -> Self
    where
        T: 'static,
        F: Fn(&Context) -> T + 'static,
    {
        PropertyValue::Generator(Rc::new(move |ctx| Rc::new(generate(ctx)) as Rc<dyn Any>))
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Constant(_) => f.write_str("Constant(..)"),
            PropertyValue::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Options for a property declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyOptions {
    /// Cache a generator's result for the lifetime of the instance (default: true)
    pub memoize: bool,
}

impl Default for PropertyOptions {
    fn default() -> Self {
        Self { memoize: true }
    }
}

impl PropertyOptions {
    pub fn memoized() -> Self {
        Self { memoize: true }
    }

    pub fn recomputed() -> Self {
        Self { memoize: false }
    }
}

#[derive(Clone)]
enum Attribute {
    Constant(Rc<dyn Any>),
    Memoized(Generator),
    Computed(Generator),
}

/// Attributes declared at one nesting level
#[derive(Clone, Default)]
pub struct PropertyTable {
    attributes: HashMap<String, Attribute>,
    described: Option<DescribedType>,
}

impl PropertyTable {
    /// Define (or redefine at this level) an attribute
    pub(crate) fn define(&mut self, name: &str, value: PropertyValue, options: PropertyOptions) {
        let attribute = match value {
            PropertyValue::Generator(generator) if options.memoize => Attribute::Memoized(generator),
            PropertyValue::Generator(generator) => Attribute::Computed(generator),
            PropertyValue::Constant(value) => Attribute::Constant(value),
        };
        self.attributes.insert(name.to_string(), attribute);
    }

    pub(crate) fn set_described(&mut self, described: DescribedType) {
        self.described = Some(described);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.attributes.keys().collect();
        names.sort();
        f.debug_struct("PropertyTable")
            .field("attributes", &names)
            .field("described", &self.described)
            .finish()
    }
}

/// Per-instance view of the attributes visible at its nesting level
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    /// Tables ordered nearest level first
    scope: Vec<Rc<PropertyTable>>,
    cache: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl Context {
    pub(crate) fn new(scope: Vec<Rc<PropertyTable>>) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                scope,
                cache: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Context with no visible attributes
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Typed access to an attribute
    pub fn get<T: 'static>(&self, name: &str) -> Result<Rc<T>, PropertyError> {
        self.value(name)?
            .downcast::<T>()
            .map_err(|_| PropertyError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Untyped access to an attribute
    pub fn value(&self, name: &str) -> Result<Rc<dyn Any>, PropertyError> {
        if let Some(cached) = self.inner.cache.borrow().get(name) {
            return Ok(Rc::clone(cached));
        }

        let attribute = self
            .inner
            .scope
            .iter()
            .find_map(|table| table.attributes.get(name))
            .ok_or_else(|| PropertyError::Undefined {
                name: name.to_string(),
            })?;

        match attribute {
            Attribute::Constant(value) => Ok(Rc::clone(value)),
            Attribute::Computed(generator) => {
                tracing::trace!(property = name, "computing property");
                Ok(generator(self))
            }
            Attribute::Memoized(generator) => {
                tracing::trace!(property = name, "memoizing property");
                // No cache borrow is held while the generator runs; it may read other properties.
                let value = generator(self);
                let mut cache = self.inner.cache.borrow_mut();
                Ok(Rc::clone(cache.entry(name.to_string()).or_insert(value)))
            }
        }
    }

    /// Whether `name` resolves at this level
    pub fn has(&self, name: &str) -> bool {
        self.inner.scope.iter().any(|table| table.contains(name))
    }

    /// Type recorded by the nearest suite that was described by a type
    pub fn described_type(&self) -> Option<&DescribedType> {
        self.inner
            .scope
            .iter()
            .find_map(|table| table.described.as_ref())
    }

    /// Whether both handles belong to the same instance
    pub fn same_instance(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("levels", &self.inner.scope.len())
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}

/// A type used as the subject of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescribedType {
    name: &'static str,
    type_name: &'static str,
    type_id: TypeId,
}

impl DescribedType {
    pub fn of<T: 'static>() -> Self {
        let full = type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        Self {
            name,
            type_name: full,
            type_id: TypeId::of::<T>(),
        }
    }

    /// Unqualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fully qualified type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Source of a suite description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Literal(String),
    Type(DescribedType),
}

impl Description {
    pub fn text(&self) -> &str {
        match self {
            Description::Literal(text) => text,
            Description::Type(described) => described.name(),
        }
    }

    pub fn described_type(&self) -> Option<DescribedType> {
        match self {
            Description::Literal(_) => None,
            Description::Type(described) => Some(*described),
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Description::Literal(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Description::Literal(text)
    }
}

impl From<DescribedType> for Description {
    fn from(described: DescribedType) -> Self {
        Description::Type(described)
    }
}
