//! Lifecycle notifications
//!
//! A [`Listener`] is threaded through every `run()` call instead of attaching
//! emitters to individual instances. Events borrow the unit they describe, so
//! a listener can inspect it (description, outcome, pending state) at the
//! moment the event fires.

use crate::error::TestError;
use crate::spec::SpecId;
use crate::unit::Unit;
use std::cell::RefCell;

/// A notification emitted while running units
pub enum Event<'a> {
    /// A suite (or the runner) instantiated a child
    Created(&'a dyn Unit),
    Started(&'a dyn Unit),
    /// Emitted at most once per instance
    Completed(&'a dyn Unit),
    /// Emitted by pending units in place of started/completed
    Skipped(&'a dyn Unit),
    /// A body, hook or construction failure; never aborts the run
    Error {
        source: ErrorSource<'a>,
        error: &'a TestError,
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Created(_) => EventKind::Created,
            Event::Started(_) => EventKind::Started,
            Event::Completed(_) => EventKind::Completed,
            Event::Skipped(_) => EventKind::Skipped,
            Event::Error { .. } => EventKind::Error,
        }
    }
}

/// Discriminant of an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Started,
    Completed,
    Skipped,
    Error,
}

/// What an error event is reported against
#[derive(Clone, Copy)]
pub enum ErrorSource<'a> {
    /// A live instance
    Unit(&'a dyn Unit),
    /// A spec that could not be instantiated
    Spec { id: SpecId, description: &'a str },
}

impl ErrorSource<'_> {
    pub fn full_description(&self) -> String {
        match self {
            ErrorSource::Unit(unit) => unit.full_description(),
            ErrorSource::Spec { description, .. } => description.to_string(),
        }
    }

    pub fn is_spec(&self) -> bool {
        matches!(self, ErrorSource::Spec { .. })
    }
}

/// Receiver of lifecycle notifications
pub trait Listener {
    fn on_event(&self, event: &Event<'_>);
}

/// Discards every event
impl Listener for () {
    fn on_event(&self, _event: &Event<'_>) {}
}

impl<L: Listener + ?Sized> Listener for &L {
    fn on_event(&self, event: &Event<'_>) {
        (**self).on_event(event)
    }
}

/// Forwards each event to several listeners in order
#[derive(Default)]
pub struct Fanout<'a> {
    listeners: Vec<&'a dyn Listener>,
}

impl<'a> Fanout<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: &'a dyn Listener) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl Listener for Fanout<'_> {
    fn on_event(&self, event: &Event<'_>) {
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }
}

/// An event captured by [`EventLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub description: String,
    pub full_description: String,
    pub is_suite: bool,
}

/// An error captured by [`EventLog`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedError {
    pub source: String,
    pub from_spec: bool,
    pub error: TestError,
}

/// Listener that records everything it receives
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<RecordedEvent>>,
    errors: RefCell<Vec<RecordedError>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    pub fn errors(&self) -> Vec<RecordedError> {
        self.errors.borrow().clone()
    }

    /// Full descriptions of the units that emitted `kind`, in order
    pub fn descriptions(&self, kind: EventKind) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.kind == kind)
            .map(|event| event.full_description.clone())
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }
}

impl Listener for EventLog {
    fn on_event(&self, event: &Event<'_>) {
        let record = |unit: &dyn Unit| RecordedEvent {
            kind: event.kind(),
            description: unit.description().to_string(),
            full_description: unit.full_description(),
            is_suite: unit.is_suite(),
        };

        let recorded = match event {
            Event::Created(unit)
            | Event::Started(unit)
            | Event::Completed(unit)
            | Event::Skipped(unit) => record(*unit),
            Event::Error { source, error } => {
                self.errors.borrow_mut().push(RecordedError {
                    source: source.full_description(),
                    from_spec: source.is_spec(),
                    error: (*error).clone(),
                });
                let (description, is_suite) = match source {
                    ErrorSource::Unit(unit) => (unit.description().to_string(), unit.is_suite()),
                    ErrorSource::Spec { description, .. } => (description.to_string(), false),
                };
                RecordedEvent {
                    kind: EventKind::Error,
                    description,
                    full_description: source.full_description(),
                    is_suite,
                }
            }
        };

        self.events.borrow_mut().push(recorded);
    }
}
