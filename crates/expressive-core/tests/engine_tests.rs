//! End-to-end behavior of declared suites run through the runner

use expressive_core::{
    Context, DescribedType, DslError, EventKind, EventLog, PropertyOptions, PropertyValue,
    Registry, Runner, TestError, TestResult, Unit,
};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Seen = Rc<RefCell<Vec<String>>>;

async fn run_all(registry: &Registry) -> (bool, EventLog) {
    let log = EventLog::new();
    let mut runner = registry.runner();
    runner.run(&log).await;
    (runner.did_pass(), log)
}

fn observe(
    seen: &Seen,
    label: &'static str,
    name: &'static str,
) -> impl Fn(Context) -> std::future::Ready<TestResult> {
    let seen = Rc::clone(seen);
    move |ctx| {
        let observed = match ctx.get::<i32>(name) {
            Ok(value) => value.to_string(),
            Err(_) => match ctx.get::<&str>(name) {
                Ok(value) => value.to_string(),
                Err(err) => err.to_string(),
            },
        };
        seen.borrow_mut().push(format!("{label}: {observed}"));
        std::future::ready(Ok(()))
    }
}

// ============================================================================
// Property inheritance
// ============================================================================

#[tokio::test]
async fn test_inner_redefinition_shadows_only_its_branch() {
    let seen: Seen = Rc::default();
    let mut registry = Registry::new();
    registry
        .builder()
        .describe("outer", |outer| {
            outer.property("x", PropertyValue::constant(1))?;
            outer.it("outer test", observe(&seen, "outer", "x"));
            outer.describe("inner", |inner| {
                inner.property("x", PropertyValue::constant("one"))?;
                inner.it("inner test", observe(&seen, "inner", "x"));
                inner.describe("deeper", |deeper| {
                    deeper.it("deeper test", observe(&seen, "deeper", "x"));
                    Ok(())
                })?;
                Ok(())
            })?;
            outer.describe("sibling", |sibling| {
                sibling.it("sibling test", observe(&seen, "sibling", "x"));
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let (passed, _) = run_all(&registry).await;

    assert!(passed);
    assert_eq!(
        *seen.borrow(),
        vec!["outer: 1", "inner: one", "deeper: one", "sibling: 1"]
    );
}

#[tokio::test]
async fn test_undefined_property_fails_the_test() {
    let mut registry = Registry::new();
    registry
        .builder()
        .describe("suite", |s| {
            s.it("reads a missing property", |ctx| async move {
                ctx.get::<i32>("missing")?;
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    let (passed, log) = run_all(&registry).await;

    assert!(!passed);
    assert_eq!(
        log.errors()[0].error.to_string(),
        "property 'missing' is not defined"
    );
}

#[tokio::test]
async fn test_memoized_property_is_cached_per_instance() {
    let generated = Rc::new(Cell::new(0));
    let mut registry = Registry::new();
    let counter = Rc::clone(&generated);
    registry
        .builder()
        .describe("memoization", move |s| {
            s.property(
                "subject",
                PropertyValue::generator(move |_| {
                    counter.set(counter.get() + 1);
                    String::from("subject")
                }),
            )?;
            s.it("reads twice", |ctx| async move {
                let first = ctx.get::<String>("subject")?;
                let second = ctx.get::<String>("subject")?;
                assert!(Rc::ptr_eq(&first, &second));
                Ok(())
            });
            s.it("reads again in a new instance", |ctx| async move {
                ctx.get::<String>("subject")?;
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    let (passed, _) = run_all(&registry).await;

    assert!(passed);
    // Once per test instance
    assert_eq!(generated.get(), 2);
}

#[tokio::test]
async fn test_non_memoized_property_recomputes_per_access() {
    let generated = Rc::new(Cell::new(0));
    let mut registry = Registry::new();
    let counter = Rc::clone(&generated);
    registry
        .builder()
        .describe("recompute", move |s| {
            s.property_with(
                "fresh",
                PropertyValue::generator(move |_| {
                    counter.set(counter.get() + 1);
                    counter.get()
                }),
                PropertyOptions { memoize: false },
            )?;
            s.it("reads twice", |ctx| async move {
                let first = *ctx.get::<i32>("fresh")?;
                let second = *ctx.get::<i32>("fresh")?;
                assert_ne!(first, second);
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    let (passed, _) = run_all(&registry).await;

    assert!(passed);
    assert_eq!(generated.get(), 2);
}

#[tokio::test]
async fn test_hooks_and_body_share_the_instance_context() {
    let mut registry = Registry::new();
    registry
        .builder()
        .describe("shared state", |s| {
            s.property("log", PropertyValue::generator(|_| RefCell::new(Vec::<&str>::new())))?;
            s.before(|ctx| async move {
                ctx.get::<RefCell<Vec<&str>>>("log")?.borrow_mut().push("before");
                Ok(())
            })?;
            s.it("sees what the hook did", |ctx| async move {
                let log = ctx.get::<RefCell<Vec<&str>>>("log")?;
                assert_eq!(*log.borrow(), vec!["before"]);
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    let (passed, log) = run_all(&registry).await;
    assert!(passed, "{:?}", log.errors());
}

#[tokio::test]
async fn test_described_type_is_visible_to_nested_tests() {
    struct Calculator;

    let mut registry = Registry::new();
    registry
        .builder()
        .describe_type::<Calculator>(|s| {
            s.describe("#add", |s| {
                s.it("knows its subject", |ctx| async move {
                    let described = ctx.described_type().ok_or("no described type")?;
                    assert!(described.is::<Calculator>());
                    Ok(())
                });
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let (passed, log) = run_all(&registry).await;

    assert!(passed);
    assert_eq!(
        log.descriptions(EventKind::Completed)[0],
        "Calculator #add knows its subject"
    );
    assert_eq!(DescribedType::of::<Calculator>().name(), "Calculator");
}

// ============================================================================
// Suite scenarios
// ============================================================================

#[tokio::test]
async fn test_before_all_runs_once_around_nested_suite() {
    let counter = Rc::new(Cell::new(0));
    let mut registry = Registry::new();
    let hook_counter = Rc::clone(&counter);
    let a = registry
        .builder()
        .describe("A", move |a| {
            a.before_all(move |_| {
                hook_counter.set(hook_counter.get() + 1);
                async { Ok(()) }
            })?;
            a.describe("B", |b| {
                b.it("passes", |_| async { Ok(()) });
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let log = EventLog::new();
    let mut suite = registry.tree().instantiate(a, None).unwrap();
    suite.run(&log).await;

    assert_eq!(counter.get(), 1);
    assert!(suite.did_succeed());
    let completed: Vec<_> = log
        .events()
        .into_iter()
        .filter(|event| event.kind == EventKind::Completed && !event.is_suite)
        .map(|event| event.full_description)
        .collect();
    assert_eq!(completed, vec!["A B passes"]);
}

#[tokio::test]
async fn test_event_sequence_for_nested_run() {
    let mut registry = Registry::new();
    registry
        .builder()
        .describe("top", |s| {
            s.it("passes", |_| async { Ok(()) });
            s.it_pending("later");
            s.describe("nested", |s| {
                s.it("fails", |_| async { Err(TestError::msg("nope")) });
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let (passed, log) = run_all(&registry).await;
    assert!(!passed);

    let sequence: Vec<_> = log
        .events()
        .into_iter()
        .map(|event| format!("{:?} {}", event.kind, event.full_description))
        .collect();
    assert_eq!(
        sequence,
        vec![
            "Created top",
            "Started top",
            "Created top passes",
            "Started top passes",
            "Completed top passes",
            "Created top later",
            "Skipped top later",
            "Created top nested",
            "Started top nested",
            "Created top nested fails",
            "Started top nested fails",
            "Error top nested fails",
            "Completed top nested fails",
            "Completed top nested",
            "Completed top",
        ]
    );
}

#[tokio::test]
async fn test_panicking_hook_is_contained() {
    let mut registry = Registry::new();
    let mut builder = registry.builder();
    builder
        .describe("first", |s| {
            s.before(|_| async { panic!("hook exploded") })?;
            s.it("never runs", |_| async { Ok(()) });
            Ok(())
        })
        .unwrap();
    builder
        .describe("second", |s| {
            s.it("still runs", |_| async { Ok(()) });
            Ok(())
        })
        .unwrap();

    let (passed, log) = run_all(&registry).await;

    assert!(!passed);
    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source, "first never runs");
    assert_eq!(errors[0].error, TestError::Panicked("hook exploded".into()));
    assert!(log
        .descriptions(EventKind::Completed)
        .contains(&"second still runs".to_string()));
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_only_outermost_suites_are_registered() {
    let mut registry = Registry::new();
    let mut builder = registry.builder();
    let first = builder
        .describe("first", |s| {
            s.describe("nested", |_| Ok(()))?;
            Ok(())
        })
        .unwrap();
    let second = builder.describe("second", |_| Ok(())).unwrap();

    assert_eq!(registry.tests(), &[first, second]);
}

#[test]
fn test_hook_outside_suite_fails_fast() {
    let mut registry = Registry::new();
    let err = registry
        .builder()
        .after(|_| async { Ok(()) })
        .unwrap_err();

    assert_eq!(err, DslError::NoEnclosingSuite { call: "after" });
}

#[tokio::test]
async fn test_runner_over_subset_of_specs() {
    let mut registry = Registry::new();
    let mut builder = registry.builder();
    let broken = builder
        .describe("broken", |s| {
            s.it("fails", |_| async { Err("broken".into()) });
            Ok(())
        })
        .unwrap();
    let healthy = builder
        .describe("healthy", |s| {
            s.it("passes", |_| async { Ok(()) });
            Ok(())
        })
        .unwrap();

    let mut only_healthy = Runner::new(registry.tree(), vec![healthy]);
    only_healthy.run(&()).await;
    assert!(only_healthy.did_pass());

    let mut everything = Runner::new(registry.tree(), vec![broken, healthy]);
    everything.run(&()).await;
    assert!(!everything.did_pass());
}

#[tokio::test]
async fn test_runner_over_nested_suite_runs_only_its_own_hooks() {
    let seen: Seen = Rc::default();
    let mut registry = Registry::new();
    let (before, after) = (Rc::clone(&seen), Rc::clone(&seen));
    let outer = registry
        .builder()
        .describe("outer", move |s| {
            s.before(move |_| {
                before.borrow_mut().push("outer before".to_string());
                async { Ok(()) }
            })?;
            s.after(move |_| {
                after.borrow_mut().push("outer after".to_string());
                async { Ok(()) }
            })?;
            s.describe("inner", |s| {
                s.it("leaf", |_| async { Ok(()) });
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    let inner = registry.tree().children(outer)[0];

    let log = EventLog::new();
    let mut runner = Runner::new(registry.tree(), vec![inner]);
    runner.run(&log).await;

    assert!(runner.did_pass());
    assert!(seen.borrow().is_empty());
    assert_eq!(
        log.descriptions(EventKind::Completed),
        vec!["inner leaf", "inner"]
    );
}
