//! The declaration DSL, specified with itself

use expressive_core::{Context, DslError, PropertyOptions, PropertyValue, SuiteBuilder, TestResult};
use expressive_harness::spec_file;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::future::{ready, Ready};
use std::process::ExitCode;
use std::rc::Rc;

type Counter = Rc<Cell<usize>>;

fn counting(counter: &Counter) -> impl Fn(Context) -> Ready<TestResult> {
    let counter = Rc::clone(counter);
    move |_| {
        counter.set(counter.get() + 1);
        ready(Ok(()))
    }
}

fn expect_count(counter: &Counter, expected: usize) -> impl Fn(Context) -> Ready<TestResult> {
    let counter = Rc::clone(counter);
    move |_| {
        assert_eq!(counter.get(), expected);
        ready(Ok(()))
    }
}

fn property_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    s.describe("property()", |s| {
        s.property("one", PropertyValue::generator(|_| 1))?;

        s.it("defines a property on the test", |ctx| async move {
            assert_eq!(*ctx.get::<i32>("one")?, 1);
            Ok(())
        });

        s.context("with an inner suite", |s| {
            s.it("is inherited", |ctx| async move {
                assert_eq!(*ctx.get::<i32>("one")?, 1);
                Ok(())
            });

            s.context("with an override", |s| {
                s.property("one", PropertyValue::generator(|_| "one"))?;

                s.it("is overridden", |ctx| async move {
                    assert_eq!(*ctx.get::<&str>("one")?, "one");
                    Ok(())
                });
                Ok(())
            })?;
            Ok(())
        })?;

        s.context("when given a constant", |s| {
            s.property("two", PropertyValue::constant(2))?;

            s.it("defines a property with the constant", |ctx| async move {
                assert_eq!(*ctx.get::<i32>("two")?, 2);
                Ok(())
            });
            Ok(())
        })?;

        s.context("when memoized", |s| {
            s.property_with(
                "subject",
                PropertyValue::generator(|_| Vec::<u8>::new()),
                PropertyOptions::memoized(),
            )?;

            s.it("returns the same value on every access", |ctx| async move {
                let first = ctx.get::<Vec<u8>>("subject")?;
                let second = ctx.get::<Vec<u8>>("subject")?;
                assert!(Rc::ptr_eq(&first, &second));
                Ok(())
            });
            Ok(())
        })?;

        s.context("when recomputed", |s| {
            s.property_with(
                "subject",
                PropertyValue::generator(|_| Vec::<u8>::new()),
                PropertyOptions::recomputed(),
            )?;

            s.it("returns a fresh value on every access", |ctx| async move {
                let first = ctx.get::<Vec<u8>>("subject")?;
                let second = ctx.get::<Vec<u8>>("subject")?;
                assert!(!Rc::ptr_eq(&first, &second));
                Ok(())
            });
            Ok(())
        })?;

        s.context("when a generator reads another property", |s| {
            s.property("base", PropertyValue::constant(20))?;
            s.property(
                "derived",
                PropertyValue::generator(|ctx| ctx.get::<i32>("base").map_or(0, |base| *base + 1)),
            )?;

            s.it("sees the test's own context", |ctx| async move {
                assert_eq!(*ctx.get::<i32>("derived")?, 21);
                Ok(())
            });
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn before_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    s.describe("before()", |s| {
        s.property("calls", PropertyValue::generator(|_| RefCell::new(Vec::<&str>::new())))?;
        s.before(|ctx| async move {
            ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow_mut().push("outer");
            Ok(())
        })?;

        s.it("is evaluated before tests in the same suite", |ctx| async move {
            assert_eq!(*ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow(), vec!["outer"]);
            Ok(())
        });

        s.context("with a nested suite", |s| {
            s.it("is inherited", |ctx| async move {
                assert_eq!(*ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow(), vec!["outer"]);
                Ok(())
            });
            Ok(())
        })?;

        s.context("called sequentially", |s| {
            s.before(|ctx| async move {
                ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow_mut().push("first");
                Ok(())
            })?;
            s.before(|ctx| async move {
                ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow_mut().push("second");
                Ok(())
            })?;

            s.it("chains the hooks outermost first", |ctx| async move {
                assert_eq!(
                    *ctx.get::<RefCell<Vec<&str>>>("calls")?.borrow(),
                    vec!["outer", "first", "second"]
                );
                Ok(())
            });
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn after_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    let after = Counter::default();

    s.describe("after()", |s| {
        s.after(counting(&after))?;

        s.it("runs after a test", |_| async { Ok(()) });
        s.it("has run once after the previous test", expect_count(&after, 1));

        s.context("with a nested suite", |s| {
            s.it("runs after a test", |_| async { Ok(()) });
            s.it("is inherited", expect_count(&after, 3));
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn before_all_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    let before_all = Counter::default();
    let first = Counter::default();
    let second = Counter::default();

    s.describe("before_all()", |s| {
        s.before_all(counting(&before_all))?;

        s.it(
            "is evaluated once before tests in the same suite",
            expect_count(&before_all, 1),
        );
        s.it("is not evaluated again for later tests", expect_count(&before_all, 1));

        s.context("called sequentially", |s| {
            s.before_all(counting(&first))?;
            s.before_all(counting(&second))?;

            s.it("runs every hook once", {
                let (first, second) = (Rc::clone(&first), Rc::clone(&second));
                move |_| {
                    assert_eq!((first.get(), second.get()), (1, 1));
                    ready(Ok(()))
                }
            });

            s.it("does not re-run the enclosing suite's hooks", expect_count(&before_all, 1));
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn after_all_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    let first = Counter::default();
    let second = Counter::default();

    s.describe("after_all() setup", |s| {
        s.after_all(counting(&first))?;
        s.after_all(counting(&second))?;

        s.it("runs a test", |_| async { Ok(()) });
        s.it("and another", |_| async { Ok(()) });
        Ok(())
    })?;

    s.describe("after_all()", |s| {
        s.it("was evaluated once after the previous suite", expect_count(&first, 1));

        s.context("called sequentially", |s| {
            s.it("chains the hooks together", expect_count(&second, 1));
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn pending_spec(s: &mut SuiteBuilder<'_>) -> Result<(), DslError> {
    s.describe("pending tests", |s| {
        s.it_pending("has no body yet");
        s.xit("is disabled", |_| async { Err("disabled tests never run".into()) });
        Ok(())
    })?;
    Ok(())
}

fn main() -> ExitCode {
    expressive_harness::main(&[
        spec_file!(property_spec),
        spec_file!(before_spec),
        spec_file!(after_spec),
        spec_file!(before_all_spec),
        spec_file!(after_all_spec),
        spec_file!(pending_spec),
    ])
}
