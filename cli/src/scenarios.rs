//! Built-in conformance scenarios.
//!
//! Each scenario gets a fresh [`Harness`]: its own task queue, from which it
//! creates deferred values over JSON payloads, settles them, flushes the
//! queue, and checks the observed settlements.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};
use serde_json::{Value, json};

use deferral_core::{
    Candidate, Deferred, Handlers, Reason, ResolvingFunctions, Scheduler, SettlableValue,
    SettleState, Settlement, TaskQueue, ThenMember, Thenable,
};

pub(crate) type Promise = SettlableValue<Value, Reason>;

pub(crate) struct Scenario {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
    run: fn(&Harness) -> Result<()>,
}

impl Scenario {
    pub(crate) fn run(&self, turn_limit: usize) -> Result<()> {
        let harness = Harness::new(turn_limit);
        (self.run)(&harness)
    }
}

/// Per-scenario environment: one task queue and a factory for deferred values.
pub(crate) struct Harness {
    queue: Rc<TaskQueue>,
}

impl Harness {
    fn new(turn_limit: usize) -> Self {
        Self {
            queue: TaskQueue::with_turn_limit(turn_limit),
        }
    }

    fn deferred(&self) -> Deferred<Value, Reason> {
        Deferred::new(self.queue.clone())
    }

    fn promise(&self) -> Promise {
        SettlableValue::new(self.queue.clone())
    }

    fn flush(&self) -> Result<usize> {
        self.queue
            .run_until_idle()
            .context("flushing the task queue")
    }

    fn schedule(&self, task: impl FnOnce() + 'static) {
        self.queue.schedule(Box::new(task));
    }
}

fn expect_fulfilled(promise: &Promise, expected: &Value) -> Result<()> {
    match promise.current_payload() {
        Some(Settlement::Fulfilled(value)) if value == *expected => Ok(()),
        Some(Settlement::Fulfilled(value)) => {
            bail!("fulfilled with {value}, expected {expected}")
        }
        Some(Settlement::Rejected(reason)) => {
            bail!("rejected with {reason:?}, expected {expected}")
        }
        None => bail!("still pending, expected fulfillment with {expected}"),
    }
}

fn expect_rejected(promise: &Promise, expected: &Reason) -> Result<()> {
    match promise.current_payload() {
        Some(Settlement::Rejected(reason)) if reason == *expected => Ok(()),
        Some(Settlement::Rejected(reason)) => {
            bail!("rejected with {reason:?}, expected {expected:?}")
        }
        Some(Settlement::Fulfilled(value)) => {
            bail!("fulfilled with {value}, expected {expected:?}")
        }
        None => bail!("still pending, expected rejection with {expected:?}"),
    }
}

fn expect_pending(promise: &Promise) -> Result<()> {
    let state = promise.current_state();
    ensure!(state == SettleState::Pending, "expected pending, found {state}");
    Ok(())
}

// ============================================================================
// Foreign thenables
// ============================================================================

type Script = Box<dyn FnOnce(ResolvingFunctions<Value, Reason>) -> Result<(), Reason>>;

/// A thenable whose callable `then` runs a script.
struct ScriptedThenable {
    script: RefCell<Option<Script>>,
}

impl ScriptedThenable {
    fn candidate<F>(script: F) -> Candidate<Value, Reason>
    where
        F: FnOnce(ResolvingFunctions<Value, Reason>) -> Result<(), Reason> + 'static,
    {
        Candidate::thenable(Self {
            script: RefCell::new(Some(Box::new(script))),
        })
    }
}

impl Thenable<Value, Reason> for ScriptedThenable {
    fn then_member(&self) -> Result<ThenMember<Value, Reason>, Reason> {
        let script = self
            .script
            .borrow_mut()
            .take()
            .ok_or_else(|| Reason::from("then member already consumed"))?;
        Ok(ThenMember::Callable(script))
    }
}

/// An object whose `then` property is data, not a function.
struct DataObject(Value);

impl Thenable<Value, Reason> for DataObject {
    fn then_member(&self) -> Result<ThenMember<Value, Reason>, Reason> {
        Ok(ThenMember::NotCallable(self.0.clone()))
    }
}

/// An object whose `then` getter fails.
struct ThrowingGetter(&'static str);

impl Thenable<Value, Reason> for ThrowingGetter {
    fn then_member(&self) -> Result<ThenMember<Value, Reason>, Reason> {
        Err(Reason::from(self.0))
    }
}

// ============================================================================
// Catalogue
// ============================================================================

pub(crate) fn catalogue() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "single_settlement",
            summary: "only the first settlement call has an effect",
            run: single_settlement,
        },
        Scenario {
            name: "fifo_order",
            summary: "reactions run in registration order with the same value",
            run: fifo_order,
        },
        Scenario {
            name: "asynchrony",
            summary: "handlers never run inside the settling or registering call",
            run: asynchrony,
        },
        Scenario {
            name: "passthrough",
            summary: "missing handlers pass values and reasons through",
            run: passthrough,
        },
        Scenario {
            name: "nested_pending_value",
            summary: "a pending candidate postpones settlement and is mirrored",
            run: nested_pending_value,
        },
        Scenario {
            name: "resolution_locks_in",
            summary: "settling with a pending value ignores every later settlement call",
            run: resolution_locks_in,
        },
        Scenario {
            name: "self_resolution",
            summary: "resolving a value with itself rejects with a type mismatch",
            run: self_resolution,
        },
        Scenario {
            name: "thenable_double_call",
            summary: "only the first thenable callback settles the target",
            run: thenable_double_call,
        },
        Scenario {
            name: "doubling_chain",
            summary: "x => x * 2 on 21 yields 42",
            run: doubling_chain,
        },
        Scenario {
            name: "rejection_passthrough",
            summary: "a rejection flows through a reaction without handlers",
            run: rejection_passthrough,
        },
        Scenario {
            name: "handler_returns_pending_value",
            summary: "a handler returning a pending value settles once that value does",
            run: handler_returns_pending_value,
        },
        Scenario {
            name: "handler_failure_is_isolated",
            summary: "a failing handler rejects its own derived value only",
            run: handler_failure_is_isolated,
        },
        Scenario {
            name: "throwing_then_getter",
            summary: "a failing `then` read rejects the target",
            run: throwing_then_getter,
        },
        Scenario {
            name: "non_callable_then",
            summary: "a non-callable `then` fulfills with the object itself",
            run: non_callable_then,
        },
        Scenario {
            name: "failure_after_resolve",
            summary: "a `then` failure after a callback fired is swallowed",
            run: failure_after_resolve,
        },
        Scenario {
            name: "deferred_thenable_callbacks",
            summary: "thenable callbacks invoked on a later turn still settle the target",
            run: deferred_thenable_callbacks,
        },
    ]
}

fn single_settlement(harness: &Harness) -> Result<()> {
    let deferred = harness.deferred();
    let promise = deferred.promise();

    ensure!(promise.force_fulfilled(json!(1)), "first fulfillment was ignored");
    ensure!(!promise.force_fulfilled(json!(2)), "second fulfillment took effect");
    ensure!(
        !promise.force_rejected(Reason::from("late")),
        "rejection after fulfillment took effect"
    );
    deferred.resolve(Candidate::Plain(json!(3)));
    deferred.reject(Reason::from("later"));

    harness.flush()?;
    expect_fulfilled(promise, &json!(1))
}

fn fifo_order(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for index in 0..5 {
        let seen = Rc::clone(&seen);
        promise.then(move |value| {
            seen.borrow_mut().push((index, value.clone()));
            Ok(Candidate::Plain(value))
        });
    }
    promise.force_fulfilled(json!("v"));
    harness.flush()?;

    let expected: Vec<_> = (0..5).map(|index| (index, json!("v"))).collect();
    ensure!(
        *seen.borrow() == expected,
        "observed {:?}, expected {:?}",
        seen.borrow(),
        expected
    );
    Ok(())
}

fn asynchrony(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    let calls = Rc::new(RefCell::new(0u32));

    let counter = Rc::clone(&calls);
    promise.then(move |value| {
        *counter.borrow_mut() += 1;
        Ok(Candidate::Plain(value))
    });
    promise.force_fulfilled(json!(true));
    ensure!(*calls.borrow() == 0, "handler ran inside force_fulfilled");

    let counter = Rc::clone(&calls);
    promise.then(move |value| {
        *counter.borrow_mut() += 1;
        Ok(Candidate::Plain(value))
    });
    ensure!(
        *calls.borrow() == 0,
        "handler ran inside registration on a settled value"
    );

    harness.flush()?;
    ensure!(*calls.borrow() == 2, "expected 2 calls, saw {}", calls.borrow());
    Ok(())
}

fn passthrough(harness: &Harness) -> Result<()> {
    let fulfilled = harness.promise();
    let rejected = harness.promise();
    let value_out = fulfilled.register_reaction(Handlers::new());
    let reason_out = rejected.register_reaction(Handlers::new());

    fulfilled.force_fulfilled(json!({ "k": 1 }));
    rejected.force_rejected(Reason::from("r"));
    harness.flush()?;

    expect_fulfilled(&value_out, &json!({ "k": 1 })).context("fulfilled branch")?;
    expect_rejected(&reason_out, &Reason::from("r")).context("rejected branch")
}

fn nested_pending_value(harness: &Harness) -> Result<()> {
    let inner = harness.deferred();
    let target = harness.promise();

    target.settle_with(Candidate::Settlable(inner.promise().clone()));
    harness.flush()?;
    expect_pending(&target).context("before the inner value settled")?;

    inner.reject(Reason::from("inner"));
    harness.flush()?;
    expect_rejected(&target, &Reason::from("inner"))
}

fn resolution_locks_in(harness: &Harness) -> Result<()> {
    let inner = harness.promise();
    let target = harness.promise();

    target.settle_with(Candidate::Settlable(inner.clone()));
    ensure!(
        !target.force_rejected(Reason::from("second call")),
        "rejection after locking in took effect"
    );
    target.settle_with(Candidate::Plain(json!("third call")));
    expect_pending(&target).context("before the adopted value settled")?;

    inner.force_fulfilled(json!(7));
    harness.flush()?;
    expect_fulfilled(&target, &json!(7))
}

fn self_resolution(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    promise.settle_with(Candidate::Settlable(promise.clone()));

    match promise.current_payload() {
        Some(Settlement::Rejected(Reason::TypeMismatch(_))) => Ok(()),
        other => bail!("expected a type mismatch rejection, found {other:?}"),
    }
}

fn thenable_double_call(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    promise.settle_with(ScriptedThenable::candidate(|functions| {
        functions.resolve(Candidate::Plain(json!("first")));
        functions.resolve(Candidate::Plain(json!("second")));
        functions.reject(Reason::from("third"));
        Ok(())
    }));

    harness.flush()?;
    expect_fulfilled(&promise, &json!("first"))
}

fn doubling_chain(harness: &Harness) -> Result<()> {
    let a = harness.promise();
    let b = a.register_reaction(Handlers::new().on_fulfilled(
        |x: Value| -> Result<Candidate<Value, Reason>, Reason> {
            let n = x.as_i64().ok_or_else(|| Reason::from("not an integer"))?;
            Ok(Candidate::Plain(json!(n * 2)))
        },
    ));

    a.force_fulfilled(json!(21));
    harness.flush()?;
    expect_fulfilled(&b, &json!(42))
}

fn rejection_passthrough(harness: &Harness) -> Result<()> {
    let a = harness.promise();
    let b = a.register_reaction(Handlers::new());

    a.force_rejected(Reason::from("boom"));
    harness.flush()?;
    expect_rejected(&b, &Reason::from("boom"))
}

fn handler_returns_pending_value(harness: &Harness) -> Result<()> {
    let a = harness.promise();
    let c = harness.promise();

    let returned = c.clone();
    let d = a.then(move |_| Ok(Candidate::Settlable(returned)));

    a.force_fulfilled(json!(1));
    harness.flush()?;
    expect_pending(&d).context("before the returned value settled")?;

    c.force_fulfilled(json!("done"));
    harness.flush()?;
    expect_fulfilled(&d, &json!("done"))
}

fn handler_failure_is_isolated(harness: &Harness) -> Result<()> {
    let a = harness.promise();
    let failing = a.then(|_| Err(Reason::from("handler failed")));
    let sibling = a.then(|value| Ok(Candidate::Plain(value)));

    a.force_fulfilled(json!(5));
    harness.flush()?;

    expect_rejected(&failing, &Reason::from("handler failed"))?;
    expect_fulfilled(&sibling, &json!(5))?;
    expect_fulfilled(&a, &json!(5))
}

fn throwing_then_getter(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    promise.settle_with(Candidate::thenable(ThrowingGetter("getter threw")));
    expect_rejected(&promise, &Reason::from("getter threw"))
}

fn non_callable_then(harness: &Harness) -> Result<()> {
    let object = json!({ "then": 5 });
    let promise = harness.promise();
    promise.settle_with(Candidate::thenable(DataObject(object.clone())));
    expect_fulfilled(&promise, &object)
}

fn failure_after_resolve(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    promise.settle_with(ScriptedThenable::candidate(|functions| {
        functions.resolve(Candidate::Plain(json!("kept")));
        Err(Reason::from("thrown afterwards"))
    }));
    expect_fulfilled(&promise, &json!("kept"))
}

fn deferred_thenable_callbacks(harness: &Harness) -> Result<()> {
    let promise = harness.promise();
    let stash: Rc<RefCell<Option<ResolvingFunctions<Value, Reason>>>> =
        Rc::new(RefCell::new(None));

    let slot = Rc::clone(&stash);
    promise.settle_with(ScriptedThenable::candidate(move |functions| {
        *slot.borrow_mut() = Some(functions);
        Ok(())
    }));
    expect_pending(&promise).context("before the callbacks fired")?;

    let functions = stash
        .borrow_mut()
        .take()
        .context("thenable did not receive its callbacks")?;
    harness.schedule(move || {
        functions.resolve(Candidate::Plain(json!("later")));
        functions.reject(Reason::from("ignored"));
    });

    harness.flush()?;
    expect_fulfilled(&promise, &json!("later"))
}
