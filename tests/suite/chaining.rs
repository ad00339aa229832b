//! Reaction registration and derived value tests

use deferral_core::{Candidate, Handlers, Reason, SettlableValue, SettleState, Settlement};

use crate::common::{pending, recorder};

#[test]
fn doubling_handler_yields_42() {
    let (queue, a) = pending();
    let b = a.then(|x| Ok(Candidate::Plain(x * 2)));

    a.force_fulfilled(21);
    queue.run_until_idle().unwrap();

    assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(42)));
}

#[test]
fn rejection_passes_through_without_handlers() {
    let (queue, a) = pending();
    let b = a.register_reaction(Handlers::new());

    a.force_rejected(Reason::from("boom"));
    queue.run_until_idle().unwrap();

    assert_eq!(
        b.current_payload(),
        Some(Settlement::Rejected(Reason::from("boom")))
    );
}

#[test]
fn fulfillment_passes_through_a_rejection_handler() {
    let (queue, a) = pending();
    let b = a.catch(|_| Ok(Candidate::Plain(-1)));

    a.force_fulfilled(6);
    queue.run_until_idle().unwrap();

    assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(6)));
}

#[test]
fn only_the_matching_handler_runs() {
    let (queue, a) = pending();
    let calls = recorder();

    let on_value = calls.clone();
    let on_reason = calls.clone();
    let b = a.register_reaction(
        Handlers::new()
            .on_fulfilled(move |x: i64| -> Result<Candidate<i64, Reason>, Reason> {
                on_value.borrow_mut().push("fulfilled");
                Ok(Candidate::Plain(x))
            })
            .on_rejected(move |_: Reason| -> Result<Candidate<i64, Reason>, Reason> {
                on_reason.borrow_mut().push("rejected");
                Ok(Candidate::Plain(0))
            }),
    );

    a.force_rejected(Reason::from("no"));
    queue.run_until_idle().unwrap();

    assert_eq!(*calls.borrow(), vec!["rejected"]);
    assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(0)));
}

#[test]
fn handler_returning_pending_value_waits_for_it() {
    let (queue, a) = pending();
    let c = SettlableValue::new(queue.clone());
    let returned = c.clone();
    let d = a.then(move |_| Ok(Candidate::Settlable(returned)));

    a.force_fulfilled(1);
    queue.run_until_idle().unwrap();
    assert_eq!(d.current_state(), SettleState::Pending);

    c.force_fulfilled(99);
    queue.run_until_idle().unwrap();
    assert_eq!(d.current_payload(), Some(Settlement::Fulfilled(99)));
}

#[test]
fn failing_handler_rejects_its_derived_value_only() {
    let (queue, a) = pending();
    let failing = a.then(|_| Err(Reason::from("handler failed")));
    let sibling = a.then(|x| Ok(Candidate::Plain(x + 1)));

    a.force_fulfilled(5);
    queue.run_until_idle().unwrap();

    assert_eq!(
        failing.current_payload(),
        Some(Settlement::Rejected(Reason::from("handler failed")))
    );
    assert_eq!(sibling.current_payload(), Some(Settlement::Fulfilled(6)));
    assert_eq!(a.current_payload(), Some(Settlement::Fulfilled(5)));
}

#[test]
fn long_chain_settles_in_order() {
    let (queue, head) = pending();
    let mut tail = head.clone();
    for _ in 0..10 {
        tail = tail.then(|x| Ok(Candidate::Plain(x + 1)));
    }

    head.force_fulfilled(0);
    queue.run_until_idle().unwrap();

    assert_eq!(tail.current_payload(), Some(Settlement::Fulfilled(10)));
}

#[test]
fn recovery_then_continues_the_chain() {
    let (queue, a) = pending();
    let b = a
        .catch(|reason| Ok(Candidate::Plain(reason.as_str().len() as i64)))
        .then(|n| Ok(Candidate::Plain(n * 10)));

    a.force_rejected(Reason::from("four"));
    queue.run_until_idle().unwrap();

    assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(40)));
}
