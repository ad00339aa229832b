//! Producer handle tests

use deferral_core::{Candidate, Deferred, Reason, SettleState, Settlement, TaskQueue};

#[test]
fn consumers_see_the_producer_outcome() {
    let queue = TaskQueue::new();
    let deferred: Deferred<i64, Reason> = Deferred::new(queue.clone());
    let observed = deferred.promise().then(|x| Ok(Candidate::Plain(x * 3)));

    deferred.resolve(Candidate::Plain(4));
    queue.run_until_idle().unwrap();

    assert_eq!(observed.current_payload(), Some(Settlement::Fulfilled(12)));
}

#[test]
fn reject_is_ignored_after_resolve() {
    let queue = TaskQueue::new();
    let deferred: Deferred<i64, Reason> = Deferred::new(queue.clone());

    deferred.resolve(Candidate::Plain(1));
    deferred.reject(Reason::from("late"));

    assert_eq!(
        deferred.promise().current_payload(),
        Some(Settlement::Fulfilled(1))
    );
}

#[test]
fn resolving_with_a_pending_value_locks_in() {
    let queue = TaskQueue::new();
    let deferred: Deferred<i64, Reason> = Deferred::new(queue.clone());
    let inner: Deferred<i64, Reason> = Deferred::new(queue.clone());

    deferred.resolve(Candidate::from(inner.promise().clone()));
    queue.run_until_idle().unwrap();
    assert_eq!(deferred.promise().current_state(), SettleState::Pending);
    assert!(deferred.promise().is_resolved());

    deferred.reject(Reason::from("outer"));
    deferred.resolve(Candidate::Plain(2));
    assert_eq!(deferred.promise().current_state(), SettleState::Pending);

    inner.reject(Reason::from("inner"));
    queue.run_until_idle().unwrap();

    let promise = deferred.into_promise();
    assert_eq!(
        promise.current_payload(),
        Some(Settlement::Rejected(Reason::from("inner")))
    );
}
