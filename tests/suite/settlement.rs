//! Settle-once state machine tests

use deferral_core::{Candidate, Reason, SettlableValue, SettleState, Settlement};
use deferral_types::ResolutionError;

use crate::common::pending;

#[test]
fn pending_value_has_no_payload() {
    let (queue, value) = pending();
    assert_eq!(value.current_state(), SettleState::Pending);
    assert!(value.current_payload().is_none());
    assert!(queue.is_empty());
}

#[test]
fn fulfillment_is_final() {
    let (_queue, value) = pending();

    assert!(value.force_fulfilled(1));
    assert!(!value.force_fulfilled(2));
    assert!(!value.force_rejected(Reason::from("late")));
    value.settle_with(Candidate::Plain(3));

    assert_eq!(value.current_state(), SettleState::Fulfilled);
    assert_eq!(value.current_payload(), Some(Settlement::Fulfilled(1)));
}

#[test]
fn rejection_is_final() {
    let (_queue, value) = pending();

    assert!(value.force_rejected(Reason::from("first")));
    assert!(!value.force_rejected(Reason::from("second")));
    assert!(!value.force_fulfilled(1));

    assert_eq!(
        value.current_payload(),
        Some(Settlement::Rejected(Reason::from("first")))
    );
}

#[test]
fn self_resolution_rejects_with_type_mismatch() {
    let (_queue, value) = pending();
    value.settle_with(Candidate::Settlable(value.clone()));

    assert_eq!(
        value.current_payload(),
        Some(Settlement::Rejected(Reason::from(
            ResolutionError::SelfResolution
        )))
    );
    assert!(matches!(
        value.current_payload(),
        Some(Settlement::Rejected(Reason::TypeMismatch(_)))
    ));
}

#[test]
fn clones_observe_the_same_settlement() {
    let (_queue, value) = pending();
    let alias = value.clone();

    alias.force_fulfilled(8);

    assert!(alias.same_value(&value));
    assert_eq!(value.current_payload(), Some(Settlement::Fulfilled(8)));
}

#[test]
fn settled_value_adopted_synchronously() {
    let (queue, source) = pending();
    let target = SettlableValue::new(queue.clone());

    source.force_rejected(Reason::from("copied"));
    target.settle_with(Candidate::Settlable(source));

    assert_eq!(
        target.current_payload(),
        Some(Settlement::Rejected(Reason::from("copied")))
    );
}

#[test]
fn pending_value_is_mirrored_once_it_settles() {
    let (queue, source) = pending();
    let target = SettlableValue::new(queue.clone());

    target.settle_with(Candidate::from(source.clone()));
    queue.run_until_idle().unwrap();
    assert_eq!(target.current_state(), SettleState::Pending);

    source.force_fulfilled(12);
    queue.run_until_idle().unwrap();
    assert_eq!(target.current_payload(), Some(Settlement::Fulfilled(12)));
}

#[test]
fn first_call_wins_even_when_it_leaves_the_value_pending() {
    let (queue, inner) = pending();
    let target = SettlableValue::new(queue.clone());

    target.settle_with(Candidate::Settlable(inner.clone()));
    assert!(!target.force_rejected(Reason::from("second call")));
    assert!(!target.force_fulfilled(0));
    target.settle_with(Candidate::Plain(1));
    assert_eq!(target.current_state(), SettleState::Pending);

    inner.force_fulfilled(7);
    queue.run_until_idle().unwrap();
    assert_eq!(target.current_payload(), Some(Settlement::Fulfilled(7)));
}

#[test]
fn force_on_a_derived_value_beats_its_handler() {
    let (queue, a) = pending();
    let derived = a.then(|x| Ok(Candidate::Plain(x + 1)));

    assert!(derived.force_rejected(Reason::from("cancelled")));
    a.force_fulfilled(1);
    queue.run_until_idle().unwrap();

    assert_eq!(
        derived.current_payload(),
        Some(Settlement::Rejected(Reason::from("cancelled")))
    );
}
