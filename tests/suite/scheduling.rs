//! Asynchrony and ordering tests

use std::cell::Cell;
use std::rc::Rc;

use deferral_core::{
    Candidate, Scheduler, SchedulerError, SettlableValue, Settlement, Task, TaskQueue,
};

use crate::common::{Value, pending, recorder};

#[test]
fn handlers_never_run_inside_force_fulfilled() {
    let (queue, value) = pending();
    let seen = recorder();

    let sink = seen.clone();
    value.then(move |x| {
        sink.borrow_mut().push(x);
        Ok(Candidate::Plain(x))
    });
    value.force_fulfilled(3);
    assert!(seen.borrow().is_empty());

    queue.run_until_idle().unwrap();
    assert_eq!(*seen.borrow(), vec![3]);
}

#[test]
fn registration_on_settled_value_defers_the_handler() {
    let (queue, value) = pending();
    value.force_fulfilled(3);
    let seen = recorder();

    let sink = seen.clone();
    let derived = value.then(move |x| {
        sink.borrow_mut().push(x);
        Ok(Candidate::Plain(x))
    });
    assert!(seen.borrow().is_empty());
    assert!(derived.current_payload().is_none());

    queue.run_until_idle().unwrap();
    assert_eq!(*seen.borrow(), vec![3]);
}

#[test]
fn reactions_run_in_registration_order_with_the_same_value() {
    let (queue, value) = pending();
    let seen = recorder();

    for index in 0..5 {
        let sink = seen.clone();
        value.then(move |x| {
            sink.borrow_mut().push((index, x));
            Ok(Candidate::Plain(x))
        });
    }
    value.force_fulfilled(7);
    queue.run_until_idle().unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![(0, 7), (1, 7), (2, 7), (3, 7), (4, 7)]
    );
    assert_eq!(value.queued_reactions(), 0);
}

#[test]
fn earlier_tasks_run_before_the_drain() {
    let (queue, value) = pending();
    let order = recorder();

    let sink = order.clone();
    value.then(move |x| {
        sink.borrow_mut().push("handler");
        Ok(Candidate::Plain(x))
    });
    let sink = order.clone();
    queue.schedule(Box::new(move || sink.borrow_mut().push("earlier task")));
    value.force_fulfilled(1);
    queue.run_until_idle().unwrap();

    assert_eq!(*order.borrow(), vec!["earlier task", "handler"]);
}

#[test]
fn settling_with_no_reactions_schedules_nothing() {
    let (queue, value) = pending();
    value.force_rejected("unobserved".into());
    assert!(queue.is_empty());
    assert_eq!(queue.run_until_idle().unwrap(), 0);
}

#[test]
fn values_on_different_queues_are_independent() {
    let (first_queue, first) = pending();
    let (second_queue, second) = pending();
    let a = first.then(|x| Ok(Candidate::Plain(x)));
    let b = second.then(|x| Ok(Candidate::Plain(x)));

    first.force_fulfilled(1);
    second.force_fulfilled(2);
    first_queue.run_until_idle().unwrap();

    assert_eq!(a.current_payload(), Some(Settlement::Fulfilled(1)));
    assert!(b.current_payload().is_none());

    second_queue.run_until_idle().unwrap();
    assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(2)));
}

#[test]
fn runaway_chain_hits_the_turn_limit() {
    // Every handler settles a fresh value and reacts to it, one task per turn.
    fn bounce(value: &Value, queue: &Rc<TaskQueue>) {
        let queue = Rc::clone(queue);
        value.then(move |x| {
            let next: Value = SettlableValue::new(queue.clone());
            next.force_fulfilled(x + 1);
            bounce(&next, &queue);
            Ok(Candidate::Plain(x))
        });
    }

    let queue = TaskQueue::with_turn_limit(8);
    let value: Value = SettlableValue::new(queue.clone());
    bounce(&value, &queue);
    value.force_fulfilled(0);

    let err = queue.run_until_idle().unwrap_err();
    assert!(matches!(err, SchedulerError::TurnLimitExceeded { limit: 8, .. }));
    assert_eq!(queue.turns(), 8);
}

#[test]
fn custom_scheduler_receives_drains() {
    struct Recording {
        inner: Rc<TaskQueue>,
        scheduled: Cell<usize>,
    }

    impl Scheduler for Recording {
        fn schedule(&self, task: Task) {
            self.scheduled.set(self.scheduled.get() + 1);
            self.inner.schedule(task);
        }
    }

    let inner = TaskQueue::new();
    let scheduler = Rc::new(Recording {
        inner: inner.clone(),
        scheduled: Cell::new(0),
    });
    let value: Value = SettlableValue::new(scheduler.clone());
    let derived = value.then(|x| Ok(Candidate::Plain(x)));

    value.force_fulfilled(4);
    assert_eq!(scheduler.scheduled.get(), 1);

    inner.run_until_idle().unwrap();
    assert_eq!(derived.current_payload(), Some(Settlement::Fulfilled(4)));
}
