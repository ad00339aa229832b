//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use deferral_core::{
    Candidate, Reason, ResolvingFunctions, SettlableValue, TaskQueue, ThenMember, Thenable,
};

pub type Value = SettlableValue<i64, Reason>;

/// A fresh queue and a pending value scheduled on it.
pub fn pending() -> (Rc<TaskQueue>, Value) {
    let queue = TaskQueue::new();
    let value = SettlableValue::new(queue.clone());
    (queue, value)
}

/// Shared log that handlers append to.
pub fn recorder<T>() -> Rc<RefCell<Vec<T>>> {
    Rc::new(RefCell::new(Vec::new()))
}

type Script = Box<dyn FnOnce(ResolvingFunctions<i64, Reason>) -> Result<(), Reason>>;

/// Thenable whose `then` runs a script once, counting member reads.
pub struct ScriptedThenable {
    script: RefCell<Option<Script>>,
    reads: Rc<RefCell<u32>>,
}

impl ScriptedThenable {
    pub fn new<F>(script: F) -> Self
    where
        F: FnOnce(ResolvingFunctions<i64, Reason>) -> Result<(), Reason> + 'static,
    {
        Self {
            script: RefCell::new(Some(Box::new(script))),
            reads: Rc::new(RefCell::new(0)),
        }
    }

    pub fn reads(&self) -> Rc<RefCell<u32>> {
        Rc::clone(&self.reads)
    }
}

impl Thenable<i64, Reason> for ScriptedThenable {
    fn then_member(&self) -> Result<ThenMember<i64, Reason>, Reason> {
        *self.reads.borrow_mut() += 1;
        match self.script.borrow_mut().take() {
            Some(script) => Ok(ThenMember::Callable(script)),
            None => Err(Reason::from("then read twice")),
        }
    }
}

/// Shorthand for a scripted thenable candidate.
pub fn scripted<F>(script: F) -> Candidate<i64, Reason>
where
    F: FnOnce(ResolvingFunctions<i64, Reason>) -> Result<(), Reason> + 'static,
{
    Candidate::thenable(ScriptedThenable::new(script))
}
