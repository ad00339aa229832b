//! Deferred task execution.
//!
//! The core never runs a continuation on the caller's stack. Every drain pass
//! is handed to a [`Scheduler`], which runs it later in submission order. The
//! host supplies the scheduler; [`TaskQueue`] is the deterministic in-process
//! implementation used by the runner and by tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Default cap on tasks run by one [`TaskQueue::run_until_idle`] call.
pub const DEFAULT_TURN_LIMIT: usize = 10_000;

/// Host task-scheduling service.
///
/// Contract:
/// - `task` must not run inside the `schedule` call.
/// - Tasks run in the order they were scheduled.
/// - A task never runs re-entrantly inside another task.
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// `run_until_idle` ran `limit` tasks and the queue was still not empty.
    #[error("task queue still busy after {limit} turns ({remaining} task(s) pending)")]
    TurnLimitExceeded { limit: usize, remaining: usize },
}

/// FIFO task queue driven explicitly by its owner.
///
/// Nothing runs until [`run_next`](Self::run_next) or
/// [`run_until_idle`](Self::run_until_idle) is called, which makes every
/// interleaving reproducible.
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
    turn_limit: usize,
    turns: Cell<u64>,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Self::with_turn_limit(DEFAULT_TURN_LIMIT)
    }

    #[must_use]
    pub fn with_turn_limit(turn_limit: usize) -> Rc<Self> {
        Rc::new(Self {
            tasks: RefCell::new(VecDeque::new()),
            turn_limit: turn_limit.max(1),
            turns: Cell::new(0),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    #[must_use]
    pub fn turn_limit(&self) -> usize {
        self.turn_limit
    }

    /// Total number of tasks this queue has run.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.turns.get()
    }

    /// Run the oldest task, if any. Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        // The borrow must end before the task runs: tasks schedule more tasks.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                self.turns.set(self.turns.get().wrapping_add(1));
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled along the way.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> Result<usize, SchedulerError> {
        let mut ran = 0;
        while ran < self.turn_limit {
            if !self.run_next() {
                return Ok(ran);
            }
            ran += 1;
        }

        let remaining = self.len();
        if remaining == 0 {
            return Ok(ran);
        }
        tracing::warn!(
            limit = self.turn_limit,
            remaining,
            "Task queue hit its turn limit"
        );
        Err(SchedulerError::TurnLimitExceeded {
            limit: self.turn_limit,
            remaining,
        })
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .field("turn_limit", &self.turn_limit)
            .field("turns", &self.turns.get())
            .finish()
    }
}
