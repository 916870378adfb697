//! Scheduler - microtask queue, de-duplicated job queue and `next_tick`.
//!
//! The runtime has no event loop of its own. Deferred work goes onto a
//! per-thread microtask queue that the embedder drains with
//! [`run_microtasks`] (once per host event-loop turn), or that is drained
//! implicitly by awaiting a [`NextTick`].
//!
//! # Batching
//!
//! ```text
//! count.set(1) ─► render effect scheduler ─► queue_job(update) ─┐
//! count.set(2) ─► render effect scheduler ─► queue_job(update) ─┤ (deduplicated)
//!                                                               ▼
//!                              microtask: flush_jobs() ─► update() runs once
//! ```
//!
//! Jobs queued while a flush is running join the same flush. There is no
//! separate "flush again" pass, so a job re-queued after it ran runs again.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::FusedFuture;

// =============================================================================
// Microtask Queue
// =============================================================================

type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Defer `task` to the end of the current turn.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run queued microtasks, including any queued while draining, until the
/// queue is empty. Returns the number of microtasks run.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = next else { break };
        task();
        ran += 1;
    }
    ran
}

/// Number of microtasks waiting to run.
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}

// =============================================================================
// Job Queue
// =============================================================================

/// Identity used to de-duplicate queued jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

/// A unit of deferred work, typically a component's update runner.
#[derive(Clone)]
pub struct SchedulerJob {
    id: JobId,
    run: Rc<dyn Fn()>,
}

impl SchedulerJob {
    pub fn new(id: JobId, run: impl Fn() + 'static) -> Self {
        Self {
            id,
            run: Rc::new(run),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn run(&self) {
        (self.run)()
    }
}

impl fmt::Debug for SchedulerJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchedulerJob").field(&self.id).finish()
    }
}

thread_local! {
    static QUEUE: RefCell<VecDeque<SchedulerJob>> = RefCell::new(VecDeque::new());
    static IS_FLUSH_PENDING: Cell<bool> = const { Cell::new(false) };
}

/// Queue `job` unless a job with the same id is already waiting, then make
/// sure a flush is scheduled.
pub fn queue_job(job: SchedulerJob) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if !queue.iter().any(|queued| queued.id == job.id) {
            queue.push_back(job);
        }
    });
    queue_flush();
}

/// Drop a queued job, e.g. because its work is being done right now.
pub fn invalidate_job(id: JobId) {
    QUEUE.with(|queue| queue.borrow_mut().retain(|queued| queued.id != id));
}

fn queue_flush() {
    if IS_FLUSH_PENDING.with(|pending| pending.replace(true)) {
        return;
    }
    queue_microtask(flush_jobs);
}

fn flush_jobs() {
    IS_FLUSH_PENDING.with(|pending| pending.set(false));
    let mut flushed = 0usize;
    loop {
        let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        let Some(job) = next else { break };
        job.run();
        flushed += 1;
    }
    tracing::trace!(jobs = flushed, "flushed scheduler queue");
}

/// Number of jobs waiting for the next flush.
pub fn queued_jobs() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

// =============================================================================
// next_tick
// =============================================================================

#[derive(Default)]
struct TickState {
    resolved: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl TickState {
    fn resolve(&self) {
        self.resolved.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future that resolves once everything queued before it has run.
///
/// Polling an unresolved `NextTick` drains the microtask queue, so it can be
/// awaited from any executor on the runtime's thread.
#[must_use = "a NextTick does nothing unless awaited or polled"]
pub struct NextTick {
    state: Rc<TickState>,
    terminated: bool,
}

impl NextTick {
    pub fn is_resolved(&self) -> bool {
        self.state.resolved.get()
    }
}

impl Future for NextTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.state.resolved.get() {
            run_microtasks();
        }
        if self.state.resolved.get() {
            self.terminated = true;
            Poll::Ready(())
        } else {
            *self.state.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl FusedFuture for NextTick {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Resolve after the current job queue has been flushed.
pub fn next_tick() -> NextTick {
    let state = Rc::new(TickState::default());
    let resolver = state.clone();
    queue_microtask(move || resolver.resolve());
    NextTick {
        state,
        terminated: false,
    }
}

/// Run `f` after the current job queue has been flushed.
pub fn next_tick_then(f: impl FnOnce() + 'static) -> NextTick {
    let state = Rc::new(TickState::default());
    let resolver = state.clone();
    queue_microtask(move || {
        f();
        resolver.resolve();
    });
    NextTick {
        state,
        terminated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn counting_job(id: u64, counter: &Rc<Cell<u32>>) -> SchedulerJob {
        let counter = counter.clone();
        SchedulerJob::new(JobId(id), move || counter.set(counter.get() + 1))
    }

    #[test]
    fn test_jobs_are_deferred() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(1, &runs));
        assert_eq!(runs.get(), 0);
        assert_eq!(queued_jobs(), 1);

        run_microtasks();
        assert_eq!(runs.get(), 1);
        assert_eq!(queued_jobs(), 0);
    }

    #[test]
    fn test_duplicate_jobs_collapse() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(7, &runs));
        queue_job(counting_job(7, &runs));
        queue_job(counting_job(7, &runs));
        // Only one flush microtask is scheduled.
        assert_eq!(pending_microtasks(), 1);

        run_microtasks();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in [3u64, 1, 2] {
            let order = order.clone();
            queue_job(SchedulerJob::new(JobId(id), move || order.borrow_mut().push(id)));
        }
        run_microtasks();
        assert_eq!(*order.borrow(), vec![3, 1, 2]);
    }

    #[test]
    fn test_job_queued_during_flush_runs_in_same_flush() {
        let runs = Rc::new(Cell::new(0));
        let inner = counting_job(2, &runs);
        queue_job(SchedulerJob::new(JobId(1), move || queue_job(inner.clone())));

        run_microtasks();
        assert_eq!(runs.get(), 1);
        assert_eq!(queued_jobs(), 0);
    }

    #[test]
    fn test_invalidated_job_does_not_run() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(1, &runs));
        queue_job(counting_job(2, &runs));
        invalidate_job(JobId(1));
        assert_eq!(queued_jobs(), 1);

        run_microtasks();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_next_tick_observes_flush() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(1, &runs));

        block_on(next_tick());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_next_tick_then_runs_after_flush() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(1, &runs));

        let seen = Rc::new(Cell::new(0));
        let (r, s) = (runs.clone(), seen.clone());
        let tick = next_tick_then(move || s.set(r.get()));
        assert!(!tick.is_resolved());

        block_on(tick);
        assert_eq!(seen.get(), 1);
    }
}
