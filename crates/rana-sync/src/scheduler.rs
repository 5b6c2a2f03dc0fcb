//! Interval-based task scheduler
//!
//! A single timer ticks every [`GLOBAL_CHECK_INTERVAL`] and dispatches every
//! task whose own interval has elapsed onto a bounded worker pool. Tasks that
//! have never run are due immediately. A slow task does not block the timer,
//! so two runs of the same task may overlap.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

pub const GLOBAL_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Work that runs periodically under a [`PersistentTaskScheduler`]
#[async_trait]
pub trait PersistentTask: Send + Sync {
    async fn run(&self);

    fn name(&self) -> &str {
        "task"
    }
}

struct TaskEntry {
    task: Arc<dyn PersistentTask>,
    interval: Duration,
    last_run: Option<Instant>,
}

impl TaskEntry {
    fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }
}

type TaskList = Arc<Mutex<Vec<TaskEntry>>>;

pub struct PersistentTaskScheduler {
    tasks: TaskList,
    pool: Arc<Semaphore>,
    check_interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PersistentTaskScheduler {
    /// Scheduler running at most `max_workers` task runs at once
    pub fn new(max_workers: usize) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            pool: Arc::new(Semaphore::new(max_workers.max(1))),
            check_interval: GLOBAL_CHECK_INTERVAL,
            timer: Mutex::new(None),
        }
    }

    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    pub fn add_task(&self, task: Arc<dyn PersistentTask>, interval: Duration) {
        debug!(task = task.name(), ?interval, "Task scheduled");
        lock(&self.tasks).push(TaskEntry { task, interval, last_run: None });
    }

    /// Remove every registration of `task`; returns whether any existed
    pub fn remove_task(&self, task: &Arc<dyn PersistentTask>) -> bool {
        let mut tasks = lock(&self.tasks);
        let before = tasks.len();
        let target = Arc::as_ptr(task) as *const ();
        tasks.retain(|entry| Arc::as_ptr(&entry.task) as *const () != target);
        tasks.len() != before
    }

    pub fn clear(&self) {
        lock(&self.tasks).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        lock(&self.timer).as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Start the timer; a second call while running does nothing
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = lock(&self.timer);
        if timer.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return;
        }

        let tasks = Arc::clone(&self.tasks);
        let pool = Arc::clone(&self.pool);
        let period = self.check_interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                dispatch(&tasks, &pool, false);
            }
        }));
        debug!(?period, "Scheduler started");
    }

    /// Stop the timer; runs already dispatched are left to finish
    pub fn stop(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
            debug!("Scheduler stopped");
        }
    }

    /// Dispatch every task now, regardless of its interval
    pub fn run_all_tasks(&self) -> Vec<JoinHandle<()>> {
        dispatch(&self.tasks, &self.pool, true)
    }

    /// Dispatch the tasks that are due, as the timer would
    pub fn run_due_tasks(&self) -> Vec<JoinHandle<()>> {
        dispatch(&self.tasks, &self.pool, false)
    }
}

impl Drop for PersistentTaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dispatch(tasks: &TaskList, pool: &Arc<Semaphore>, force: bool) -> Vec<JoinHandle<()>> {
    let now = Instant::now();
    let mut tasks = lock(tasks);
    let mut handles = Vec::new();

    for entry in tasks.iter_mut().filter(|entry| force || entry.is_due(now)) {
        entry.last_run = Some(now);
        let task = Arc::clone(&entry.task);
        let pool = Arc::clone(pool);
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return;
            };
            task.run().await;
        }));
    }
    handles
}
