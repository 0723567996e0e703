use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{Result, SchedulerError};

/// Cancellation handle for one periodic task.
pub struct TaskHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the task and wait for its loop to exit. A tick already in
    /// progress runs to completion first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.join.await {
            debug!(task = %self.name, "task ended abnormally: {e}");
        }
    }
}

/// Run `tick` every `period` until the handle is stopped.
///
/// The first tick fires immediately. Ticks never overlap: a tick that
/// overruns its period delays the next one, and missed ticks are skipped
/// rather than replayed in a burst.
pub fn spawn_periodic<F, Fut>(name: &str, period: Duration, mut tick: F) -> Result<TaskHandle>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period.is_zero() {
        return Err(SchedulerError::InvalidPeriod {
            task: name.to_string(),
            reason: "period must be greater than zero".to_string(),
        });
    }

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let task = name.to_string();
    let join = tokio::spawn(async move {
        info!(%task, every_secs = period.as_secs_f64(), "periodic task started");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!(%task, "periodic task stopping");
                        break;
                    }
                }
            }
        }
    });

    Ok(TaskHandle {
        name: name.to_string(),
        stop_tx,
        join,
    })
}

/// A set of named periodic tasks with a single shutdown.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a named task. Names are unique within one scheduler.
    pub fn every<F, Fut>(&mut self, name: &str, period: Duration, tick: F) -> Result<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.tasks.iter().any(|t| t.name() == name) {
            return Err(SchedulerError::DuplicateTask(name.to_string()));
        }
        self.tasks.push(spawn_periodic(name, period, tick)?);
        Ok(())
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(TaskHandle::name).collect()
    }

    /// Stop one task by name. Returns `false` if no such task exists.
    pub async fn stop_task(&mut self, name: &str) -> bool {
        match self.tasks.iter().position(|t| t.name() == name) {
            Some(i) => {
                self.tasks.swap_remove(i).stop().await;
                true
            }
            None => false,
        }
    }

    /// Stop every task and wait for all of them.
    pub async fn stop(self) {
        for task in self.tasks {
            task.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> std::future::Ready<()> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_virtual_time() {
        let (count, tick) = counter();
        let mut scheduler = Scheduler::new();
        scheduler.every("refresh", Duration::from_secs(10), tick).unwrap();

        // Fires at 0s, 10s and 20s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_one_task_leaves_the_other() {
        let (fast, fast_tick) = counter();
        let (slow, slow_tick) = counter();
        let mut scheduler = Scheduler::new();
        scheduler.every("fast", Duration::from_secs(15), fast_tick).unwrap();
        scheduler.every("slow", Duration::from_secs(60), slow_tick).unwrap();
        assert_eq!(scheduler.task_names(), vec!["fast", "slow"]);

        // Let both first ticks fire.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.stop_task("fast").await);
        assert!(!scheduler.stop_task("fast").await);
        tokio::time::sleep(Duration::from_secs(125)).await;

        assert_eq!(fast.load(Ordering::SeqCst), 1);
        assert_eq!(slow.load(Ordering::SeqCst), 3);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn rejects_zero_period_and_duplicates() {
        let mut scheduler = Scheduler::new();
        let (_, tick) = counter();
        let err = scheduler.every("bad", Duration::ZERO, tick).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidPeriod { .. }));

        let (_, a) = counter();
        let (_, b) = counter();
        scheduler.every("poll", Duration::from_secs(1), a).unwrap();
        let err = scheduler.every("poll", Duration::from_secs(1), b).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTask(_)));
        scheduler.stop().await;
    }
}
