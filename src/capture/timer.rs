use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::capture::controller::ControlEvent;

/// Spawns timers and background work whose output is fed back into the
/// controller's event channel.
///
/// Every task is returned as a [`ScheduledTask`] guard. The guard is stored in
/// the state that owns the task, so leaving that state drops the guard and
/// aborts the task before it can deliver another event.
#[derive(Clone)]
pub struct Scheduler {
    tx: UnboundedSender<ControlEvent>,
    live: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(tx: UnboundedSender<ControlEvent>) -> Self {
        Self {
            tx,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sender(&self) -> UnboundedSender<ControlEvent> {
        self.tx.clone()
    }

    /// Number of task guards currently alive.
    pub fn live_tasks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Emit `make_event()` every `period`, starting one period from now.
    pub fn every<F>(&self, period: Duration, make_event: F) -> ScheduledTask
    where
        F: Fn() -> ControlEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(make_event()).is_err() {
                    break;
                }
            }
        });
        ScheduledTask::track(handle, &self.live)
    }

    /// Emit `make_event()` once after `delay`.
    pub fn once<F>(&self, delay: Duration, make_event: F) -> ScheduledTask
    where
        F: FnOnce() -> ControlEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(make_event());
        });
        ScheduledTask::track(handle, &self.live)
    }

    /// Run `work` in the background and deliver the event it resolves to.
    pub fn spawn<Fut>(&self, work: Fut) -> ScheduledTask
    where
        Fut: Future<Output = ControlEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let event = work.await;
            let _ = tx.send(event);
        });
        ScheduledTask::track(handle, &self.live)
    }
}

/// Owning guard for a spawned timer or task. Dropping it aborts the task.
#[must_use = "dropping a ScheduledTask cancels it"]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    live: Arc<AtomicUsize>,
}

impl ScheduledTask {
    fn track(handle: JoinHandle<()>, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            handle,
            live: Arc::clone(live),
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn every_fires_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let session = Uuid::new_v4();
        let started = Instant::now();

        let _task = scheduler.every(Duration::from_millis(100), move || {
            ControlEvent::ProgressTick { session }
        });

        for expected in 1..=3u64 {
            let event = rx.recv().await.unwrap();
            assert!(matches!(event, ControlEvent::ProgressTick { session: s } if s == session));
            assert_eq!(started.elapsed(), Duration::from_millis(100 * expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_cancels_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let session = Uuid::new_v4();

        let task = scheduler.every(Duration::from_secs(1), move || ControlEvent::ElapsedTick {
            session,
        });
        assert_eq!(scheduler.live_tasks(), 1);
        drop(task);
        assert_eq!(scheduler.live_tasks(), 0);

        let next = time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(next.is_err(), "no tick may arrive after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let session = Uuid::new_v4();
        let started = Instant::now();

        let _task = scheduler.once(Duration::from_millis(500), move || {
            ControlEvent::SettleElapsed { session }
        });

        assert!(matches!(
            rx.recv().await,
            Some(ControlEvent::SettleElapsed { .. })
        ));
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }
}
