//! Repeating-task scheduler with a default and a temporary interval.
//!
//! Each tick spawns the callback's future as its own task, so a slow device
//! request never delays the next tick. Overlapping ticks are allowed.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

use crate::error::{CameraError, Result};

/// Future returned by a poll callback.
pub type PollFuture = BoxFuture<'static, ()>;

type Callback = Arc<dyn Fn() -> PollFuture + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Temporary {
    period: Duration,
    remaining: u32,
}

struct PollerState {
    interval: Duration,
    temporary: Option<Temporary>,
    task: Option<JoinHandle<()>>,
    // Bumped on every re-arm so a superseded timer task can never fire.
    generation: u64,
}

impl PollerState {
    fn current_period(&self) -> Duration {
        self.temporary.map_or(self.interval, |t| t.period)
    }
}

/// Invokes a callback on a fixed period.
pub struct Poller {
    callback: Callback,
    state: Arc<Mutex<PollerState>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Poller")
            .field("interval", &state.interval)
            .field("running", &state.task.is_some())
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Create a stopped poller.
    pub fn new<F, Fut>(interval: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: Callback = Arc::new(move || callback().boxed());
        Self {
            callback,
            state: Arc::new(Mutex::new(PollerState {
                interval,
                temporary: None,
                task: None,
                generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PollerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start ticking. Restarts cleanly if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut state = self.lock();
        self.arm(&mut state);
    }

    /// Stop ticking. Idempotent.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            debug!("Poller stopped");
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().task.is_some()
    }

    /// The default interval.
    pub fn interval(&self) -> Duration {
        self.lock().interval
    }

    /// Permanently change the interval, re-arming at once if running.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        check_period(interval)?;
        let mut state = self.lock();
        state.interval = interval;
        state.temporary = None;
        if state.task.is_some() {
            self.arm(&mut state);
        }
        Ok(())
    }

    /// Tick every `period` for exactly `cycles` invocations, then fall back
    /// to the default interval.
    ///
    /// Arguments are validated before anything changes; a rejected call
    /// leaves the current schedule untouched. When the poller is stopped the
    /// temporary period applies from the next `start`.
    pub fn set_interval_temporarily(&self, period: Duration, cycles: u32) -> Result<()> {
        if cycles < 1 {
            return Err(CameraError::invalid(format!(
                "cycle count must be an integer >= 1, got {cycles}"
            )));
        }
        check_period(period)?;

        let mut state = self.lock();
        state.temporary = Some(Temporary {
            period,
            remaining: cycles,
        });
        if state.task.is_some() {
            self.arm(&mut state);
        }
        Ok(())
    }

    fn arm(&self, state: &mut PollerState) {
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        trace!(
            generation = state.generation,
            period_ms = state.current_period().as_millis() as u64,
            "Arming poller"
        );
        let task = tokio::spawn(run(
            Arc::clone(&self.callback),
            Arc::clone(&self.state),
            state.generation,
            state.current_period(),
        ));
        state.task = Some(task);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_period(period: Duration) -> Result<()> {
    if period.is_zero() {
        return Err(CameraError::invalid("poll interval must be greater than zero"));
    }
    Ok(())
}

async fn run(callback: Callback, state: Arc<Mutex<PollerState>>, generation: u64, first: Duration) {
    let mut deadline = Instant::now() + first;
    loop {
        sleep_until(deadline).await;

        let next = {
            let mut state = state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.generation != generation {
                return;
            }
            if let Some(temporary) = state.temporary.as_mut() {
                temporary.remaining -= 1;
                if temporary.remaining == 0 {
                    trace!("Temporary poll interval finished");
                    state.temporary = None;
                }
            }
            tokio::spawn(callback());
            state.current_period()
        };
        deadline += next;
    }
}
