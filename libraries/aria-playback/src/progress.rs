//! Progress reporter
//!
//! A self-rescheduling task that fires every interval while the published
//! snapshot says audio is playing. Each fire hands a tick to the engine,
//! which samples the decoder; the reporter itself never touches state.

use crate::types::PlaybackSnapshot;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Periodic tick source bound to the playing state
#[derive(Debug)]
pub struct ProgressReporter {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Create a stopped reporter
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Start ticking, replacing any running task
    ///
    /// `tick` returns `false` to stop. The task also stops on its own the
    /// first time it wakes up and finds the snapshot not playing.
    pub fn start<F>(&mut self, snapshots: watch::Receiver<PlaybackSnapshot>, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !snapshots.borrow().is_playing {
                    break;
                }
                if !tick() {
                    break;
                }
            }
        }));
    }

    /// Stop ticking
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Check if a task is alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
