use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};

/// Drives the pipeline tick from a dedicated thread, decoupled from whatever
/// the embedding application does to its own event loop.
///
/// The thread blocks on a stop channel with a timeout of one period, so the
/// period is an ordinary configurable [`Duration`] and cancellation takes
/// effect immediately rather than after the next tick.
pub struct FrameScheduler {
    stop: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl FrameScheduler {
    /// Arms a repeating tick with the given period.
    pub fn start<F>(period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let worker = std::thread::Builder::new()
            .name("backdrop-scheduler".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .context("Failed to spawn scheduler thread")?;

        tracing::debug!("Scheduler armed with period {:?}", period);

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Cancels the tick and waits for the scheduler thread to exit.
    ///
    /// After this returns no tick callback is executing and none will be
    /// scheduled. Idempotent; also runs on drop.
    pub fn stop(&mut self) {
        let _ = self.stop.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            tracing::debug!("Scheduler stopped");
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
