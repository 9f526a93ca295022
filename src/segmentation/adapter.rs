use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{ModelProfile, SegmenterFactory};
use crate::frame::{FrameBuffer, Mask};

/// Outcome of a classification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classify {
    /// The frame was handed to the worker.
    Dispatched,
    /// A classification is already in flight; the frame was dropped, not
    /// queued.
    Busy,
    /// The model has not finished loading; the frame was dropped.
    NotReady,
}

/// A completed classification: the frame it was computed from and the
/// result.
pub struct Completion {
    pub frame: FrameBuffer,
    pub mask: Result<Mask>,
}

/// Wraps the segmentation capability behind asynchronous loading and a
/// single-flight guarantee.
///
/// One worker thread first constructs the segmenter (the model load), then
/// serves classification jobs one at a time. Classification is the most
/// expensive step in the pipeline, so a request made while one is
/// outstanding is rejected rather than queued: a second inference would
/// spend the budget without improving latency. Completions are delivered
/// through a channel the pipeline drains on its own tick; a completion
/// nobody drains is silently discarded.
pub struct SegmentationAdapter {
    jobs: Sender<FrameBuffer>,
    completions: Receiver<Completion>,
    ready: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
}

impl SegmentationAdapter {
    /// Spawns the worker thread. The factory runs there; until it returns,
    /// the adapter reports not ready. A factory error leaves the adapter
    /// not ready for the pipeline's lifetime.
    pub fn spawn(profile: ModelProfile, factory: SegmenterFactory) -> Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<FrameBuffer>();
        let (completion_tx, completions) = mpsc::channel();
        let ready = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicBool::new(false));

        let worker_ready = Arc::clone(&ready);
        let worker_in_flight = Arc::clone(&in_flight);
        std::thread::Builder::new()
            .name("backdrop-segmenter".into())
            .spawn(move || {
                let mut segmenter = match factory(&profile) {
                    Ok(segmenter) => {
                        tracing::info!("Segmentation model loaded");
                        worker_ready.store(true, Ordering::Release);
                        segmenter
                    }
                    Err(err) => {
                        tracing::warn!("Segmentation model failed to load: {err:#}");
                        return;
                    }
                };

                while let Ok(frame) = job_rx.recv() {
                    let mask = segmenter.segment(&frame);
                    if let Err(err) = &mask {
                        tracing::warn!("Classification failed: {err:#}");
                    }
                    // The guard clears on success and failure alike so a
                    // failed inference never blocks future ticks.
                    worker_in_flight.store(false, Ordering::Release);
                    if completion_tx.send(Completion { frame, mask }).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn segmentation worker")?;

        Ok(Self {
            jobs,
            completions,
            ready,
            in_flight,
        })
    }

    /// Whether the model finished loading.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Request classification of a frame. Never blocks and never queues.
    pub fn classify(&self, frame: FrameBuffer) -> Classify {
        if !self.is_ready() {
            return Classify::NotReady;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Classify::Busy;
        }
        if self.jobs.send(frame).is_err() {
            self.in_flight.store(false, Ordering::Release);
            return Classify::NotReady;
        }
        Classify::Dispatched
    }

    /// The next completed classification, if one arrived since the last
    /// drain.
    pub fn try_completion(&self) -> Option<Completion> {
        self.completions.try_recv().ok()
    }
}
