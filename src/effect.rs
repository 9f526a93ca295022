use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::background::{BackgroundSource, BackgroundStore};
use crate::compositor;
use crate::error::EffectError;
use crate::geometry::Orientation;
use crate::scheduler::FrameScheduler;
use crate::segmentation::{
    ModelProfile, OnnxSegmenter, Quality, SegmentationAdapter, Segmenter, SegmenterFactory,
};
use crate::sink::{OutputStream, OutputSurface};
use crate::source::{FrameSource, TrackInfo, TrackKind, VideoSource};

/// Lifecycle of one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    /// Model and background are still loading; output is blanked.
    Warming,
    /// Steady-state compositing; the only state that dispatches
    /// classification.
    Ready,
    /// Terminal.
    Stopped,
}

const STATE_UNINITIALIZED: u8 = 0;
const STATE_WARMING: u8 = 1;
const STATE_READY: u8 = 2;
const STATE_STOPPED: u8 = 3;

fn state_from(raw: u8) -> PipelineState {
    match raw {
        STATE_WARMING => PipelineState::Warming,
        STATE_READY => PipelineState::Ready,
        STATE_STOPPED => PipelineState::Stopped,
        _ => PipelineState::Uninitialized,
    }
}

/// Whether a track is eligible for background replacement: a live,
/// camera-sourced video track. Screen shares and audio tracks are a normal
/// negative, not an error.
pub fn is_enabled(track: &TrackInfo) -> bool {
    track.live && track.kind == TrackKind::Video && track.source == Some(VideoSource::Camera)
}

/// Explicit configuration for one effect instance, fixed at construction.
#[derive(Debug, Clone)]
pub struct EffectOptions {
    pub quality: Quality,
    /// Force the model family instead of deriving it from stream geometry.
    pub orientation_override: Option<Orientation>,
    pub background: BackgroundSource,
    pub tick_period: Duration,
    /// Directory holding the ONNX model exports.
    pub model_dir: PathBuf,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Medium,
            orientation_override: None,
            background: BackgroundSource::Solid([0, 0, 0]),
            tick_period: Duration::from_millis(33),
            model_dir: PathBuf::from("models"),
        }
    }
}

struct SharedState {
    /// Cleared on stop so completions from a stale pipeline are no-ops.
    active: AtomicBool,
    state: AtomicU8,
}

/// A virtual-background effect over one live input stream.
///
/// `start_effect` arms the pipeline and returns a live output stream;
/// `stop_effect` tears it down. One instance drives one pipeline; stopped
/// effects do not restart.
pub struct BackgroundEffect {
    options: EffectOptions,
    factory: Option<SegmenterFactory>,
    shared: Arc<SharedState>,
    scheduler: Option<FrameScheduler>,
}

impl BackgroundEffect {
    /// Effect with the default ONNX segmentation capability.
    pub fn new(options: EffectOptions) -> Self {
        let model_dir = options.model_dir.clone();
        let factory: SegmenterFactory = Box::new(move |profile: &ModelProfile| {
            let segmenter = OnnxSegmenter::load(&model_dir, profile.clone())?;
            Ok(Box::new(segmenter) as Box<dyn Segmenter>)
        });
        Self::with_segmenter(options, factory)
    }

    /// Effect with an explicit segmentation capability.
    pub fn with_segmenter(options: EffectOptions, factory: SegmenterFactory) -> Self {
        Self {
            options,
            factory: Some(factory),
            shared: Arc::new(SharedState {
                active: AtomicBool::new(false),
                state: AtomicU8::new(STATE_UNINITIALIZED),
            }),
            scheduler: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        state_from(self.shared.state.load(Ordering::Acquire))
    }

    /// Start the pipeline over the given source and return a live handle to
    /// the composited output stream.
    ///
    /// Captures the stream geometry once, negotiates the output resolution,
    /// selects the model profile, and arms the tick. Model and background
    /// load asynchronously; until both are ready every produced frame is
    /// black.
    pub fn start_effect(
        &mut self,
        source: Box<dyn FrameSource>,
    ) -> Result<OutputStream, EffectError> {
        match self.state() {
            PipelineState::Uninitialized => {}
            PipelineState::Stopped => return Err(EffectError::Stopped),
            PipelineState::Warming | PipelineState::Ready => {
                return Err(EffectError::AlreadyStarted)
            }
        }

        let geometry = source.geometry();
        let (width, height) = geometry.output_dimensions();
        let profile = ModelProfile::select(
            geometry,
            self.options.quality,
            self.options.orientation_override,
        );

        tracing::info!(
            "Starting effect: input {}x{} @ {} fps, output {}x{}, {:?} / {:?}",
            geometry.width,
            geometry.height,
            geometry.frame_rate,
            width,
            height,
            profile.architecture,
            profile.internal_resolution
        );

        let factory = self.factory.take().ok_or(EffectError::AlreadyStarted)?;
        let adapter = match SegmentationAdapter::spawn(profile, factory) {
            Ok(adapter) => adapter,
            Err(err) => {
                self.shared.state.store(STATE_STOPPED, Ordering::Release);
                return Err(EffectError::Startup(err));
            }
        };
        let background = BackgroundStore::load(self.options.background.clone(), width, height);

        let surface = OutputSurface::new(width, height, geometry.frame_rate);
        let stream = surface.stream();

        self.shared.active.store(true, Ordering::Release);
        self.shared.state.store(STATE_WARMING, Ordering::Release);

        let mut worker = PipelineWorker {
            source,
            adapter,
            background,
            surface,
            shared: Arc::clone(&self.shared),
            width,
            height,
        };
        let scheduler =
            match FrameScheduler::start(self.options.tick_period, move || worker.tick()) {
                Ok(scheduler) => scheduler,
                Err(err) => {
                    self.shared.active.store(false, Ordering::Release);
                    self.shared.state.store(STATE_STOPPED, Ordering::Release);
                    return Err(EffectError::Startup(err));
                }
            };
        self.scheduler = Some(scheduler);

        Ok(stream)
    }

    /// Stop the pipeline. Idempotent.
    ///
    /// Cancels the scheduler synchronously; an in-flight classification is
    /// left to finish into a channel nobody drains, so its completion never
    /// touches the output surface.
    pub fn stop_effect(&mut self) {
        self.shared.active.store(false, Ordering::Release);
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
            tracing::info!("Effect stopped");
        }
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
    }
}

impl Drop for BackgroundEffect {
    fn drop(&mut self) {
        self.stop_effect();
    }
}

/// Owns every pipeline resource that the tick mutates. Lives on the
/// scheduler thread.
struct PipelineWorker {
    source: Box<dyn FrameSource>,
    adapter: SegmentationAdapter,
    background: BackgroundStore,
    surface: OutputSurface,
    shared: Arc<SharedState>,
    width: u32,
    height: u32,
}

impl PipelineWorker {
    /// Produce one frame. Never panics through the scheduler and never
    /// leaves the surface without a deterministic frame.
    fn tick(&mut self) {
        if !self.shared.active.load(Ordering::Acquire) {
            return;
        }

        // Apply the most recently completed classification first. The mask
        // pairs with the frame it was computed from, not the one captured
        // this tick; the lag is bounded by inference time.
        if let Some(done) = self.adapter.try_completion() {
            match done.mask {
                Ok(mask) => {
                    if let Some(background) = self.background.get() {
                        let composited = compositor::composite(&done.frame, &mask, background);
                        self.surface.present(&composited);
                    }
                }
                Err(_) => {
                    // Already logged by the worker; the previous composite
                    // stands.
                }
            }
        }

        match state_from(self.shared.state.load(Ordering::Acquire)) {
            PipelineState::Warming => {
                if self.adapter.is_ready() && self.background.is_ready() {
                    tracing::info!("Pipeline ready, compositing enabled");
                    self.shared.state.store(STATE_READY, Ordering::Release);
                } else {
                    self.surface.present_blank();
                    return;
                }
            }
            PipelineState::Ready => {}
            PipelineState::Uninitialized | PipelineState::Stopped => return,
        }

        let frame = match self.source.capture(self.width, self.height) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!("Frame capture failed: {err:#}");
                return;
            }
        };

        // Single-flight: Busy and NotReady drop the frame rather than queue
        // it.
        let _ = self.adapter.classify(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(kind: TrackKind, source: Option<VideoSource>, live: bool) -> TrackInfo {
        TrackInfo { kind, source, live }
    }

    #[test]
    fn live_camera_video_is_eligible() {
        assert!(is_enabled(&track(
            TrackKind::Video,
            Some(VideoSource::Camera),
            true
        )));
    }

    #[test]
    fn screen_share_audio_and_ended_tracks_are_not() {
        assert!(!is_enabled(&track(
            TrackKind::Video,
            Some(VideoSource::Screen),
            true
        )));
        assert!(!is_enabled(&track(TrackKind::Audio, None, true)));
        assert!(!is_enabled(&track(
            TrackKind::Video,
            Some(VideoSource::Camera),
            false
        )));
    }

    #[test]
    fn new_effect_is_uninitialized() {
        let effect = BackgroundEffect::with_segmenter(
            EffectOptions::default(),
            Box::new(|_| anyhow::bail!("unused")),
        );
        assert_eq!(effect.state(), PipelineState::Uninitialized);
    }

    #[test]
    fn stop_before_start_is_terminal() {
        let mut effect = BackgroundEffect::with_segmenter(
            EffectOptions::default(),
            Box::new(|_| anyhow::bail!("unused")),
        );
        effect.stop_effect();
        effect.stop_effect();
        assert_eq!(effect.state(), PipelineState::Stopped);
    }
}
