use thiserror::Error;

/// Lifecycle errors surfaced by [`crate::BackgroundEffect`].
///
/// Everything that can go wrong *inside* a running pipeline (capture
/// hiccups, classification failures, background fetch errors) is handled by
/// degrading to the blank or previous frame and never reaches the caller.
#[derive(Debug, Error)]
pub enum EffectError {
    /// The effect is already running.
    #[error("effect already started")]
    AlreadyStarted,

    /// The effect was stopped; stopped effects do not restart.
    #[error("effect has been stopped")]
    Stopped,

    /// A pipeline worker could not be brought up.
    #[error("failed to start pipeline: {0}")]
    Startup(anyhow::Error),
}
