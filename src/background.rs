use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use image::imageops;
use serde::Deserialize;

use crate::frame::FrameBuffer;

/// Where the replacement background comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    /// HTTP(S) endpoint returning a JSON descriptor `{"msg": "<image url>"}`.
    Service(String),
    /// Image file on disk.
    File(PathBuf),
    /// Solid RGB fill.
    Solid([u8; 3]),
}

#[derive(Deserialize)]
struct BackgroundDescriptor {
    msg: String,
}

/// Write-once cache of the replacement background, rasterized to the
/// pipeline's output resolution.
///
/// Loading happens on its own thread and is attempted exactly once per
/// pipeline instance. Any failure leaves the store not ready indefinitely;
/// the pipeline keeps producing blank frames instead of crashing, and there
/// is no automatic retry.
pub struct BackgroundStore {
    slot: Arc<OnceLock<FrameBuffer>>,
}

impl BackgroundStore {
    /// Start loading in the background and return immediately.
    pub fn load(source: BackgroundSource, width: u32, height: u32) -> Self {
        let slot = Arc::new(OnceLock::new());

        let worker_slot = Arc::clone(&slot);
        let spawned = std::thread::Builder::new()
            .name("backdrop-background".into())
            .spawn(move || match rasterize(&source, width, height) {
                Ok(buffer) => {
                    tracing::info!("Background ready at {}x{}", width, height);
                    let _ = worker_slot.set(buffer);
                }
                Err(err) => {
                    tracing::warn!("Background load failed, output stays blank: {err:#}");
                }
            });
        if let Err(err) = spawned {
            tracing::warn!("Background loader failed to spawn: {err}");
        }

        Self { slot }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The rasterized background, once ready.
    pub fn get(&self) -> Option<&FrameBuffer> {
        self.slot.get()
    }
}

/// Fetch, decode, and rasterize the source to exactly (width, height).
fn rasterize(source: &BackgroundSource, width: u32, height: u32) -> Result<FrameBuffer> {
    let decoded = match source {
        BackgroundSource::Service(url) => {
            let body = ureq::get(url)
                .call()
                .with_context(|| format!("Failed to fetch background descriptor from {url}"))?
                .into_string()
                .context("Failed to read background descriptor")?;
            let descriptor: BackgroundDescriptor =
                serde_json::from_str(&body).context("Failed to parse background descriptor")?;

            tracing::debug!("Background image at {}", descriptor.msg);

            let mut bytes = Vec::new();
            ureq::get(&descriptor.msg)
                .call()
                .with_context(|| {
                    format!("Failed to fetch background image from {}", descriptor.msg)
                })?
                .into_reader()
                .read_to_end(&mut bytes)
                .context("Failed to read background image body")?;
            image::load_from_memory(&bytes).context("Failed to decode background image")?
        }
        BackgroundSource::File(path) => image::open(path)
            .with_context(|| format!("Failed to open background image {}", path.display()))?,
        BackgroundSource::Solid([r, g, b]) => {
            return Ok(FrameBuffer::solid(width, height, [*r, *g, *b, 255]));
        }
    };

    let resized = imageops::resize(
        &decoded.to_rgba8(),
        width,
        height,
        imageops::FilterType::Lanczos3,
    );
    Ok(FrameBuffer::from_rgba8(resized))
}
