use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::foundation::error::{PlaybackError, PlaybackResult};

/// How decode workers are run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerMode {
    /// One OS thread per worker, talking over channels.
    #[default]
    Threads,
    /// Decoders run synchronously on the caller when messages are pumped.
    ///
    /// Deterministic; meant for tests and hosts without threads.
    Inline,
}

/// Broad capability class of the device the engine runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Desktop browser-class device.
    #[default]
    Desktop,
    /// Apple device with a full GPU budget.
    Apple,
    /// Apple device with a tight decode budget (older phones).
    AppleConstrained,
    /// Any other mobile device. Shares the tight decode budget.
    Mobile,
}

/// Device profile feeding the skip, scaling and caching policies.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Capability class.
    pub class: DeviceClass,
    /// Raw device pixel ratio; animation surfaces clamp it to `[1, 2]`.
    pub pixel_ratio: f64,
    /// Mobile (narrow) layout is active.
    pub mobile_layout: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            class: DeviceClass::Desktop,
            pixel_ratio: 1.0,
            mobile_layout: false,
        }
    }
}

impl DeviceProfile {
    /// Apple platform of either budget.
    pub fn is_apple(&self) -> bool {
        matches!(
            self.class,
            DeviceClass::Apple | DeviceClass::AppleConstrained
        )
    }

    /// Device on which small animations run at half rate.
    pub fn is_constrained(&self) -> bool {
        matches!(
            self.class,
            DeviceClass::AppleConstrained | DeviceClass::Mobile
        )
    }

    /// Pixel ratio used for animation surfaces, clamped to `[1, 2]`.
    pub fn animation_pixel_ratio(&self) -> f64 {
        self.pixel_ratio.clamp(1.0, 2.0)
    }
}

/// Storage form used by frame caches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStorage {
    /// Raw RGBA8 buffers as produced by the decoder.
    #[default]
    RawPixels,
    /// Converted raster images, ready to blit.
    Raster,
}

/// Engine-wide configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decode pool size.
    pub workers: usize,
    /// Threaded or inline decoding.
    pub worker_mode: WorkerMode,
    /// Device capabilities.
    pub device: DeviceProfile,
    /// Cache storage form.
    pub frame_storage: FrameStorage,
    /// Compositor throttle for synchronized renderers.
    pub compositor_fps: u32,
    /// Viewport margin around emoji renderers, in multiples of the emoji height.
    pub viewport_margin_factor: f64,
    /// Render promises resolve as timed out after this many milliseconds without a first frame.
    pub first_frame_timeout_ms: u64,
    /// User setting: loop stickers.
    pub stickers_loop: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(4);
        Self {
            workers,
            worker_mode: WorkerMode::Threads,
            device: DeviceProfile::default(),
            frame_storage: FrameStorage::RawPixels,
            compositor_fps: 60,
            viewport_margin_factor: 2.5,
            first_frame_timeout_ms: 2500,
            stickers_loop: true,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON text. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> PlaybackResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> PlaybackResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| PlaybackError::validation(format!("parse engine config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> PlaybackResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PlaybackError::validation(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges.
    pub fn validate(&self) -> PlaybackResult<()> {
        if self.workers == 0 {
            return Err(PlaybackError::validation("workers must be >= 1"));
        }
        if !self.device.pixel_ratio.is_finite() || self.device.pixel_ratio <= 0.0 {
            return Err(PlaybackError::validation(
                "device.pixel_ratio must be finite and > 0",
            ));
        }
        if !(1..=240).contains(&self.compositor_fps) {
            return Err(PlaybackError::validation(
                "compositor_fps must be in 1..=240",
            ));
        }
        if !self.viewport_margin_factor.is_finite() || self.viewport_margin_factor < 0.0 {
            return Err(PlaybackError::validation(
                "viewport_margin_factor must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Compositor frame period.
    pub fn compositor_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.compositor_fps.max(1)))
    }

    /// First-frame wait as a duration.
    pub fn first_frame_timeout(&self) -> Duration {
        Duration::from_millis(self.first_frame_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
