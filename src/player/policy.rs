//! Sizing, frame-skip and caching decisions made once per player at construction.

use crate::foundation::config::DeviceProfile;
use crate::foundation::core::PixelSize;

/// Frames advanced per tick.
///
/// An explicit ratio wins (`0.5` means every second frame). Otherwise small animations run at
/// half rate on constrained devices unless the caller asked for an upscaled surface.
pub fn skip_delta(
    device: &DeviceProfile,
    requested: PixelSize,
    upscale: bool,
    explicit_ratio: Option<f64>,
) -> u32 {
    let ratio = match explicit_ratio {
        Some(r) => Some(r),
        None if device.is_constrained() && requested.both_below(100) && !upscale => Some(0.5),
        None => None,
    };
    match ratio {
        Some(r) if r.is_finite() && r > 0.0 => ((1.0 / r) as u32).max(1),
        _ => 1,
    }
}

/// Rescale a skip delta for sources slower than 60fps; never below one frame.
pub fn adjust_skip_for_fps(skip: u32, fps: f64) -> u32 {
    if fps >= 60.0 || skip == 1 || fps <= 0.0 {
        return skip;
    }
    let diff = 60.0 / fps;
    ((f64::from(skip) / diff) as u32).max(1)
}

/// Surface size for an animation requested at `requested` CSS pixels.
pub fn scale_for_display(device: &DeviceProfile, requested: PixelSize, upscale: bool) -> PixelSize {
    let ratio = device.animation_pixel_ratio();
    if ratio <= 1.0 {
        return requested;
    }
    if upscale {
        return requested.scaled(ratio);
    }
    if requested.both_above(100) {
        if device.is_apple() || !device.mobile_layout {
            requested.scaled(ratio)
        } else {
            requested
        }
    } else {
        requested.scaled(f64::max(1.5, ratio - 1.5))
    }
}

/// Which decoded frames a player keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep nothing.
    Disabled,
    /// Keep every frame.
    Every,
    /// Keep frame 0 and every frame that is not a multiple of `n`.
    Partial(u32),
}

impl CachePolicy {
    /// Policy for a surface of `scaled` pixels (decided after display scaling).
    pub fn for_surface(device: &DeviceProfile, scaled: PixelSize, no_cache: bool) -> Self {
        if no_cache {
            Self::Disabled
        } else if device.is_apple() && scaled.both_above(100) {
            Self::Partial(2)
        } else if scaled.both_below(100) {
            Self::Every
        } else {
            Self::Partial(4)
        }
    }

    /// Whether `frame` is retained under this policy.
    pub fn should_store(self, frame: u32) -> bool {
        match self {
            Self::Disabled => false,
            Self::Every => true,
            Self::Partial(n) => n == 0 || frame == 0 || frame % n != 0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/policy.rs"]
mod tests;
