use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroU32;

use crate::foundation::error::{PlaybackError, PlaybackResult};

pub use kurbo::{Point, Rect, Size};

/// Opaque, per-instantiation player identity.
///
/// Also used as the correlation id of every decode-worker message, so a reply for a destroyed player
/// can be recognized and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Host-side handle of a document node (a container, placeholder or canvas host).
///
/// The engine never dereferences it; all questions about the node go through
/// [`crate::Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

/// One registered on-screen appearance of a synchronized asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OccurrenceId(pub u64);

/// A synchronized multi-instance renderer (one compositor canvas).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RendererId(pub u64);

/// Pixel dimensions of a surface or frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Construct a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` if either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }

    /// Multiply both dimensions by `factor`, rounding to the nearest pixel.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            width: (f64::from(self.width) * factor).round().max(0.0) as u32,
            height: (f64::from(self.height) * factor).round().max(0.0) as u32,
        }
    }

    /// Both dimensions strictly below `limit`.
    pub fn both_below(self, limit: u32) -> bool {
        self.width < limit && self.height < limit
    }

    /// Both dimensions strictly above `limit`.
    pub fn both_above(self, limit: u32) -> bool {
        self.width > limit && self.height > limit
    }
}

/// Opaque RGB color used for tinting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Construct a color.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> PlaybackResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(PlaybackError::validation(format!(
                "color '{s}' must be #rrggbb"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| PlaybackError::validation(format!("color '{s}': {e}")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Playback direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Increasing frame numbers.
    #[default]
    Forward,
    /// Decreasing frame numbers.
    Backward,
}

impl Direction {
    /// `+1` or `-1`.
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    /// Direction that moves from `from` toward `to` (forward when equal).
    pub fn toward(from: i64, to: i64) -> Self {
        if from > to {
            Self::Backward
        } else {
            Self::Forward
        }
    }
}

/// Looping behavior of a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopMode {
    /// Play one lap and stop at the boundary frame.
    Once,
    /// Wrap around forever.
    Forever,
    /// Play exactly this many laps, then stop at the boundary frame.
    Times(NonZeroU32),
}

impl LoopMode {
    /// Return `true` unless the mode is [`LoopMode::Once`].
    pub fn is_looping(self) -> bool {
        !matches!(self, Self::Once)
    }

    /// Build a counted mode; `0` and `1` both mean a single lap.
    pub fn times(n: u32) -> Self {
        match NonZeroU32::new(n) {
            Some(n) if n.get() > 1 => Self::Times(n),
            _ => Self::Once,
        }
    }
}

impl From<bool> for LoopMode {
    fn from(v: bool) -> Self {
        if v { Self::Forever } else { Self::Once }
    }
}

/// Scheduling bucket that can be paused or prioritized as a whole.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Group(Cow<'static, str>);

impl Group {
    /// Default bucket for ordinary chat content.
    pub const CHAT: Group = Group(Cow::Borrowed("chat"));
    /// Bucket used by inline custom-emoji renderers.
    pub const EMOJI: Group = Group(Cow::Borrowed("EMOJI"));

    /// Construct a named group.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Group name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
