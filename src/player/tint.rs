use std::sync::Arc;

use image::RgbaImage;

use crate::foundation::core::{Rect, Rgb};

/// Resolves symbolic theme colors to concrete values.
pub trait ThemeSource {
    /// Current value of the named color, if it exists.
    fn resolve(&self, name: &str) -> Option<Rgb>;
}

/// Post-decode recoloring of a player's frames.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tint {
    /// Fixed color.
    Fixed(Rgb),
    /// Named theme color, re-resolved on theme changes.
    Theme(Arc<str>),
}

impl Tint {
    /// Named theme color.
    pub fn theme(name: impl Into<Arc<str>>) -> Self {
        Self::Theme(name.into())
    }

    /// Concrete color right now.
    pub fn resolve(&self, themes: &dyn ThemeSource) -> Option<Rgb> {
        match self {
            Self::Fixed(c) => Some(*c),
            Self::Theme(name) => themes.resolve(name),
        }
    }

    /// Identity used in frame-cache keys.
    pub(crate) fn cache_tag(&self) -> Arc<str> {
        match self {
            Self::Fixed(c) => format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b).into(),
            Self::Theme(name) => Arc::clone(name),
        }
    }
}

/// Paint `color` over every pixel that is not fully transparent, keeping its alpha.
pub fn apply_color(pixels: &mut [u8], color: Rgb) {
    for px in pixels.chunks_exact_mut(4) {
        if px[3] != 0 {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
        }
    }
}

/// Swap coverage: transparent pixels become opaque `color`, everything else becomes transparent.
pub fn apply_inverse(pixels: &mut [u8], color: Rgb) {
    for px in pixels.chunks_exact_mut(4) {
        if px[3] == 0 {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = 255;
        } else {
            px[3] = 0;
        }
    }
}

/// Source-atop fill of `rect` on `canvas`: only already-covered pixels take the color.
pub fn apply_color_in_rect(canvas: &mut RgbaImage, color: Rgb, rect: Rect) {
    let x0 = rect.x0.max(0.0) as u32;
    let y0 = rect.y0.max(0.0) as u32;
    let x1 = (rect.x1.max(0.0) as u32).min(canvas.width());
    let y1 = (rect.y1.max(0.0) as u32).min(canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let px = canvas.get_pixel_mut(x, y);
            if px[3] != 0 {
                px[0] = color.r;
                px[1] = color.g;
                px[2] = color.b;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/tint.rs"]
mod tests;
