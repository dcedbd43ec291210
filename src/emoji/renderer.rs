use std::collections::{BTreeMap, BTreeSet, HashSet};

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::emoji::registry::SyncKey;
use crate::emoji::viewport::Offset;
use crate::foundation::core::{ElementId, Group, OccurrenceId, PixelSize, Rect, RendererId, Rgb, Size};
use crate::foundation::math::over_straight;
use crate::player::tint::{Tint, apply_color_in_rect};

/// Construction options of a synchronized renderer.
#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Host node that carries the compositor canvas.
    pub element: ElementId,
    /// CSS size of one emoji.
    pub emoji_size: PixelSize,
    /// Scheduling group of every occurrence in this renderer.
    pub group: Group,
    /// Color applied to occurrences of text-colored assets.
    pub text_color: Option<Tint>,
}

/// One compositor canvas redrawing shared frames at every occurrence position.
pub(crate) struct EmojiRenderer {
    id: RendererId,
    element: ElementId,
    emoji_size: PixelSize,
    group: Group,
    text_color: Option<Tint>,
    dpr: f64,
    canvas: RgbaImage,
    last_rect: Option<Size>,
    dimensions_set: bool,
    clean: bool,
    occurrences: BTreeMap<SyncKey, BTreeSet<OccurrenceId>>,
    text_colored: HashSet<SyncKey>,
}

impl EmojiRenderer {
    pub(crate) fn new(id: RendererId, options: RendererOptions, dpr: f64) -> Self {
        Self {
            id,
            element: options.element,
            emoji_size: options.emoji_size,
            group: options.group,
            text_color: options.text_color,
            dpr,
            canvas: RgbaImage::new(0, 0),
            last_rect: None,
            dimensions_set: false,
            clean: true,
            occurrences: BTreeMap::new(),
            text_colored: HashSet::new(),
        }
    }

    pub(crate) fn id(&self) -> RendererId {
        self.id
    }

    pub(crate) fn element(&self) -> ElementId {
        self.element
    }

    pub(crate) fn emoji_size(&self) -> PixelSize {
        self.emoji_size
    }

    pub(crate) fn group(&self) -> &Group {
        &self.group
    }

    pub(crate) fn text_color(&self) -> Option<&Tint> {
        self.text_color.as_ref()
    }

    pub(crate) fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    #[cfg(test)]
    pub(crate) fn is_clean(&self) -> bool {
        self.clean
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = (&SyncKey, &BTreeSet<OccurrenceId>)> {
        self.occurrences.iter()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &SyncKey, occ: OccurrenceId) -> bool {
        self.occurrences.get(key).is_some_and(|s| s.contains(&occ))
    }

    pub(crate) fn insert(&mut self, key: SyncKey, occ: OccurrenceId, text_colored: bool) {
        if text_colored {
            self.text_colored.insert(key.clone());
        }
        self.occurrences.entry(key).or_default().insert(occ);
    }

    /// Drop `occ`; returns `true` when `key` has no occurrences left here.
    pub(crate) fn remove(&mut self, key: &SyncKey, occ: OccurrenceId) -> bool {
        let Some(set) = self.occurrences.get_mut(key) else {
            return false;
        };
        set.remove(&occ);
        if !set.is_empty() {
            return false;
        }
        self.occurrences.remove(key);
        self.text_colored.remove(key);
        true
    }

    pub(crate) fn all_occurrences(&self) -> Vec<OccurrenceId> {
        self.occurrences.values().flatten().copied().collect()
    }

    pub(crate) fn is_text_colored(&self, key: &SyncKey) -> bool {
        self.text_colored.contains(key)
    }

    /// Remember the container size; resize the backing store when it changed.
    ///
    /// Returns `true` when the pixel dimensions changed.
    pub(crate) fn set_dimensions(&mut self, rect: Option<Size>) -> bool {
        if rect.is_some() {
            self.last_rect = rect;
        }
        let Some(rect) = self.last_rect else {
            return false;
        };
        let width = (rect.width * self.dpr).round().max(0.0) as u32;
        let height = (rect.height * self.dpr).round().max(0.0) as u32;
        if self.dimensions_set && self.canvas.dimensions() == (width, height) {
            return false;
        }
        self.canvas = RgbaImage::new(width, height);
        self.dimensions_set = true;
        self.clean = true;
        true
    }

    pub(crate) fn dimensions_set(&self) -> bool {
        self.dimensions_set
    }

    /// Clear the canvas at most once until something is drawn again.
    pub(crate) fn clear(&mut self) {
        if self.clean {
            return;
        }
        for px in self.canvas.pixels_mut() {
            px.0 = [0; 4];
        }
        self.clean = true;
    }

    /// Draw `frame` at every offset.
    pub(crate) fn draw(&mut self, frame: &RgbaImage, offsets: &[Offset], color: Option<Rgb>) {
        if !self.dimensions_set {
            self.set_dimensions(None);
        }
        self.clean = false;
        let Some(first) = offsets.first() else {
            return;
        };
        let dpr = self.dpr;
        let element_width = (first.width * dpr).round() as u32;
        let scaled;
        let frame = if element_width != frame.width() && element_width > 0 {
            scaled = imageops::resize(frame, element_width, element_width, FilterType::Triangle);
            &scaled
        } else {
            frame
        };
        let (frame_w, frame_h) = frame.dimensions();
        let max_left = i64::from(self.canvas.width()) - i64::from(frame_w);

        for offset in offsets {
            let top = (offset.top * dpr).round() as i64;
            let left = (offset.left * dpr).round() as i64;
            if left < 0 || left > max_left {
                continue;
            }
            blit(&mut self.canvas, frame, left, top);
            if let Some(color) = color {
                let rect = Rect::new(
                    left as f64,
                    top as f64,
                    (left + i64::from(frame_w)) as f64,
                    (top + i64::from(frame_h)) as f64,
                );
                apply_color_in_rect(&mut self.canvas, color, rect);
            }
        }
    }
}

/// Straight-alpha `over` of `frame` onto `canvas` at `(left, top)`, clipped to the canvas.
fn blit(canvas: &mut RgbaImage, frame: &RgbaImage, left: i64, top: i64) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for (x, y, px) in frame.enumerate_pixels() {
        let (dx, dy) = (left + i64::from(x), top + i64::from(y));
        if dx < 0 || dy < 0 || dx >= cw || dy >= ch {
            continue;
        }
        let dst = canvas.get_pixel_mut(dx as u32, dy as u32);
        dst.0 = over_straight(dst.0, px.0);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/emoji/renderer.rs"]
mod tests;
