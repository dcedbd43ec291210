use crate::foundation::core::Rect;

/// Position of one occurrence relative to its compositor canvas, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Offset {
    pub(crate) top: f64,
    pub(crate) left: f64,
    pub(crate) width: f64,
}

/// Boxes that vertically intersect `overflow` grown by `extra` on both sides, in input order.
pub(crate) fn viewport_slice<T: Copy>(
    overflow: Rect,
    boxes: impl IntoIterator<Item = (T, Rect)>,
    extra: f64,
) -> Vec<(T, Rect)> {
    let top = overflow.y0 - extra;
    let bottom = overflow.y1 + extra;
    boxes
        .into_iter()
        .filter(|(_, r)| r.y1 >= top && r.y0 <= bottom && r.width() > 0.0)
        .collect()
}

/// Offsets of `visible` boxes relative to the canvas box `origin`.
pub(crate) fn offsets_from(origin: Rect, visible: &[(impl Copy, Rect)]) -> Vec<Offset> {
    visible
        .iter()
        .map(|(_, r)| Offset {
            top: r.y0 - origin.y0,
            left: r.x0 - origin.x0,
            width: r.width(),
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/emoji/viewport.rs"]
mod tests;
