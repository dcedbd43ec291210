use super::*;
use image::Rgba;

fn renderer(dpr: f64) -> EmojiRenderer {
    EmojiRenderer::new(
        RendererId(1),
        RendererOptions {
            element: ElementId(10),
            emoji_size: PixelSize::new(2, 2),
            group: Group::EMOJI,
            text_color: None,
        },
        dpr,
    )
}

fn key(asset: &str) -> SyncKey {
    SyncKey {
        asset: asset.into(),
        size: PixelSize::new(2, 2),
        tint: None,
    }
}

fn at(left: f64, top: f64, width: f64) -> Offset {
    Offset { top, left, width }
}

fn gray(v: u8) -> RgbaImage {
    RgbaImage::from_pixel(2, 2, Rgba([v, v, v, 255]))
}

#[test]
fn dimensions_follow_the_pixel_ratio() {
    let mut r = renderer(2.0);
    assert!(!r.set_dimensions(None), "nothing to apply yet");
    assert!(r.set_dimensions(Some(Size::new(10.2, 5.0))));
    assert_eq!(r.canvas().dimensions(), (20, 10));
    assert!(!r.set_dimensions(Some(Size::new(10.0, 5.0))));
    assert!(r.set_dimensions(Some(Size::new(12.0, 5.0))));
    assert_eq!(r.canvas().dimensions(), (24, 10));
}

#[test]
fn clear_runs_only_after_a_draw() {
    let mut r = renderer(1.0);
    r.set_dimensions(Some(Size::new(8.0, 4.0)));
    assert!(r.is_clean());
    r.draw(&gray(9), &[at(0.0, 0.0, 2.0)], None);
    assert!(!r.is_clean());
    assert_eq!(r.canvas().get_pixel(1, 1).0, [9, 9, 9, 255]);
    r.clear();
    assert!(r.is_clean());
    assert!(r.canvas().pixels().all(|p| p.0 == [0; 4]));
}

#[test]
fn offsets_past_either_edge_are_skipped() {
    let mut r = renderer(1.0);
    r.set_dimensions(Some(Size::new(8.0, 4.0)));
    r.draw(
        &gray(7),
        &[at(-1.0, 0.0, 2.0), at(3.0, 0.0, 2.0), at(7.0, 0.0, 2.0)],
        None,
    );
    let covered: Vec<u32> = (0..8)
        .filter(|&x| r.canvas().get_pixel(x, 0).0[3] != 0)
        .collect();
    assert_eq!(covered, vec![3, 4]);
}

#[test]
fn frames_are_scaled_to_the_occurrence_width() {
    let mut r = renderer(1.0);
    r.set_dimensions(Some(Size::new(8.0, 8.0)));
    r.draw(&gray(5), &[at(0.0, 0.0, 4.0)], None);
    assert_eq!(r.canvas().get_pixel(3, 3).0, [5, 5, 5, 255]);
    assert_eq!(r.canvas().get_pixel(4, 4).0, [0; 4]);
}

#[test]
fn text_color_only_touches_drawn_boxes() {
    let mut r = renderer(1.0);
    r.set_dimensions(Some(Size::new(8.0, 4.0)));
    r.draw(&gray(5), &[at(0.0, 0.0, 2.0)], None);
    r.draw(&gray(5), &[at(4.0, 0.0, 2.0)], Some(Rgb::new(255, 0, 0)));
    assert_eq!(r.canvas().get_pixel(0, 0).0, [5, 5, 5, 255]);
    assert_eq!(r.canvas().get_pixel(4, 0).0, [255, 0, 0, 255]);
    assert_eq!(r.canvas().get_pixel(3, 0).0, [0; 4]);
}

#[test]
fn removing_the_last_occurrence_forgets_the_key() {
    let mut r = renderer(1.0);
    r.insert(key("a"), OccurrenceId(1), true);
    r.insert(key("a"), OccurrenceId(2), true);
    assert!(r.is_text_colored(&key("a")));
    assert!(!r.remove(&key("a"), OccurrenceId(1)));
    assert!(r.contains(&key("a"), OccurrenceId(2)));
    assert!(r.remove(&key("a"), OccurrenceId(2)));
    assert!(!r.is_text_colored(&key("a")));
    assert!(r.all_occurrences().is_empty());
}
