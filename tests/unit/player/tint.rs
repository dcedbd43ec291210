use super::*;

struct OneColor;

impl ThemeSource for OneColor {
    fn resolve(&self, name: &str) -> Option<Rgb> {
        (name == "primary").then_some(Rgb::new(1, 2, 3))
    }
}

#[test]
fn color_only_touches_covered_pixels() {
    let mut px = vec![9, 9, 9, 0, 9, 9, 9, 128];
    apply_color(&mut px, Rgb::new(255, 0, 0));
    assert_eq!(px, vec![9, 9, 9, 0, 255, 0, 0, 128]);
}

#[test]
fn inverse_swaps_coverage() {
    let mut px = vec![0, 0, 0, 0, 5, 5, 5, 200];
    apply_inverse(&mut px, Rgb::new(10, 20, 30));
    assert_eq!(px, vec![10, 20, 30, 255, 5, 5, 5, 0]);
}

#[test]
fn theme_tints_resolve_through_the_source() {
    assert_eq!(Tint::theme("primary").resolve(&OneColor), Some(Rgb::new(1, 2, 3)));
    assert_eq!(Tint::theme("missing").resolve(&OneColor), None);
    assert_eq!(Tint::Fixed(Rgb::new(255, 0, 16)).cache_tag().as_ref(), "#ff0010");
}

#[test]
fn rect_fill_is_clipped_and_source_atop() {
    let mut canvas = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
    canvas.put_pixel(1, 1, image::Rgba([0, 0, 0, 0]));
    apply_color_in_rect(&mut canvas, Rgb::new(7, 7, 7), Rect::new(1.0, 1.0, 10.0, 3.0));
    assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(canvas.get_pixel(1, 1).0, [0, 0, 0, 0]);
    assert_eq!(canvas.get_pixel(3, 2).0, [7, 7, 7, 255]);
    assert_eq!(canvas.get_pixel(3, 3).0, [0, 0, 0, 255]);
}
