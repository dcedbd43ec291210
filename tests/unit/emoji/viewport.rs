use super::*;

fn rect(top: f64, height: f64) -> Rect {
    Rect::new(10.0, top, 30.0, top + height)
}

#[test]
fn margin_admits_boxes_just_outside() {
    let overflow = Rect::new(0.0, 100.0, 500.0, 300.0);
    let boxes = [(1, rect(40.0, 20.0)), (2, rect(150.0, 20.0)), (3, rect(340.0, 20.0)), (4, rect(400.0, 20.0))];
    let visible = viewport_slice(overflow, boxes, 45.0);
    let ids: Vec<_> = visible.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn zero_width_boxes_are_skipped() {
    let overflow = Rect::new(0.0, 0.0, 100.0, 100.0);
    let boxes = [(1, Rect::new(5.0, 5.0, 5.0, 20.0))];
    assert!(viewport_slice(overflow, boxes, 0.0).is_empty());
}

#[test]
fn offsets_are_relative_to_the_canvas() {
    let origin = Rect::new(100.0, 50.0, 400.0, 450.0);
    let offsets = offsets_from(origin, &[((), Rect::new(120.0, 70.0, 138.0, 88.0))]);
    assert_eq!(
        offsets,
        vec![Offset {
            top: 20.0,
            left: 20.0,
            width: 18.0
        }]
    );
}
