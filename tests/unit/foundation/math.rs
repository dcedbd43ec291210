use super::*;

#[test]
fn content_id_is_stable_and_discriminating() {
    let a = content_id(b"{\"fr\":60}");
    assert_eq!(a, content_id(b"{\"fr\":60}"));
    assert_ne!(a, content_id(b"{\"fr\":30}"));
    assert_eq!(a.len(), 32);
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
}

#[test]
fn over_straight_edges() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over_straight(dst, [1, 2, 3, 255]), [1, 2, 3, 255]);
    assert_eq!(over_straight(dst, [1, 2, 3, 0]), dst);
    assert_eq!(over_straight([0, 0, 0, 0], [200, 100, 50, 128]), [200, 100, 50, 128]);
}
