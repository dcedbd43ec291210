use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3c_a7e1_92d4_b08d;

/// Stable content identity of an animation payload.
///
/// Used as the asset name when a caller has bytes but no symbolic id.
pub(crate) fn content_id(payload: &[u8]) -> String {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(payload);
    let v = h.digest128();
    format!("{:016x}{:016x}", (v >> 64) as u64, v as u64)
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Straight-alpha `over` of one RGBA8 pixel onto another.
pub(crate) fn over_straight(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u16::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u16::from(dst[3]);
    let inv = 255 - sa;
    let out_a = sa + mul_div255_u16(da, inv);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = u32::from(src[c]) * u32::from(sa);
        let d = u32::from(dst[c]) * u32::from(mul_div255_u16(da, inv));
        out[c] = ((s + d + u32::from(out_a) / 2) / u32::from(out_a)).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
