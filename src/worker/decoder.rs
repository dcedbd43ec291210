use crate::foundation::core::PixelSize;

/// Frame rate assumed when neither the decoder nor the payload header reports one.
pub const DEFAULT_FPS: f64 = 60.0;

/// Metadata reported by a decoder after a successful load.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedMeta {
    /// Total frames in the animation.
    pub frame_count: u32,
    /// Native frame rate, if the decoder knows it.
    pub fps: Option<f64>,
}

/// Stateful decoder for one loaded animation.
///
/// The vector-animation format itself is opaque to the engine. Hosts plug their native decoder in
/// through this trait; one instance is created per player and lives on that player's worker.
pub trait Decoder: Send {
    /// Parse `payload` for rendering at `size`; `tone` is a skin-tone index in `1..=5`.
    fn load(
        &mut self,
        payload: &[u8],
        size: PixelSize,
        tone: Option<u8>,
    ) -> anyhow::Result<DecodedMeta>;

    /// Render `frame` into `out`, a straight-alpha RGBA8 buffer of `size.rgba_len()` bytes.
    fn render(&mut self, frame: u32, out: &mut [u8]) -> anyhow::Result<()>;
}

/// Produces decoders on worker threads.
pub trait DecoderFactory: Send + Sync {
    /// Create a fresh decoder.
    fn create(&self) -> Box<dyn Decoder>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> Box<dyn Decoder> + Send + Sync,
{
    fn create(&self) -> Box<dyn Decoder> {
        self()
    }
}

#[derive(serde::Deserialize)]
struct Header {
    fr: Option<f64>,
}

/// Read the `fr` field of an uncompressed JSON payload.
pub fn sniff_frame_rate(payload: &[u8]) -> Option<f64> {
    let header: Header = serde_json::from_slice(payload).ok()?;
    header.fr.filter(|v| v.is_finite())
}

/// Effective frame rate: reported, else sniffed, else [`DEFAULT_FPS`]; clamped to `[1, 60]`.
pub(crate) fn resolve_fps(reported: Option<f64>, payload: &[u8]) -> f64 {
    reported
        .filter(|v| v.is_finite() && *v > 0.0)
        .or_else(|| sniff_frame_rate(payload))
        .unwrap_or(DEFAULT_FPS)
        .clamp(1.0, 60.0)
}

#[cfg(test)]
#[path = "../../tests/unit/worker/decoder.rs"]
mod tests;
