use std::sync::Arc;

use crate::foundation::core::PixelSize;
use crate::worker::decoder::{DecodedMeta, Decoder, DecoderFactory};

/// Decoder that reads `{"frames": N, "fr": F}` and paints every pixel of frame `i` as opaque
/// `(i, i, i)`.
#[derive(Default)]
pub(crate) struct StubDecoder {
    frames: u32,
    fail_on: Option<u32>,
}

#[derive(serde::Deserialize)]
struct StubHeader {
    frames: u32,
    #[serde(default)]
    fail_on: Option<u32>,
}

impl Decoder for StubDecoder {
    fn load(
        &mut self,
        payload: &[u8],
        _size: PixelSize,
        _tone: Option<u8>,
    ) -> anyhow::Result<DecodedMeta> {
        let header: StubHeader = serde_json::from_slice(payload)?;
        self.frames = header.frames;
        self.fail_on = header.fail_on;
        Ok(DecodedMeta {
            frame_count: header.frames,
            fps: None,
        })
    }

    fn render(&mut self, frame: u32, out: &mut [u8]) -> anyhow::Result<()> {
        if self.fail_on == Some(frame) {
            anyhow::bail!("stub decoder failed on frame {frame}");
        }
        let v = frame as u8;
        for px in out.chunks_exact_mut(4) {
            px.copy_from_slice(&[v, v, v, 255]);
        }
        Ok(())
    }
}

pub(crate) fn stub_factory() -> Arc<dyn DecoderFactory> {
    Arc::new(|| Box::new(StubDecoder::default()) as Box<dyn Decoder>)
}

pub(crate) fn stub_payload(frames: u32, fps: u32) -> Arc<[u8]> {
    Arc::from(format!(r#"{{"frames":{frames},"fr":{fps}}}"#).into_bytes())
}
