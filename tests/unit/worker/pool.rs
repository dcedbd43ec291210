use super::*;

struct Stripes {
    frames: u32,
    fail_on: Option<u32>,
}

impl Decoder for Stripes {
    fn load(
        &mut self,
        payload: &[u8],
        _size: PixelSize,
        _tone: Option<u8>,
    ) -> anyhow::Result<crate::worker::decoder::DecodedMeta> {
        if payload == b"corrupt" {
            anyhow::bail!("bad magic");
        }
        Ok(crate::worker::decoder::DecodedMeta {
            frame_count: self.frames,
            fps: None,
        })
    }

    fn render(&mut self, frame: u32, out: &mut [u8]) -> anyhow::Result<()> {
        if self.fail_on == Some(frame) {
            anyhow::bail!("decoder crashed");
        }
        out.fill(frame as u8);
        Ok(())
    }
}

fn factory(fail_on: Option<u32>) -> Arc<dyn DecoderFactory> {
    Arc::new(move || Box::new(Stripes { frames: 4, fail_on }) as Box<dyn Decoder>)
}

fn load(id: u64, payload: &'static [u8]) -> LoadRequest {
    LoadRequest {
        id: PlayerId(id),
        payload: Arc::from(payload),
        size: PixelSize::new(2, 1),
        tone: Some(9),
        token: CancelToken::new(),
    }
}

#[test]
fn inline_load_and_render_round_trip() {
    let mut pool = WorkerPool::new(2, WorkerMode::Inline, factory(None)).unwrap();
    pool.load(load(1, br#"{"fr":30}"#)).unwrap();
    pool.render_frame(PlayerId(1), 2, None).unwrap();
    let replies = pool.drain();
    assert!(matches!(
        replies[0],
        WorkerReply::Loaded { id: PlayerId(1), frame_count: 4, fps } if fps == 30.0
    ));
    match &replies[1] {
        WorkerReply::Frame { frame, pixels, .. } => {
            assert_eq!(*frame, 2);
            assert_eq!(pixels, &vec![2u8; 8]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(pool.stats().loads, 1);
    assert_eq!(pool.stats().renders, 1);
}

#[test]
fn out_of_range_frames_are_ignored() {
    let mut pool = WorkerPool::new(1, WorkerMode::Inline, factory(None)).unwrap();
    pool.load(load(1, b"x")).unwrap();
    pool.render_frame(PlayerId(1), 4, None).unwrap();
    assert_eq!(pool.drain().len(), 1);
}

#[test]
fn errors_are_tagged_and_isolated() {
    let mut pool = WorkerPool::new(1, WorkerMode::Inline, factory(Some(1))).unwrap();
    pool.load(load(1, b"corrupt")).unwrap();
    pool.load(load(2, b"ok")).unwrap();
    pool.render_frame(PlayerId(2), 1, None).unwrap();
    pool.render_frame(PlayerId(2), 0, None).unwrap();
    let replies = pool.drain();
    assert!(matches!(&replies[0], WorkerReply::Error { id: PlayerId(1), reason } if reason.contains("bad magic")));
    assert!(matches!(replies[1], WorkerReply::Loaded { id: PlayerId(2), .. }));
    assert!(matches!(replies[2], WorkerReply::Error { id: PlayerId(2), .. }));
    // The item is dead after a render failure: no more replies for it.
    assert_eq!(replies.len(), 3);
}

#[test]
fn cancelled_loads_are_dropped() {
    let mut pool = WorkerPool::new(1, WorkerMode::Inline, factory(None)).unwrap();
    let req = load(1, b"x");
    req.token.cancel();
    pool.load(req).unwrap();
    assert!(pool.drain().is_empty());
}

#[test]
fn assignment_is_round_robin_per_player() {
    let mut pool = WorkerPool::new(3, WorkerMode::Inline, factory(None)).unwrap();
    for id in 1..=4 {
        pool.load(load(id, b"x")).unwrap();
    }
    assert_eq!(pool.assignment[&PlayerId(1)], 0);
    assert_eq!(pool.assignment[&PlayerId(3)], 2);
    assert_eq!(pool.assignment[&PlayerId(4)], 0);
    pool.destroy(PlayerId(4));
    assert!(pool.render_frame(PlayerId(4), 0, None).is_err());
}

#[test]
fn recycled_buffers_of_the_right_length_are_reused() {
    let mut state = WorkerState::new(factory(None));
    state.handle(WorkerRequest::Load(load(1, b"x")));
    let reply = state.handle(WorkerRequest::RenderFrame {
        id: PlayerId(1),
        frame: 3,
        recycled: Some(vec![0xAA; 8]),
    });
    assert!(matches!(reply, Some(WorkerReply::Frame { pixels, .. }) if pixels == vec![3u8; 8]));
}

#[test]
fn threaded_pool_answers_and_shuts_down() {
    let mut pool = WorkerPool::new(2, WorkerMode::Threads, factory(None)).unwrap();
    pool.load(load(7, b"x")).unwrap();
    let reply = pool.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(reply.id(), PlayerId(7));
    drop(pool);
}
