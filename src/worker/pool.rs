use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::foundation::config::WorkerMode;
use crate::foundation::core::{PixelSize, PlayerId};
use crate::foundation::error::{PlaybackError, PlaybackResult};
use crate::worker::decoder::{Decoder, DecoderFactory, resolve_fps};
use crate::worker::protocol::{CancelToken, LoadRequest, WorkerReply, WorkerRequest};

/// Message counters, mostly useful to assert decode sharing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// `load` requests sent.
    pub loads: u64,
    /// `renderFrame` requests sent.
    pub renders: u64,
    /// `destroy` requests sent.
    pub destroys: u64,
}

struct WorkerItem {
    decoder: Box<dyn Decoder>,
    size: PixelSize,
    frame_count: u32,
    dead: bool,
    token: CancelToken,
}

/// Decoder bookkeeping of one worker. Runs on the worker thread, or inline on the caller.
pub(crate) struct WorkerState {
    factory: Arc<dyn DecoderFactory>,
    items: HashMap<PlayerId, WorkerItem>,
}

impl WorkerState {
    pub(crate) fn new(factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            factory,
            items: HashMap::new(),
        }
    }

    /// Handle one request; `None` means nothing is sent back.
    pub(crate) fn handle(&mut self, req: WorkerRequest) -> Option<WorkerReply> {
        match req {
            WorkerRequest::Load(load) => self.load(load),
            WorkerRequest::RenderFrame {
                id,
                frame,
                recycled,
            } => self.render(id, frame, recycled),
            WorkerRequest::Destroy { id } => {
                self.items.remove(&id);
                None
            }
            WorkerRequest::Shutdown => None,
        }
    }

    fn load(&mut self, req: LoadRequest) -> Option<WorkerReply> {
        let LoadRequest {
            id,
            payload,
            size,
            tone,
            token,
        } = req;
        if token.is_cancelled() {
            tracing::trace!(%id, "load dropped: player already destroyed");
            return None;
        }
        let tone = tone.filter(|t| (1..=5).contains(t));
        let mut decoder = self.factory.create();
        let meta = match decoder.load(&payload, size, tone) {
            Ok(meta) => meta,
            Err(e) => {
                return Some(WorkerReply::Error {
                    id,
                    reason: format!("{e:#}"),
                });
            }
        };
        if meta.frame_count == 0 {
            return Some(WorkerReply::Error {
                id,
                reason: "animation has no frames".to_owned(),
            });
        }
        let fps = resolve_fps(meta.fps, &payload);
        self.items.insert(
            id,
            WorkerItem {
                decoder,
                size,
                frame_count: meta.frame_count,
                dead: false,
                token,
            },
        );
        Some(WorkerReply::Loaded {
            id,
            frame_count: meta.frame_count,
            fps,
        })
    }

    fn render(&mut self, id: PlayerId, frame: u32, recycled: Option<Vec<u8>>) -> Option<WorkerReply> {
        let item = self.items.get_mut(&id)?;
        if item.dead || item.token.is_cancelled() || frame >= item.frame_count {
            return None;
        }
        let len = item.size.rgba_len();
        let mut buf = match recycled {
            Some(mut b) if b.len() == len => {
                b.fill(0);
                b
            }
            _ => vec![0u8; len],
        };
        match item.decoder.render(frame, &mut buf) {
            Ok(()) => Some(WorkerReply::Frame {
                id,
                frame,
                pixels: buf,
            }),
            Err(e) => {
                item.dead = true;
                Some(WorkerReply::Error {
                    id,
                    reason: format!("render frame {frame}: {e:#}"),
                })
            }
        }
    }
}

enum WorkerSlot {
    Thread {
        tx: Sender<WorkerRequest>,
        handle: Option<JoinHandle<()>>,
    },
    Inline(WorkerState),
}

/// Fixed-size pool of decode workers.
///
/// Players are assigned round-robin when they load and stay on that worker for their lifetime,
/// since decoders are stateful.
pub(crate) struct WorkerPool {
    slots: Vec<WorkerSlot>,
    assignment: HashMap<PlayerId, usize>,
    next: usize,
    reply_tx: Sender<WorkerReply>,
    reply_rx: Receiver<WorkerReply>,
    stats: WorkerStats,
}

impl WorkerPool {
    pub(crate) fn new(
        workers: usize,
        mode: WorkerMode,
        factory: Arc<dyn DecoderFactory>,
    ) -> PlaybackResult<Self> {
        let (reply_tx, reply_rx) = unbounded::<WorkerReply>();
        let mut slots = Vec::with_capacity(workers.max(1));
        for i in 0..workers.max(1) {
            let slot = match mode {
                WorkerMode::Inline => WorkerSlot::Inline(WorkerState::new(Arc::clone(&factory))),
                WorkerMode::Threads => {
                    let (tx, rx) = unbounded::<WorkerRequest>();
                    let state = WorkerState::new(Arc::clone(&factory));
                    let replies = reply_tx.clone();
                    let handle = std::thread::Builder::new()
                        .name(format!("decode-worker-{i}"))
                        .spawn(move || worker_loop(state, rx, replies))
                        .map_err(|e| PlaybackError::worker(format!("spawn decode worker {i}: {e}")))?;
                    WorkerSlot::Thread {
                        tx,
                        handle: Some(handle),
                    }
                }
            };
            slots.push(slot);
        }
        tracing::debug!(workers = slots.len(), ?mode, "decode pool started");
        Ok(Self {
            slots,
            assignment: HashMap::new(),
            next: 0,
            reply_tx,
            reply_rx,
            stats: WorkerStats::default(),
        })
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub(crate) fn load(&mut self, req: LoadRequest) -> PlaybackResult<()> {
        let slot = self.next % self.slots.len();
        self.next = self.next.wrapping_add(1);
        self.assignment.insert(req.id, slot);
        self.stats.loads += 1;
        tracing::debug!(id = %req.id, worker = slot, size = ?req.size, "load sent");
        self.dispatch(slot, WorkerRequest::Load(req))
    }

    pub(crate) fn render_frame(
        &mut self,
        id: PlayerId,
        frame: u32,
        recycled: Option<Vec<u8>>,
    ) -> PlaybackResult<()> {
        let slot = self
            .assignment
            .get(&id)
            .copied()
            .ok_or_else(|| PlaybackError::worker(format!("{id} has no worker")))?;
        self.stats.renders += 1;
        tracing::trace!(%id, frame, "renderFrame sent");
        self.dispatch(
            slot,
            WorkerRequest::RenderFrame {
                id,
                frame,
                recycled,
            },
        )
    }

    pub(crate) fn destroy(&mut self, id: PlayerId) {
        let Some(slot) = self.assignment.remove(&id) else {
            return;
        };
        self.stats.destroys += 1;
        if let Err(e) = self.dispatch(slot, WorkerRequest::Destroy { id }) {
            tracing::debug!(%id, error = %e, "destroy not delivered");
        }
    }

    /// Replies received so far, without blocking.
    pub(crate) fn drain(&self) -> Vec<WorkerReply> {
        self.reply_rx.try_iter().collect()
    }

    /// Block until one reply arrives or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Duration) -> Option<WorkerReply> {
        match self.reply_rx.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn dispatch(&mut self, slot: usize, req: WorkerRequest) -> PlaybackResult<()> {
        match self.slots.get_mut(slot) {
            Some(WorkerSlot::Thread { tx, .. }) => tx
                .send(req)
                .map_err(|_| PlaybackError::worker(format!("decode worker {slot} is gone"))),
            Some(WorkerSlot::Inline(state)) => {
                if let Some(reply) = state.handle(req) {
                    self.reply_tx
                        .send(reply)
                        .map_err(|_| PlaybackError::worker("reply channel closed"))?;
                }
                Ok(())
            }
            None => Err(PlaybackError::worker(format!("no decode worker {slot}"))),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let WorkerSlot::Thread { tx, handle } = slot {
                let _ = tx.send(WorkerRequest::Shutdown);
                if let Some(h) = handle.take() {
                    let _ = h.join();
                }
            }
        }
    }
}

fn worker_loop(
    mut state: WorkerState,
    rx: Receiver<WorkerRequest>,
    replies: Sender<WorkerReply>,
) {
    for req in rx.iter() {
        if matches!(req, WorkerRequest::Shutdown) {
            break;
        }
        if let Some(reply) = state.handle(req) {
            // Main thread gone; nothing left to serve.
            if replies.send(reply).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/worker/pool.rs"]
mod tests;
