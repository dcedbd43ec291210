use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::{PixelSize, PlayerId};

/// Per-player cancellation flag shared with the worker that owns the player's decoder.
///
/// Cancelled when the player is destroyed; a worker holding a cancelled token drops the request
/// instead of decoding.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Parameters of a `load` request.
#[derive(Debug)]
pub(crate) struct LoadRequest {
    pub(crate) id: PlayerId,
    pub(crate) payload: Arc<[u8]>,
    pub(crate) size: PixelSize,
    pub(crate) tone: Option<u8>,
    pub(crate) token: CancelToken,
}

/// Main thread -> worker.
#[derive(Debug)]
pub(crate) enum WorkerRequest {
    Load(LoadRequest),
    RenderFrame {
        id: PlayerId,
        frame: u32,
        /// Buffer handed back for reuse; replaced when its length does not fit.
        recycled: Option<Vec<u8>>,
    },
    Destroy {
        id: PlayerId,
    },
    Shutdown,
}

/// Worker -> main thread. Every reply carries the id of the request it answers.
#[derive(Debug)]
pub(crate) enum WorkerReply {
    Loaded {
        id: PlayerId,
        frame_count: u32,
        fps: f64,
    },
    Frame {
        id: PlayerId,
        frame: u32,
        pixels: Vec<u8>,
    },
    Error {
        id: PlayerId,
        reason: String,
    },
}

impl WorkerReply {
    pub(crate) fn id(&self) -> PlayerId {
        match self {
            Self::Loaded { id, .. } | Self::Frame { id, .. } | Self::Error { id, .. } => *id,
        }
    }
}
