//! Stickerplay is a playback engine for frame-based vector animations ("stickers" and inline
//! custom emoji).
//!
//! Compressed animation payloads are decoded frame by frame on a pool of worker threads, decoded
//! frames are shared through a reference-counted cache, and many simultaneous animations are
//! driven from one owner:
//!
//! - Create an [`Engine`] with an [`EngineConfig`], a [`Host`] and a [`DecoderFactory`]
//! - Attach animations with [`Engine::request_animation`]
//! - Report visibility with [`Engine::set_visible`] and call [`Engine::tick`] every frame
//! - Share one decode among identical inline occurrences through a synchronized renderer
//!   ([`Engine::create_renderer`], [`AnimationRequest::shared_in`])
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod cache;
pub(crate) mod emoji;
pub(crate) mod engine;
pub(crate) mod icon;
pub(crate) mod player;
pub(crate) mod scheduler;
pub(crate) mod worker;

pub use crate::foundation::config::{
    DeviceClass, DeviceProfile, EngineConfig, FrameStorage, WorkerMode,
};
pub use crate::foundation::core::{
    Direction, ElementId, Group, LoopMode, OccurrenceId, PixelSize, PlayerId, Point, Rect,
    RendererId, Rgb, Size,
};
pub use crate::foundation::error::{PlaybackError, PlaybackResult};

pub use crate::cache::frames::{CacheClass, CacheKey, FrameCache, FrameCacheEntry, FrameData};
pub use crate::emoji::renderer::RendererOptions;
pub use crate::engine::host::{AssetData, AssetKind, AssetSource, Document, Host, Liveness};
pub use crate::engine::playback::Engine;
pub use crate::engine::request::{AnimationHandle, AnimationRequest, Rendered, RequestId};
pub use crate::icon::composer::{
    ColorResolver, IconPart, IconSpec, PartRef, StateResolver,
};
pub use crate::player::kind::{PlayerEvent, PlayerEventKind, PlayerState};
pub use crate::player::loader::PlayerOptions;
pub use crate::player::lottie::FrameCallback;
pub use crate::player::policy::{
    CachePolicy, adjust_skip_for_fps, scale_for_display, skip_delta,
};
pub use crate::player::tint::{ThemeSource, Tint, apply_color, apply_inverse};
pub use crate::scheduler::intersector::AnimationKind;
pub use crate::worker::decoder::{
    DEFAULT_FPS, DecodedMeta, Decoder, DecoderFactory, sniff_frame_rate,
};
pub use crate::worker::pool::WorkerStats;
