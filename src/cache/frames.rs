use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::foundation::config::FrameStorage;
use crate::foundation::core::PixelSize;

/// Identity of one decodable animation at one rendering configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: Arc<str>,
    size: PixelSize,
    tint: Option<Arc<str>>,
    tone: Option<u8>,
}

impl CacheKey {
    /// Key for `name` rendered at `size` with an optional tint identity and skin tone.
    pub fn new(
        name: impl Into<Arc<str>>,
        size: PixelSize,
        tint: Option<Arc<str>>,
        tone: Option<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            tint,
            tone,
        }
    }

    /// Asset name or content id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rendered pixel size.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Whether this key names a tinted variant.
    pub fn is_tinted(&self) -> bool {
        self.tint.is_some()
    }

    /// Skin-tone index, if any.
    pub fn tone(&self) -> Option<u8> {
        self.tone
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.size.width, self.size.height)?;
        if let Some(t) = &self.tint {
            write!(f, "-colored:{t}")?;
        }
        if let Some(tone) = self.tone {
            write!(f, "-{tone}")?;
        }
        Ok(())
    }
}

/// Retention class of a cache entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheClass {
    /// Freed as soon as the last user releases it.
    #[default]
    Regular,
    /// Kept after the last release; frames are tiny.
    SmallIcon,
}

/// One decoded frame in whichever form the runtime stores.
#[derive(Clone, Debug)]
pub enum FrameData {
    /// Tightly packed straight-alpha RGBA8 pixels.
    Raw {
        /// Frame size.
        size: PixelSize,
        /// Pixel bytes, `size.rgba_len()` long.
        pixels: Arc<Vec<u8>>,
    },
    /// Ready-to-blit raster image.
    Raster(Arc<RgbaImage>),
}

impl FrameData {
    /// Wrap decoder output in the requested storage form.
    ///
    /// Returns `None` when `pixels` does not match `size`.
    pub fn from_pixels(size: PixelSize, pixels: Vec<u8>, storage: FrameStorage) -> Option<Self> {
        if pixels.len() != size.rgba_len() {
            return None;
        }
        Some(match storage {
            FrameStorage::RawPixels => Self::Raw {
                size,
                pixels: Arc::new(pixels),
            },
            FrameStorage::Raster => {
                Self::Raster(Arc::new(RgbaImage::from_raw(size.width, size.height, pixels)?))
            }
        })
    }

    /// Frame size.
    pub fn size(&self) -> PixelSize {
        match self {
            Self::Raw { size, .. } => *size,
            Self::Raster(img) => PixelSize::new(img.width(), img.height()),
        }
    }

    /// Raw bytes of the frame regardless of storage form.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Raw { pixels, .. } => pixels.as_slice(),
            Self::Raster(img) => img.as_raw().as_slice(),
        }
    }

    /// Take the pixel buffer back if nothing else holds it.
    pub(crate) fn into_recyclable(self) -> Option<Vec<u8>> {
        match self {
            Self::Raw { pixels, .. } => Arc::try_unwrap(pixels).ok(),
            Self::Raster(img) => Arc::try_unwrap(img).ok().map(RgbaImage::into_raw),
        }
    }
}

/// Decoded frames of one asset configuration plus its user count.
#[derive(Debug, Default)]
pub struct FrameCacheEntry {
    frames: HashMap<u32, Arc<Vec<u8>>>,
    frames_raster: HashMap<u32, Arc<RgbaImage>>,
    frame_size: PixelSize,
    counter: u32,
    class: CacheClass,
}

impl FrameCacheEntry {
    /// Empty, unreferenced entry.
    pub fn new(class: CacheClass) -> Self {
        Self {
            class,
            ..Self::default()
        }
    }

    /// Stored frame, in whichever form it was stored.
    pub fn get(&self, frame: u32) -> Option<FrameData> {
        if let Some(img) = self.frames_raster.get(&frame) {
            return Some(FrameData::Raster(Arc::clone(img)));
        }
        self.frames.get(&frame).map(|px| FrameData::Raw {
            size: self.frame_size,
            pixels: Arc::clone(px),
        })
    }

    /// Whether `frame` is stored in any form.
    pub fn contains(&self, frame: u32) -> bool {
        self.frames.contains_key(&frame) || self.frames_raster.contains_key(&frame)
    }

    /// Store `data` under `frame`, keeping at most one storage form per frame.
    pub fn insert(&mut self, frame: u32, data: FrameData) {
        match data {
            FrameData::Raw { size, pixels } => {
                self.frame_size = size;
                self.frames_raster.remove(&frame);
                self.frames.insert(frame, pixels);
            }
            FrameData::Raster(img) => {
                self.frame_size = PixelSize::new(img.width(), img.height());
                self.frames.remove(&frame);
                self.frames_raster.insert(frame, img);
            }
        }
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len() + self.frames_raster.len()
    }

    /// Return `true` when no frames are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current user count.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Drop every stored frame, independent of the user count.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.frames_raster.clear();
    }
}

/// Reference-counted store of decoded frames keyed by asset configuration.
#[derive(Debug, Default)]
pub struct FrameCache {
    entries: HashMap<CacheKey, FrameCacheEntry>,
}

impl FrameCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference on `key`, creating an empty entry if needed.
    pub fn acquire(&mut self, key: &CacheKey, class: CacheClass) -> &mut FrameCacheEntry {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| FrameCacheEntry::new(class));
        entry.counter = entry.counter.saturating_add(1);
        tracing::trace!(key = %key, counter = entry.counter, "frame cache acquire");
        entry
    }

    /// Drop one reference on `key`.
    ///
    /// Returns `true` when this release removed the entry. Releasing more often than acquiring is
    /// logged and clamped at zero.
    pub fn release(&mut self, key: &CacheKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::warn!(key = %key, "frame cache release without entry");
            return false;
        };
        if entry.counter == 0 {
            tracing::warn!(key = %key, "frame cache counter underflow clamped");
            return false;
        }
        entry.counter -= 1;
        if entry.counter > 0 || entry.class == CacheClass::SmallIcon {
            return false;
        }
        if let Some(mut entry) = self.entries.remove(key) {
            entry.clear();
        }
        tracing::debug!(key = %key, "frame cache entry freed");
        true
    }

    /// Entry for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<&FrameCacheEntry> {
        self.entries.get(key)
    }

    /// Mutable entry for `key`, if any.
    pub fn get_mut(&mut self, key: &CacheKey) -> Option<&mut FrameCacheEntry> {
        self.entries.get_mut(key)
    }

    /// User count of `key`, `0` when absent.
    pub fn counter(&self, key: &CacheKey) -> u32 {
        self.entries.get(key).map_or(0, FrameCacheEntry::counter)
    }

    /// Entries that still have at least one user.
    pub fn live_entries(&self) -> usize {
        self.entries.values().filter(|e| e.counter > 0).count()
    }

    /// Entries retained, including unreferenced small-icon entries.
    pub fn retained_entries(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/frames.rs"]
mod tests;
