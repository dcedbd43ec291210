use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::foundation::core::PlayerId;
use crate::foundation::error::{PlaybackError, PlaybackResult};
use crate::player::loader::PlayerRegistry;
use crate::player::tint::{ThemeSource, Tint};

/// One named frame range of a compound icon asset.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IconPart {
    /// Part name, e.g. `"muted-to-unmuted"`.
    pub name: String,
    /// First frame played.
    pub from: u32,
    /// Last frame played; below `from` for parts that run backwards.
    pub to: u32,
}

impl IconPart {
    /// Part covering `from..=to`.
    pub fn new(name: impl Into<String>, from: u32, to: u32) -> Self {
        Self {
            name: name.into(),
            from,
            to,
        }
    }
}

/// How a part is looked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartRef<'a> {
    /// By part name.
    Name(&'a str),
    /// By position in the declared table.
    Index(usize),
}

/// Maps `(new_state, previous_state)` to the name of the part to play.
pub type StateResolver = Arc<dyn Fn(&str, Option<&str>) -> Option<String> + Send + Sync>;

/// Maps a state to the tint the icon should wear in it.
pub type ColorResolver = Arc<dyn Fn(&str) -> Option<Tint> + Send + Sync>;

/// Declaration of one compound icon: its frame-range table and transition lookup.
#[derive(Clone)]
pub struct IconSpec {
    /// Icon name; requests refer to the icon by it.
    pub name: Arc<str>,
    /// Frame-range table.
    pub parts: Vec<IconPart>,
    /// Transition lookup.
    pub resolver: StateResolver,
    /// Optional per-state color lookup.
    pub colors: Option<ColorResolver>,
}

impl IconSpec {
    /// Icon without a color lookup.
    pub fn new(
        name: impl Into<Arc<str>>,
        parts: Vec<IconPart>,
        resolver: impl Fn(&str, Option<&str>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            parts,
            resolver: Arc::new(resolver),
            colors: None,
        }
    }

    /// Also recolor the icon per state.
    pub fn with_colors(mut self, colors: impl Fn(&str) -> Option<Tint> + Send + Sync + 'static) -> Self {
        self.colors = Some(Arc::new(colors));
        self
    }
}

impl fmt::Debug for IconSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconSpec")
            .field("name", &self.name)
            .field("parts", &self.parts)
            .field("colors", &self.colors.is_some())
            .finish_non_exhaustive()
    }
}

struct Icon {
    parts: Vec<IconPart>,
    resolver: StateResolver,
    colors: Option<ColorResolver>,
}

impl Icon {
    fn part(&self, part: PartRef<'_>) -> Option<&IconPart> {
        match part {
            PartRef::Name(name) => self.parts.iter().find(|p| p.name == name),
            PartRef::Index(idx) => self.parts.get(idx),
        }
    }
}

/// Registered compound icons.
#[derive(Default)]
pub(crate) struct IconComposer {
    icons: BTreeMap<Arc<str>, Icon>,
}

impl IconComposer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an icon after checking its part table.
    pub(crate) fn add(&mut self, spec: IconSpec) -> PlaybackResult<()> {
        if spec.name.is_empty() {
            return Err(PlaybackError::validation("icon name must not be empty"));
        }
        if spec.parts.is_empty() {
            return Err(PlaybackError::validation(format!(
                "icon '{}' declares no parts",
                spec.name
            )));
        }
        let mut seen = HashSet::new();
        for part in &spec.parts {
            if !seen.insert(part.name.as_str()) {
                return Err(PlaybackError::validation(format!(
                    "icon '{}' declares part '{}' twice",
                    spec.name, part.name
                )));
            }
        }
        tracing::debug!(icon = %spec.name, parts = spec.parts.len(), "icon registered");
        self.icons.insert(
            spec.name,
            Icon {
                parts: spec.parts,
                resolver: spec.resolver,
                colors: spec.colors,
            },
        );
        Ok(())
    }

    pub(crate) fn contains(&self, icon: &str) -> bool {
        self.icons.contains_key(icon)
    }

    pub(crate) fn get_part(&self, icon: &str, part: PartRef<'_>) -> Option<&IconPart> {
        self.icons.get(icon)?.part(part)
    }

    /// Play the transition into `state` once on `player`, and apply the state's color.
    pub(crate) fn set_state(
        &self,
        icon: &str,
        player: PlayerId,
        state: &str,
        prev: Option<&str>,
        players: &mut PlayerRegistry,
        themes: &dyn ThemeSource,
    ) -> PlaybackResult<IconPart> {
        let entry = self
            .icons
            .get(icon)
            .ok_or_else(|| PlaybackError::validation(format!("unknown icon '{icon}'")))?;
        let name = (entry.resolver)(state, prev).ok_or_else(|| {
            PlaybackError::validation(format!(
                "icon '{icon}' has no transition from {prev:?} to '{state}'"
            ))
        })?;
        let part = entry.part(PartRef::Name(&name)).cloned().ok_or_else(|| {
            PlaybackError::validation(format!("icon '{icon}' has no part '{name}'"))
        })?;

        if let Some(colors) = &entry.colors
            && let Some(tint) = colors(state)
        {
            players.set_tint(player, Some(tint), themes, false);
        }
        players.play_part(player, part.from, part.to, None)?;
        tracing::debug!(%icon, %player, state, part = %part.name, "icon state");
        Ok(part)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/icon/composer.rs"]
mod tests;
