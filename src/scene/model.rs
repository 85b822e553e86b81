use std::collections::HashSet;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Stable scene identifier, used as the key of per-scene preload slots.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque encoded media bytes plus their declared MIME type.
///
/// Bytes are shared, so cloning a descriptor (e.g. when re-indexing an export sub-range) never
/// copies payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Arc<Vec<u8>>,
    pub mime_type: String,
}

impl MediaPayload {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
            mime_type: mime_type.into(),
        }
    }
}

/// Camera motion applied to a scene's still image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// Static framing.
    #[default]
    None,
    /// Scale about the frame center.
    Zoom,
    /// Horizontal drift.
    Pan,
    /// Zoom plus horizontal drift.
    PanZoom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    #[default]
    In,
    Out,
    Left,
    Right,
}

/// Scene animation parameters. `intensity` is clamped into `[0, 1]` when evaluated.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Animation {
    pub kind: AnimationKind,
    pub direction: AnimationDirection,
    pub intensity: f64,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            kind: AnimationKind::None,
            direction: AnimationDirection::In,
            intensity: 0.3,
        }
    }
}

impl Animation {
    pub fn zoom(direction: AnimationDirection, intensity: f64) -> Self {
        Self {
            kind: AnimationKind::Zoom,
            direction,
            intensity,
        }
    }

    pub fn pan(direction: AnimationDirection, intensity: f64) -> Self {
        Self {
            kind: AnimationKind::Pan,
            direction,
            intensity,
        }
    }
}

/// One timeline unit: an image, optional narration, a duration and optional caption text.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneDescriptor {
    pub id: SceneId,
    pub sequence_index: u32,
    pub duration_secs: f64,
    pub image: MediaPayload,
    pub narration_audio: Option<MediaPayload>,
    pub caption_text: Option<String>,
    pub animation: Animation,
}

impl SceneDescriptor {
    /// Whether this scene contributes narration to the mixdown.
    pub fn provides_audio(&self) -> bool {
        self.narration_audio.is_some()
    }

    /// Caption text with surrounding whitespace trimmed, or `None` when empty.
    pub fn caption(&self) -> Option<&str> {
        self.caption_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Check the per-render invariants on a scene list.
///
/// - at least one scene
/// - every `duration_secs` finite and `> 0`
/// - `sequence_index` strictly increasing by exactly one
/// - scene ids unique
pub fn validate_scenes(scenes: &[SceneDescriptor]) -> ReelResult<()> {
    let Some(first) = scenes.first() else {
        return Err(ReelError::validation("render requires at least one scene"));
    };

    let mut seen = HashSet::with_capacity(scenes.len());
    let mut expected = first.sequence_index;
    for scene in scenes {
        if !scene.duration_secs.is_finite() || scene.duration_secs <= 0.0 {
            return Err(ReelError::validation(format!(
                "scene '{}' duration_secs must be finite and > 0 (got {})",
                scene.id, scene.duration_secs
            )));
        }
        if scene.sequence_index != expected {
            return Err(ReelError::validation(format!(
                "scene '{}' has sequence_index {}, expected {expected}",
                scene.id, scene.sequence_index
            )));
        }
        if !seen.insert(&scene.id) {
            return Err(ReelError::validation(format!(
                "duplicate scene id '{}'",
                scene.id
            )));
        }
        expected = expected.saturating_add(1);
    }
    Ok(())
}

/// Clone `scenes` with `sequence_index` rewritten to `0..n`.
pub fn reindexed(scenes: &[SceneDescriptor]) -> Vec<SceneDescriptor> {
    scenes
        .iter()
        .enumerate()
        .map(|(i, s)| SceneDescriptor {
            sequence_index: i as u32,
            ..s.clone()
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
