use std::collections::HashMap;

use rayon::prelude::*;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::foundation::core::Canvas;
use crate::scene::model::{SceneDescriptor, SceneId};

/// Tagged per-item outcome of a batch preload.
///
/// One failed item never sinks the batch; it becomes `Missing` and the consumer applies its
/// documented fallback.
#[derive(Clone, Debug)]
pub enum Preloaded<T> {
    Ready(T),
    Missing { reason: String },
}

impl<T> Preloaded<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// Decoded scene images keyed by scene id.
#[derive(Clone, Debug, Default)]
pub struct PreloadedImages {
    slots: HashMap<SceneId, Preloaded<PreparedImage>>,
}

impl PreloadedImages {
    /// Ready image for `id`, or `None` when it is missing or unknown.
    pub fn get(&self, id: &SceneId) -> Option<&PreparedImage> {
        self.slots.get(id).and_then(Preloaded::ready)
    }

    pub fn slot(&self, id: &SceneId) -> Option<&Preloaded<PreparedImage>> {
        self.slots.get(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_missing()).count()
    }
}

/// Longest image side kept after decode: twice the larger canvas side, so zooms stay sharp
/// without holding multi-megapixel sources in memory.
pub fn max_image_side(canvas: Canvas) -> u32 {
    canvas
        .width
        .max(canvas.height)
        .saturating_mul(2)
        .min(u32::from(u16::MAX))
}

/// Decode every scene image concurrently and wait for all of them.
///
/// Each task produces only its own slot; undecodable bytes resolve to [`Preloaded::Missing`].
#[tracing::instrument(skip_all, fields(scenes = scenes.len()))]
pub fn preload_images(scenes: &[SceneDescriptor], canvas: Canvas) -> PreloadedImages {
    let max_side = max_image_side(canvas);
    let slots = scenes
        .par_iter()
        .map(|scene| {
            let slot = match decode_image(&scene.image.bytes, &scene.image.mime_type, max_side) {
                Ok(img) => Preloaded::Ready(img),
                Err(e) => {
                    tracing::warn!(scene = %scene.id, error = %e, "scene image unavailable; drawing blank frames");
                    Preloaded::Missing {
                        reason: e.to_string(),
                    }
                }
            };
            (scene.id.clone(), slot)
        })
        .collect::<HashMap<_, _>>();

    let out = PreloadedImages { slots };
    tracing::debug!(
        ready = out.len() - out.missing_count(),
        missing = out.missing_count(),
        "image preload settled"
    );
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/preload.rs"]
mod tests;
