use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};
use crate::scene::model::{Animation, MediaPayload, SceneDescriptor, SceneId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScenarioDef {
    pub(crate) scenes: Vec<SceneDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SceneDef {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) duration_secs: f64,
    pub(crate) image: String,
    #[serde(default)]
    pub(crate) audio: Option<String>,
    #[serde(default)]
    pub(crate) caption: Option<String>,
    #[serde(default)]
    pub(crate) animation: Animation,
}

/// JSON scenario manifest: an ordered scene list whose image/audio fields are paths relative to
/// the manifest's directory.
///
/// ```json
/// { "scenes": [
///     { "id": "intro", "duration_secs": 5, "image": "img/01.png", "audio": "vo/01.mp3",
///       "caption": "Once upon a time", "animation": { "kind": "zoom", "direction": "in" } }
/// ] }
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    def: ScenarioDef,
}

impl Scenario {
    /// Parse a scenario from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let def: ScenarioDef = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse scenario JSON: {e}")))?;
        Ok(Self { def })
    }

    /// Parse a scenario from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open scenario JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Number of scenes declared.
    pub fn len(&self) -> usize {
        self.def.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.def.scenes.is_empty()
    }

    /// Read every referenced asset under `assets_root` and build scene descriptors.
    ///
    /// Image bytes are read but not decoded here; an unreadable image file is an error because the
    /// manifest itself is wrong, while undecodable bytes are left to the preloader's fallback.
    pub fn load_scenes(&self, assets_root: impl AsRef<Path>) -> ReelResult<Vec<SceneDescriptor>> {
        let root = assets_root.as_ref();
        let mut out = Vec::with_capacity(self.def.scenes.len());
        for (i, s) in self.def.scenes.iter().enumerate() {
            let image = read_payload(root, &s.image)?;
            let narration_audio = s
                .audio
                .as_deref()
                .map(|rel| read_payload(root, rel))
                .transpose()?;
            out.push(SceneDescriptor {
                id: SceneId::new(s.id.clone().unwrap_or_else(|| format!("scene-{}", i + 1))),
                sequence_index: i as u32,
                duration_secs: s.duration_secs,
                image,
                narration_audio,
                caption_text: s.caption.clone(),
                animation: s.animation,
            });
        }
        Ok(out)
    }
}

fn read_payload(root: &Path, rel: &str) -> ReelResult<MediaPayload> {
    let norm = normalize_rel_path(rel)?;
    let p = root.join(Path::new(&norm));
    let bytes = std::fs::read(&p).with_context(|| format!("failed to read asset '{}'", p.display()))?;
    Ok(MediaPayload::new(bytes, mime_type_for_path(&norm)))
}

/// Guess a MIME type from a file extension. Unknown extensions map to
/// `application/octet-stream`, leaving format detection to the decoders.
pub fn mime_type_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("aac") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// Normalize and validate manifest-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub(crate) fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/manifest.rs"]
mod tests;
