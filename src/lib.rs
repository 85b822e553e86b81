//! storyreel turns an ordered list of scenes (a still image, optional narration, a duration and
//! optional caption each) into one encoded video.
//!
//! The pipeline for a single render:
//!
//! - validate scenes and lay out the [`Timeline`]
//! - decode every image and narration up front ([`assets`], [`audio`])
//! - mix narration into one track, then pace frames against a [`RenderClock`]
//! - composite each frame (pan/zoom, cross-dissolve, captions) and stream it to a
//!   [`StreamEncoder`]
//!
//! [`ExportController`] is the entry point for callers that want one or more output parts.
#![forbid(unsafe_code)]

mod foundation;

/// Image decoding and the scene image preloader.
pub mod assets;
/// Narration decoding and mixdown.
pub mod audio;
pub mod config;
/// Encoders.
pub mod encode;
pub mod export;
pub mod progress;
/// Clock, compositor, and render scheduler.
pub mod render;
/// Scene descriptors and scenario manifests.
pub mod scene;
pub mod timeline;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, FrameRange, Rect, Vec2};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::preload::{Preloaded, PreloadedImages, preload_images};
pub use crate::audio::decode::{AudioPcm, decode_audio};
pub use crate::audio::mix::{MixedAudioTrack, mixdown};
pub use crate::config::{CaptionStyle, Container, OutputSettings, Pacing, RenderConfig};
pub use crate::encode::encoder::{
    AudioInputConfig, EncodedOutput, EncoderConfig, InMemoryEncoder, StreamEncoder,
};
pub use crate::encode::ffmpeg::{FfmpegEncoder, is_ffmpeg_on_path};
pub use crate::export::{
    EncoderFactory, ExportController, ExportOutcome, ExportPart, FfmpegEncoderFactory,
    HalfRounding, InMemoryEncoderFactory, SplitRule, SubRange, SubRangeLabel, split_scenes,
};
pub use crate::progress::{ProgressEvent, RenderStatus};
pub use crate::render::clock::{AudioClock, RenderClock, VirtualClock, WallClock};
pub use crate::render::compositor::{FrameCompositor, render_still};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::scheduler::{RenderClockState, RenderResult, RenderScheduler, RenderState};
pub use crate::scene::manifest::Scenario;
pub use crate::scene::model::{
    Animation, AnimationDirection, AnimationKind, MediaPayload, SceneDescriptor, SceneId,
};
pub use crate::timeline::{ScenePosition, Timeline};
