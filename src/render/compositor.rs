use std::sync::Arc;

use kurbo::Shape as _;

use crate::assets::preload::{PreloadedImages, preload_images};
use crate::config::RenderConfig;
use crate::foundation::core::{Affine, Canvas, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::blend::{crossfade_rgba8_premul, premul_over_in_place};
use crate::render::caption::{CaptionBlock, CaptionLayoutEngine};
use crate::render::frame::FrameRGBA;
use crate::render::motion::{cover_fit, motion_at};
use crate::scene::model::{Animation, SceneDescriptor, validate_scenes};
use crate::timeline::{ScenePosition, Timeline};

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

struct SceneLayer {
    paint: Option<ImagePaint>,
    animation: Animation,
    caption: Option<CaptionBlock>,
}

/// Draws one output frame per [`ScenePosition`].
///
/// Owns its raster surfaces for the lifetime of one render invocation. Scene images come from the
/// preloader; a scene whose image is missing is drawn as background.
pub struct FrameCompositor {
    canvas: Canvas,
    background: [u8; 4],
    transition_frames: u32,
    layers: Vec<SceneLayer>,
    caption_font: Option<vello_cpu::peniko::FontData>,
    ctx: vello_cpu::RenderContext,
    current: vello_cpu::Pixmap,
    incoming: vello_cpu::Pixmap,
    overlay: vello_cpu::Pixmap,
    overlay_scene: Option<usize>,
    frame: FrameRGBA,
}

impl FrameCompositor {
    /// Create surfaces for `config.canvas` and bind each scene to its preloaded image.
    ///
    /// Fails only when the surfaces cannot be created.
    pub fn new(
        config: &RenderConfig,
        scenes: &[SceneDescriptor],
        images: &PreloadedImages,
    ) -> ReelResult<Self> {
        let canvas = config.canvas;
        let (w, h) = surface_size(canvas)?;

        let (mut engine, caption_font) = match config.caption_font.as_ref() {
            Some(bytes) => match CaptionLayoutEngine::new(Arc::clone(bytes)) {
                Ok(engine) => {
                    let font = engine.font().clone();
                    (Some(engine), Some(font))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "caption font unusable; captions disabled");
                    (None, None)
                }
            },
            None => (None, None),
        };
        if engine.is_none() && scenes.iter().any(|s| s.caption().is_some()) {
            tracing::warn!("scenes carry captions but no caption font is configured; skipping captions");
        }

        let mut layers = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let paint = match images.get(&scene.id) {
                Some(img) => Some(ImagePaint {
                    paint: vello_cpu::Image {
                        image: vello_cpu::ImageSource::Pixmap(Arc::new(
                            pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?,
                        )),
                        sampler: vello_cpu::peniko::ImageSampler::default(),
                    },
                    w: img.width,
                    h: img.height,
                }),
                None => None,
            };

            let caption = match (engine.as_mut(), scene.caption()) {
                (Some(engine), Some(text)) => match engine.layout(text, &config.caption, canvas) {
                    Ok(block) => Some(block),
                    Err(e) => {
                        tracing::warn!(scene = %scene.id, error = %e, "caption layout failed; skipping caption");
                        None
                    }
                },
                _ => None,
            };

            layers.push(SceneLayer {
                paint,
                animation: scene.animation,
                caption,
            });
        }

        Ok(Self {
            canvas,
            background: config.background_rgba,
            transition_frames: config.transition_frames,
            layers,
            caption_font,
            ctx: vello_cpu::RenderContext::new(w, h),
            current: vello_cpu::Pixmap::new(w, h),
            incoming: vello_cpu::Pixmap::new(w, h),
            overlay: vello_cpu::Pixmap::new(w, h),
            overlay_scene: None,
            frame: FrameRGBA::transparent(canvas),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Weight of the incoming scene at `pos`, or `None` outside a dissolve.
    ///
    /// The dissolve covers the last `transition_frames` frames of a non-terminal scene (at most
    /// half the scene) and needs both scenes' images. A scene without an image stays blank for
    /// its whole span.
    pub fn dissolve_weight(&self, pos: ScenePosition) -> Option<f32> {
        self.layers.get(pos.scene_index)?.paint.as_ref()?;
        self.layers.get(pos.scene_index + 1)?.paint.as_ref()?;
        let window = u64::from(self.transition_frames).min(pos.scene_frames / 2);
        if window == 0 {
            return None;
        }
        let start = pos.scene_frames - window;
        if pos.frame_in_scene < start {
            return None;
        }
        Some((pos.frame_in_scene - start + 1) as f32 / (window + 1) as f32)
    }

    /// Composite the frame at `pos`. The returned frame is reused by the next call.
    pub fn compose(&mut self, pos: ScenePosition) -> ReelResult<&FrameRGBA> {
        let layer = self.layers.get(pos.scene_index).ok_or_else(|| {
            ReelError::render(format!("scene index {} out of range", pos.scene_index))
        })?;
        render_scene_layer(
            &mut self.ctx,
            self.canvas,
            self.background,
            layer,
            pos.progress(),
            &mut self.current,
        );

        match self.dissolve_weight(pos) {
            Some(weight) => {
                let next = &self.layers[pos.scene_index + 1];
                render_scene_layer(
                    &mut self.ctx,
                    self.canvas,
                    self.background,
                    next,
                    0.0,
                    &mut self.incoming,
                );
                crossfade_rgba8_premul(
                    &mut self.frame.data,
                    self.current.data_as_u8_slice(),
                    self.incoming.data_as_u8_slice(),
                    weight,
                )?;
            }
            None => self
                .frame
                .data
                .copy_from_slice(self.current.data_as_u8_slice()),
        }

        self.draw_caption(pos.scene_index)?;
        Ok(&self.frame)
    }

    fn draw_caption(&mut self, scene_index: usize) -> ReelResult<()> {
        let (Some(block), Some(font)) = (
            self.layers[scene_index].caption.as_ref(),
            self.caption_font.as_ref(),
        ) else {
            return Ok(());
        };

        // The panel is static for a whole scene; rasterize it once.
        if self.overlay_scene != Some(scene_index) {
            self.overlay.data_as_u8_slice_mut().fill(0);
            self.ctx.reset();
            paint_caption(&mut self.ctx, block, font);
            self.ctx.flush();
            self.ctx.render_to_pixmap(&mut self.overlay);
            self.overlay_scene = Some(scene_index);
        }
        premul_over_in_place(&mut self.frame.data, self.overlay.data_as_u8_slice())
    }
}

fn render_scene_layer(
    ctx: &mut vello_cpu::RenderContext,
    canvas: Canvas,
    background: [u8; 4],
    layer: &SceneLayer,
    t: f64,
    dst: &mut vello_cpu::Pixmap,
) {
    let full = vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height));
    let [r, g, b, a] = background;

    dst.data_as_u8_slice_mut().fill(0);
    ctx.reset();
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    ctx.fill_rect(&full);

    if let Some(p) = layer.paint.as_ref() {
        let tr = motion_at(&layer.animation, t).to_affine(canvas) * cover_fit(p.w, p.h, canvas);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(p.paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(p.w),
            f64::from(p.h),
        ));
    }

    ctx.flush();
    ctx.render_to_pixmap(dst);
}

fn paint_caption(
    ctx: &mut vello_cpu::RenderContext,
    block: &CaptionBlock,
    font: &vello_cpu::peniko::FontData,
) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

    let [r, g, b, a] = block.panel_rgba;
    let panel = kurbo::RoundedRect::from_rect(block.panel, block.corner_radius);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    ctx.fill_path(&bezpath_to_cpu(&panel.to_path(0.1)));

    for run in &block.runs {
        let [r, g, b, a] = run.brush.0;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.glyph_run(font)
            .font_size(run.font_size)
            .fill_glyphs(run.glyphs.iter().cloned());
    }
}

fn surface_size(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ReelError::render("surface width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ReelError::render("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ReelError::render("surface width/height must be non-zero"));
    }
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("image height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(ReelError::render("image byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

/// Render a single composited frame, e.g. for a preview thumbnail.
///
/// Runs the same validation, preload and compositing as a full render, without audio or encoding.
#[tracing::instrument(skip_all, fields(frame = frame.0))]
pub fn render_still(
    scenes: &[SceneDescriptor],
    config: &RenderConfig,
    frame: FrameIndex,
) -> ReelResult<FrameRGBA> {
    config.validate()?;
    validate_scenes(scenes)?;
    let timeline = Timeline::new(scenes, config.fps)?;
    let pos = timeline.locate(frame).ok_or_else(|| {
        ReelError::validation(format!(
            "frame {} is past the end of the timeline ({} frames)",
            frame.0,
            timeline.total_frames()
        ))
    })?;

    let images = preload_images(scenes, config.canvas);
    let mut compositor = FrameCompositor::new(config, scenes, &images)?;
    compositor.compose(pos).cloned()
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
