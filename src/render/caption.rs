use std::borrow::Cow;
use std::sync::Arc;

use crate::config::CaptionStyle;
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};

/// Straight-alpha RGBA8 brush carried through parley styles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CaptionBrush(pub [u8; 4]);

/// One shaped run, positioned in canvas pixels.
#[derive(Clone, Debug)]
pub struct CaptionRun {
    pub font_size: f32,
    pub brush: CaptionBrush,
    pub glyphs: Vec<vello_cpu::Glyph>,
}

/// A caption laid out for one canvas: the panel rectangle plus centered glyph runs.
#[derive(Clone, Debug)]
pub struct CaptionBlock {
    pub panel: Rect,
    pub corner_radius: f64,
    pub panel_rgba: [u8; 4],
    pub runs: Vec<CaptionRun>,
    pub line_count: usize,
}

/// Parley-based caption shaper bound to one font.
pub struct CaptionLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CaptionBrush>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl CaptionLayoutEngine {
    /// Register `font_bytes` as the caption font.
    pub fn new(font_bytes: Arc<Vec<u8>>) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ReelError::validation("no font families registered from caption font"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("caption font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
            0,
        );

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
        })
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Wrap `text` to `style.max_width_frac` of the canvas and place it in a bottom-centered panel.
    ///
    /// Lines are centered individually inside the panel.
    pub fn layout(
        &mut self,
        text: &str,
        style: &CaptionStyle,
        canvas: Canvas,
    ) -> ReelResult<CaptionBlock> {
        if !style.font_size_px.is_finite() || style.font_size_px <= 0.0 {
            return Err(ReelError::validation(
                "caption font_size_px must be finite and > 0",
            ));
        }
        let max_width = (canvas.width as f32 * style.max_width_frac).max(1.0);

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.font_size_px));
        builder.push_default(parley::style::StyleProperty::Brush(CaptionBrush(
            style.text_rgba,
        )));
        let mut layout: parley::Layout<CaptionBrush> = builder.build(text);
        layout.break_all_lines(Some(max_width));
        layout.align(
            Some(max_width),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );

        let line_widths: Vec<f32> = layout
            .lines()
            .map(|line| {
                let m = line.metrics();
                (m.advance - m.trailing_whitespace).max(0.0)
            })
            .collect();
        let block_w = line_widths.iter().copied().fold(0.0f32, f32::max);
        let block_h = layout.height();

        let pad = f64::from(style.padding_px);
        let panel_w = f64::from(block_w) + 2.0 * pad;
        let panel_h = f64::from(block_h) + 2.0 * pad;
        let cw = f64::from(canvas.width);
        let ch = f64::from(canvas.height);
        let panel_y1 = ch - f64::from(style.bottom_margin_frac) * ch;
        let panel_x0 = (cw - panel_w) / 2.0;
        let panel = Rect::new(panel_x0, panel_y1 - panel_h, panel_x0 + panel_w, panel_y1);

        let origin_x = (panel.x0 + pad) as f32;
        let origin_y = (panel.y0 + pad) as f32;
        let mut runs = Vec::new();
        for (line, line_w) in layout.lines().zip(&line_widths) {
            let shift = (block_w - line_w) / 2.0;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run
                    .positioned_glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: origin_x + shift + g.x,
                        y: origin_y + g.y,
                    })
                    .collect::<Vec<_>>();
                if glyphs.is_empty() {
                    continue;
                }
                runs.push(CaptionRun {
                    font_size: run.run().font_size(),
                    brush: run.style().brush,
                    glyphs,
                });
            }
        }

        Ok(CaptionBlock {
            panel,
            corner_radius: style.corner_radius_px,
            panel_rgba: style.panel_rgba,
            runs,
            line_count: line_widths.len(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
