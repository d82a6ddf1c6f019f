use crate::draw::{draw_commands, DisplayState, DrawCommand, Rgba};
use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use seqrec_cache::intern_text;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect,
    Transform,
};

fn color(rgba: Rgba) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn paint(rgba: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color(color(rgba));
    paint
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextKey {
    size_bits: u32,
    color: Rgba,
}

fn text_key(text: &str, size_px: f32, rgba: Rgba) -> (usize, TextKey) {
    let key = TextKey {
        size_bits: size_px.to_bits(),
        color: rgba,
    };
    (intern_text(text), key)
}

/// Rendered glyph runs, keyed by interned text id.
struct TextCache {
    font: FontVec,
    map: HashMap<(usize, TextKey), Arc<Pixmap>>,
}

impl TextCache {
    fn get_or_render(&mut self, text: &str, size_px: f32, rgba: Rgba) -> Option<Arc<Pixmap>> {
        let key = text_key(text, size_px, rgba);
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(text, size_px, &self.font, color(rgba))?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }
}

/// Lays out one line of text on a tight, transparent pixmap.
///
/// Returns `None` when no glyph of `text` has an outline (e.g. whitespace only).
pub fn render_text_pixmap<F: Font>(text: &str, font_size: f32, font: &F, color: Color) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // premultiplied source-over
            let a = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let src = [
                cu.red() as f32 * a,
                cu.green() as f32 * a,
                cu.blue() as f32 * a,
                a * 255.0,
            ];
            let bg = dst[i];
            let inv = 1.0 - a;
            let mix = |s: f32, d: u8| (s + d as f32 * inv).round().min(255.0) as u8;
            let alpha = mix(src[3], bg.alpha());
            let channel = |s: f32, d: u8| mix(s, d).min(alpha);
            if let Some(px) = PremultipliedColorU8::from_rgba(
                channel(src[0], bg.red()),
                channel(src[1], bg.green()),
                channel(src[2], bg.blue()),
                alpha,
            ) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Turns draw commands into pixels with tiny-skia.
///
/// Without a font, text commands are skipped; shapes still render.
pub struct Rasterizer {
    text: Option<TextCache>,
}

impl Rasterizer {
    pub fn new(font: Option<FontVec>) -> Self {
        Self {
            text: font.map(|font| TextCache {
                font,
                map: HashMap::new(),
            }),
        }
    }

    pub fn without_font() -> Self {
        Self::new(None)
    }

    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("parsing font {}", path.display()))?;
        Ok(Self::new(Some(font)))
    }

    pub fn has_font(&self) -> bool {
        self.text.is_some()
    }

    /// Number of distinct text runs rendered so far.
    pub fn cached_text_runs(&self) -> usize {
        self.text.as_ref().map_or(0, |t| t.map.len())
    }

    pub fn render(&mut self, state: &DisplayState, width: u32, height: u32) -> Result<Pixmap> {
        let mut canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
        self.rasterize(&draw_commands(state, width, height), &mut canvas)?;
        Ok(canvas)
    }

    pub fn rasterize(&mut self, commands: &[DrawCommand], canvas: &mut Pixmap) -> Result<()> {
        for command in commands {
            match command {
                DrawCommand::Clear { color: rgba } => canvas.fill(color(*rgba)),
                DrawCommand::Circle {
                    center,
                    radius,
                    color: rgba,
                } => {
                    // a zero-radius disc draws nothing
                    if *radius <= 0.0 {
                        continue;
                    }
                    let mut pb = PathBuilder::new();
                    pb.push_circle(center.0, center.1, *radius);
                    let path = pb.finish().context("circle path")?;
                    canvas.fill_path(
                        &path,
                        &paint(*rgba),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
                DrawCommand::Rect {
                    x,
                    y,
                    width,
                    height,
                    color: rgba,
                } => {
                    let rect = Rect::from_xywh(*x, *y, *width, *height)
                        .with_context(|| format!("invalid rect {width}x{height} at ({x}, {y})"))?;
                    canvas.fill_rect(rect, &paint(*rgba), Transform::identity(), None);
                }
                DrawCommand::Text {
                    text,
                    center,
                    size_px,
                    color: rgba,
                } => {
                    let Some(cache) = self.text.as_mut() else {
                        continue;
                    };
                    let Some(run) = cache.get_or_render(text, *size_px, *rgba) else {
                        continue;
                    };
                    let x = (center.0 - run.width() as f32 / 2.0).floor() as i32;
                    let y = (center.1 - run.height() as f32 / 2.0).floor() as i32;
                    canvas.draw_pixmap(
                        x,
                        y,
                        Pixmap::as_ref(&run),
                        &PixmapPaint::default(),
                        Transform::identity(),
                        None,
                    );
                }
            }
        }
        Ok(())
    }
}
