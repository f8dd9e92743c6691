//! Puzzle image rendering.
//!
//! The canvas shows the back row on a vertical gradient, with a horizontal
//! band across the middle revealing the front row. Two guide lines bound the
//! band; uniform pixel noise is applied last to frustrate naive pixel-diff
//! solvers. Output is JPEG, quality tuned for small payloads.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use rand::Rng;

use super::{PuzzleSession, ROW_LEN};

const WIDTH: u32 = 520;
const HEIGHT: u32 = 260;

/// Height of the front-row reveal band, vertically centered
const BAND_HEIGHT: u32 = 78;

const GLYPH_SCALE: f32 = 56.0;

/// Per-channel noise amplitude
const NOISE_AMPLITUDE: i16 = 14;

const GRADIENT_TOP: Rgb<u8> = Rgb([30, 48, 98]);
const GRADIENT_BOTTOM: Rgb<u8> = Rgb([126, 176, 226]);
const GLYPH_COLOR: Rgb<u8> = Rgb([244, 244, 236]);
const GUIDE_COLOR: Rgb<u8> = Rgb([236, 220, 130]);

/// System locations tried when the configured font path does not exist.
/// Covers the Debian/Ubuntu, Arch, and Fedora DejaVu packages.
const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// Resolve the glyph font path: the configured path wins when it exists,
/// otherwise the first present system fallback is used.
pub fn resolve_font_path(configured: &str) -> Result<String> {
    find_existing(configured, FALLBACK_FONT_PATHS).with_context(|| {
        format!(
            "No font file found at {configured} or any of {FALLBACK_FONT_PATHS:?}; \
             install DejaVu Sans or set a font path that exists"
        )
    })
}

fn find_existing(configured: &str, fallbacks: &[&str]) -> Option<String> {
    if std::path::Path::new(configured).exists() {
        return Some(configured.to_string());
    }
    for candidate in fallbacks {
        if std::path::Path::new(candidate).exists() {
            tracing::warn!(configured, fallback = candidate, "Configured font missing, using system fallback");
            return Some((*candidate).to_string());
        }
    }
    None
}

/// Rendering seam for the flow controller; lets tests run the state machine
/// without a font file on disk.
pub trait PuzzleRenderer: Send + Sync {
    fn render(&self, session: &PuzzleSession) -> Result<Vec<u8>>;
}

/// Production renderer: loaded font + tuned JPEG quality.
pub struct JpegRenderer {
    font: FontVec,
    jpeg_quality: u8,
}

impl JpegRenderer {
    pub fn new(font: FontVec, jpeg_quality: u8) -> Self {
        Self { font, jpeg_quality }
    }

    /// Load the glyph font from disk.
    pub fn from_font_path(path: &str, jpeg_quality: u8) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {path}"))?;
        let font = FontVec::try_from_vec(data).context("Failed to parse font file")?;
        Ok(Self::new(font, jpeg_quality))
    }
}

impl PuzzleRenderer for JpegRenderer {
    fn render(&self, session: &PuzzleSession) -> Result<Vec<u8>> {
        render(session, &self.font, self.jpeg_quality)
    }
}

/// Render a session to JPEG bytes. Recomputed on every rotate/regenerate;
/// never persisted.
pub fn render(session: &PuzzleSession, font: &FontVec, jpeg_quality: u8) -> Result<Vec<u8>> {
    let scale = PxScale::from(GLYPH_SCALE);

    let mut canvas = gradient_canvas();
    draw_centered_row(&mut canvas, font, scale, &session.back_row);

    // Front row on its own layer; only the band strip survives compositing.
    let mut front_layer = gradient_canvas();
    draw_centered_row(&mut front_layer, font, scale, &session.front_row);

    let band_top = (HEIGHT - BAND_HEIGHT) / 2;
    let band_bottom = band_top + BAND_HEIGHT;
    for y in band_top..band_bottom {
        for x in 0..WIDTH {
            canvas.put_pixel(x, y, *front_layer.get_pixel(x, y));
        }
    }

    for y in [band_top, band_bottom] {
        draw_line_segment_mut(
            &mut canvas,
            (0.0, y as f32),
            (WIDTH as f32, y as f32),
            GUIDE_COLOR,
        );
    }

    apply_noise(&mut canvas);

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
    encoder
        .encode_image(&canvas)
        .context("Failed to encode puzzle image")?;

    Ok(buf)
}

/// Vertical two-color gradient background
fn gradient_canvas() -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |_, y| {
        let t = y as f32 / (HEIGHT - 1) as f32;
        Rgb([
            lerp(GRADIENT_TOP.0[0], GRADIENT_BOTTOM.0[0], t),
            lerp(GRADIENT_TOP.0[1], GRADIENT_BOTTOM.0[1], t),
            lerp(GRADIENT_TOP.0[2], GRADIENT_BOTTOM.0[2], t),
        ])
    })
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Draw a 5-symbol row as one glyph string centered on the full canvas width.
fn draw_centered_row(canvas: &mut RgbImage, font: &FontVec, scale: PxScale, row: &[char; ROW_LEN]) {
    let text = row_text(row);
    let width = text_width(font, scale, &text);
    let x = ((WIDTH as f32 - width) / 2.0).max(0.0) as i32;
    let y = ((HEIGHT as f32 - GLYPH_SCALE) / 2.0) as i32;
    draw_text_mut(canvas, GLYPH_COLOR, x, y, scale, font, &text);
}

fn row_text(row: &[char; ROW_LEN]) -> String {
    let mut text = String::new();
    for (i, c) in row.iter().enumerate() {
        if i > 0 {
            text.push_str("  ");
        }
        text.push(*c);
    }
    text
}

fn text_width(font: &FontVec, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    text.chars().map(|c| scaled.h_advance(font.glyph_id(c))).sum()
}

/// Uniform per-channel noise over the whole canvas, fixed amplitude
fn apply_noise(canvas: &mut RgbImage) {
    let mut rng = rand::rng();
    for pixel in canvas.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let jitter = rng.random_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            *channel = (*channel as i16 + jitter).clamp(0, 255) as u8;
        }
    }
}
