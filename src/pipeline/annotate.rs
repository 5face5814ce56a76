//! Text-header rendering and composite persistence.
//!
//! The recognized text is word-wrapped, measured line by line, and drawn
//! black-on-white in a band prepended above the original image. The band's
//! height is the sum of each wrapped line's rendered glyph-box height plus
//! padding at top and bottom; the original pixels start exactly where the
//! band ends, so text never overlaps image content.
//!
//! ## Font fallback
//!
//! A TrueType face is tried first ([`crate::config::OcrConfig::font_path`]).
//! When it is missing or unparseable the renderer degrades to the built-in
//! 8×8 bitmap glyphs scaled up to approximate the configured size — loading
//! a font can therefore never fail a file. The bitmap set covers printable
//! ASCII; anything outside renders as `?`.

use crate::config::OcrConfig;
use crate::error::FileError;
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use tracing::{debug, warn};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// The font used for header text: a loaded TrueType face, or the built-in
/// bitmap glyphs when none could be loaded.
pub enum HeaderFont {
    Truetype { font: FontVec, scale: PxScale },
    Bitmap { scale: u32 },
}

impl HeaderFont {
    /// Load `font_path` at `font_size`, degrading to bitmap glyphs on any
    /// failure. Never errors.
    pub fn load(font_path: &Path, font_size: f32) -> Self {
        match std::fs::read(font_path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!("Loaded font {} at {}px", font_path.display(), font_size);
                    return HeaderFont::Truetype {
                        font,
                        scale: PxScale::from(font_size),
                    };
                }
                Err(e) => warn!(
                    "{}: not a usable font ({}), using bitmap glyphs",
                    font_path.display(),
                    e
                ),
            },
            Err(e) => warn!(
                "{}: cannot read font ({}), using bitmap glyphs",
                font_path.display(),
                e
            ),
        }
        HeaderFont::Bitmap {
            scale: bitmap_scale(font_size),
        }
    }

    /// Rendered glyph-box height of one line. The vertical cursor advances
    /// by exactly this amount after the line is drawn.
    pub fn line_height(&self, line: &str) -> u32 {
        match self {
            HeaderFont::Truetype { font, scale } => text_size(*scale, font, line).1,
            HeaderFont::Bitmap { scale } => 8 * scale,
        }
    }

    fn draw_line(&self, canvas: &mut RgbImage, x: i32, y: i32, line: &str) {
        match self {
            HeaderFont::Truetype { font, scale } => {
                draw_text_mut(canvas, BLACK, x, y, *scale, font, line);
            }
            HeaderFont::Bitmap { scale } => draw_bitmap_line(canvas, x, y, *scale, line),
        }
    }
}

/// Integer upscale that brings the 8 px glyph grid closest to `font_size`.
fn bitmap_scale(font_size: f32) -> u32 {
    ((font_size / 8.0).round() as u32).max(1)
}

/// Render one line of bitmap glyphs. Bit `k` of a glyph row is the pixel in
/// column `k`, leftmost first; each set bit becomes a `scale`×`scale` block.
fn draw_bitmap_line(canvas: &mut RgbImage, x: i32, y: i32, scale: u32, line: &str) {
    let mut cursor_x = x;
    for ch in line.chars() {
        let glyph = bitmap_glyph(ch);
        for (row_idx, row) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if (row >> col) & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = cursor_x + (col * scale + dx) as i32;
                        let py = y + (row_idx as u32 * scale + dy) as i32;
                        if px >= 0
                            && py >= 0
                            && (px as u32) < canvas.width()
                            && (py as u32) < canvas.height()
                        {
                            canvas.put_pixel(px as u32, py as u32, BLACK);
                        }
                    }
                }
            }
        }
        cursor_x += (8 * scale) as i32;
    }
}

fn bitmap_glyph(ch: char) -> [u8; 8] {
    let idx = ch as usize;
    if idx < font8x8::legacy::BASIC_LEGACY.len() {
        font8x8::legacy::BASIC_LEGACY[idx]
    } else {
        font8x8::legacy::BASIC_LEGACY[b'?' as usize]
    }
}

/// Word-wrap `text` at the configured width, capped at `max_text_lines`.
///
/// Widths count characters, not display columns, so a line holds the same
/// number of CJK glyphs as Latin ones. Line breaks and tabs the model
/// emitted are flattened to spaces before wrapping; only the wrap width
/// decides where lines end. Blank text produces no lines at all;
/// `textwrap` would hand back a single empty line, which still has a
/// rendered height under the bitmap glyphs.
fn wrap_lines(text: &str, config: &OcrConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let flat = text.replace(['\t', '\n', '\x0B', '\x0C', '\r'], " ");
    let mut lines: Vec<String> = textwrap::wrap(&flat, config.wrap_width)
        .into_iter()
        .map(|cow| cow.into_owned())
        .collect();
    if lines.len() > config.max_text_lines {
        warn!(
            "Text block truncated from {} to {} lines",
            lines.len(),
            config.max_text_lines
        );
        lines.truncate(config.max_text_lines);
    }
    lines
}

/// Compose the annotated image: wrapped text in a white band above the
/// original pixels.
///
/// The band is `Σ line heights + 2 × padding` tall and spans the full image
/// width; lines are drawn left-aligned at `x = padding`, each advancing the
/// cursor by its own height. With no text the band is just the padding.
pub fn annotate(
    image: &DynamicImage,
    text: &str,
    font: &HeaderFont,
    config: &OcrConfig,
) -> RgbImage {
    let lines = wrap_lines(text, config);
    let block_height: u32 =
        lines.iter().map(|l| font.line_height(l)).sum::<u32>() + 2 * config.padding;

    let (width, height) = (image.width(), image.height());
    let mut canvas = RgbImage::from_pixel(width, height + block_height, WHITE);
    image::imageops::replace(&mut canvas, &image.to_rgb8(), 0, i64::from(block_height));

    let mut y = config.padding as i32;
    for line in &lines {
        font.draw_line(&mut canvas, config.padding as i32, y, line);
        y += font.line_height(line) as i32;
    }

    canvas
}

/// Write the composite to `path`; the encoder is chosen by the extension.
pub fn save_composite(composite: &RgbImage, path: &Path, file_name: &str) -> Result<(), FileError> {
    composite.save(path).map_err(|e| FileError::Save {
        file: file_name.to_string(),
        detail: e.to_string(),
    })
}
