use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use tracing::{debug, info};

use crate::analysis::RankedTerm;
use crate::config::WordCloudSettings;

/// Colours cycled over placed words, largest first.
const PALETTE: [[u8; 3]; 8] = [
    [253, 231, 37],
    [181, 222, 43],
    [110, 206, 88],
    [53, 183, 121],
    [31, 158, 137],
    [38, 130, 142],
    [49, 104, 142],
    [62, 73, 137],
];

/// Radial growth of the spiral per turn, in pixels.
const SPIRAL_PITCH: f32 = 4.0;

#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    pub width: u32,
    pub height: u32,
    pub min_font: u32,
    pub max_font: u32,
    pub max_words: usize,
}

impl From<&WordCloudSettings> for LayoutOptions {
    fn from(s: &WordCloudSettings) -> Self {
        LayoutOptions {
            width: s.width,
            height: s.height,
            min_font: s.min_font_size,
            max_font: s.max_font_size,
            max_words: s.max_words,
        }
    }
}

/// A word with its final size and top-left corner on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub word: String,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Summed-area table over the occupied pixels.
struct Occupancy {
    width: usize,
    height: usize,
    filled: Vec<bool>,
    integral: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Occupancy {
            width,
            height,
            filled: vec![false; width * height],
            integral: vec![0; (width + 1) * (height + 1)],
        }
    }

    fn is_free(&self, x: usize, y: usize, w: usize, h: usize) -> bool {
        let stride = self.width + 1;
        let at = |cx: usize, cy: usize| self.integral[cy * stride + cx];
        at(x + w, y + h) + at(x, y) == at(x + w, y) + at(x, y + h)
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..y + h {
            let start = row * self.width;
            self.filled[start + x..start + x + w].fill(true);
        }
        // rows above the word keep their sums
        let stride = self.width + 1;
        for row in y..self.height {
            let mut acc = 0;
            for col in 0..self.width {
                acc += u32::from(self.filled[row * self.width + col]);
                self.integral[(row + 1) * stride + col + 1] = self.integral[row * stride + col + 1] + acc;
            }
        }
    }
}

/// First free position for a `w`×`h` box along a spiral from the centre.
fn spiral_search(occ: &Occupancy, w: u32, h: u32) -> Option<(u32, u32)> {
    let (cw, ch) = (occ.width as f32, occ.height as f32);
    if w as f32 > cw || h as f32 > ch {
        return None;
    }
    let max_radius = (cw * cw + ch * ch).sqrt() / 2.0;
    let a = SPIRAL_PITCH / std::f32::consts::TAU;

    let mut theta = 0.0f32;
    loop {
        let r = a * theta;
        if r > max_radius {
            return None;
        }
        let cx = cw / 2.0 + r * theta.cos() - w as f32 / 2.0;
        let cy = ch / 2.0 + r * theta.sin() - h as f32 / 2.0;
        if cx >= 0.0 && cy >= 0.0 {
            let (x, y) = (cx as usize, cy as usize);
            let (wu, hu) = (w as usize, h as usize);
            if x + wu <= occ.width && y + hu <= occ.height && occ.is_free(x, y, wu, hu) {
                return Some((x as u32, y as u32));
            }
        }
        // roughly one pixel of arc per step
        theta += (1.0 / r.max(1.0)).min(0.5);
    }
}

/// Place words by descending score, sized in proportion to the top score.
///
/// A word that does not fit is shrunk one pixel at a time; once a word fails
/// at `min_font` the cloud is full and placement stops. `measure` returns the
/// pixel box of a word at a font size.
pub fn layout<F>(words: &[RankedTerm], opts: &LayoutOptions, mut measure: F) -> Vec<Placed>
where
    F: FnMut(&str, u32) -> (u32, u32),
{
    let mut ranked: Vec<&RankedTerm> = words.iter().filter(|t| t.score > 0.0).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    ranked.truncate(opts.max_words);

    let Some(top) = ranked.first().map(|t| t.score) else {
        return Vec::new();
    };

    let mut occ = Occupancy::new(opts.width, opts.height);
    let mut placed = Vec::new();

    'words: for term in ranked {
        let proportional = (f64::from(opts.max_font) * term.score / top).round() as u32;
        let mut size = proportional.clamp(opts.min_font, opts.max_font);
        loop {
            let (w, h) = measure(&term.term, size);
            if w > 0 && h > 0 {
                if let Some((x, y)) = spiral_search(&occ, w, h) {
                    occ.fill(x as usize, y as usize, w as usize, h as usize);
                    placed.push(Placed {
                        word: term.term.clone(),
                        font_size: size,
                        x,
                        y,
                        w,
                        h,
                    });
                    continue 'words;
                }
            }
            if size <= opts.min_font {
                debug!("No room for {:?} at {}px, stopping", term.term, size);
                break 'words;
            }
            size -= 1;
        }
    }

    placed
}

fn measure_text(font: &FontVec, text: &str, size: u32) -> (u32, u32) {
    let scaled = font.as_scaled(PxScale::from(size as f32));
    let mut width = 0.0f32;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    (width.ceil() as u32, scaled.height().ceil() as u32)
}

fn draw_word(img: &mut RgbImage, font: &FontVec, p: &Placed, color: [u8; 3]) {
    let scaled = font.as_scaled(PxScale::from(p.font_size as f32));
    let baseline = p.y as f32 + scaled.ascent();
    let mut caret = p.x as f32;
    let mut prev = None;

    for c in p.word.chars() {
        let id = scaled.glyph_id(c);
        if let Some(pid) = prev {
            caret += scaled.kern(pid, id);
        }
        let glyph = id.with_scale_and_position(scaled.scale(), ab_glyph::point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + i64::from(gx);
            let py = bounds.min.y as i64 + i64::from(gy);
            if px < 0 || py < 0 || px >= i64::from(img.width()) || py >= i64::from(img.height()) {
                return;
            }
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            let a = coverage.clamp(0.0, 1.0);
            for (dst, src) in pixel.0.iter_mut().zip(color) {
                *dst = (f32::from(*dst) * (1.0 - a) + f32::from(src) * a).round() as u8;
            }
        });
    }
}

/// Lay out and rasterize the keyword scores, then write the PNG.
pub fn render(words: &[RankedTerm], settings: &WordCloudSettings, output: &Path) -> Result<usize> {
    let background = settings.background_rgb()?;
    let font_data = std::fs::read(&settings.font_path)
        .with_context(|| format!("Failed to read font {}", settings.font_path.display()))?;
    let font = FontVec::try_from_vec(font_data)
        .with_context(|| format!("Invalid font {}", settings.font_path.display()))?;

    let opts = LayoutOptions::from(settings);
    let placed = layout(words, &opts, |word, size| measure_text(&font, word, size));
    info!("Placed {} of {} words", placed.len(), words.len().min(opts.max_words));

    let mut img = RgbImage::from_pixel(opts.width, opts.height, Rgb(background));
    for (i, p) in placed.iter().enumerate() {
        draw_word(&mut img, &font, p, PALETTE[i % PALETTE.len()]);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    img.save_with_format(output, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(placed.len())
}

// ── Tests ──
