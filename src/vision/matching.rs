//! # Template Localization
//!
//! Finds the best position of a template inside a frame using zero-mean
//! normalized cross-correlation (ZNCC) on luma:
//!
//! ```text
//!            n·Σtf − Σt·Σf
//! score = ───────────────────────────────
//!         √((n·Σt² − (Σt)²)(n·Σf² − (Σf)²))
//! ```
//!
//! `Σtf` comes from imageproc's cross-correlation surface, the window sums
//! of `f` and `f²` from summed-area tables. Negative scores are clamped to 0,
//! so confidence lies in `[0, 1]` and 1.0 is a perfect match. Flat windows
//! (zero variance) score 0.
//!
//! ## Coarse-to-fine
//! Full-display frames are too large for an exhaustive search every cycle.
//! When the frame is big and the template can afford it, both are
//! downscaled, the coarse peak is found, and the exact position is refined
//! at full resolution around it. The reported confidence is always the
//! full-resolution score.

use super::Frame;
use super::template::Template;
use image::GrayImage;
use image::imageops::FilterType;
use imageproc::template_matching::{MatchTemplateMethod, match_template_parallel};
use rayon::prelude::*;

/// Confidence below this means "template not found". The caller decides
/// what that implies.
pub const LOCALIZATION_THRESHOLD: f64 = 0.7;

/// Frames smaller than this are always searched exhaustively.
const COARSE_MIN_FRAME_PIXELS: u64 = 250_000;
/// Shortest template side allowed after downscaling.
const COARSE_MIN_TEMPLATE_SIDE: u32 = 16;

/// Best match of a template in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub confidence: f64,
    /// Top-left corner of the best match, in frame pixels.
    pub x: u32,
    pub y: u32,
}

impl MatchResult {
    fn nothing() -> Self {
        Self { confidence: 0.0, x: 0, y: 0 }
    }

    pub fn is_found(&self) -> bool {
        self.confidence >= LOCALIZATION_THRESHOLD
    }

    /// Higher confidence wins; ties go to the lowest row, then column.
    fn better(self, other: Self) -> Self {
        if other.confidence > self.confidence
            || (other.confidence == self.confidence && (other.y, other.x) < (self.y, self.x))
        {
            other
        } else {
            self
        }
    }
}

/// Locate `template` in `frame`. Deterministic for identical inputs.
pub fn locate(frame: &Frame, template: &Template) -> MatchResult {
    let frame_gray = image::imageops::grayscale(frame);
    locate_gray(&frame_gray, template.gray())
}

/// [`locate`] on luma images.
pub fn locate_gray(frame: &GrayImage, template: &GrayImage) -> MatchResult {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > fw || th > fh {
        return MatchResult::nothing();
    }

    let scale = coarse_scale(frame, template);
    if scale == 1 {
        return best_zncc(frame, template);
    }

    let small_frame = image::imageops::resize(frame, fw / scale, fh / scale, FilterType::Triangle);
    let small_template =
        image::imageops::resize(template, tw / scale, th / scale, FilterType::Triangle);
    let coarse = best_zncc(&small_frame, &small_template);

    // Refine within ±2 coarse pixels of the coarse peak.
    let margin = 2 * scale;
    let (cx, cy) = (coarse.x * scale, coarse.y * scale);
    let left = cx.saturating_sub(margin);
    let top = cy.saturating_sub(margin);
    let right = (cx + margin).min(fw - tw);
    let bottom = (cy + margin).min(fh - th);

    let window =
        image::imageops::crop_imm(frame, left, top, right - left + tw, bottom - top + th)
            .to_image();
    let fine = best_zncc(&window, template);

    log::trace!(
        "coarse x{} peak ({},{}) conf={:.3} -> fine ({},{}) conf={:.3}",
        scale,
        cx,
        cy,
        coarse.confidence,
        left + fine.x,
        top + fine.y,
        fine.confidence
    );

    MatchResult {
        confidence: fine.confidence,
        x: left + fine.x,
        y: top + fine.y,
    }
}

fn coarse_scale(frame: &GrayImage, template: &GrayImage) -> u32 {
    let frame_pixels = frame.width() as u64 * frame.height() as u64;
    if frame_pixels < COARSE_MIN_FRAME_PIXELS {
        return 1;
    }
    let short_side = template.width().min(template.height());
    [4, 2]
        .into_iter()
        .find(|s| short_side / s >= COARSE_MIN_TEMPLATE_SIDE)
        .unwrap_or(1)
}

/// Exhaustive ZNCC search over every valid offset.
fn best_zncc(frame: &GrayImage, template: &GrayImage) -> MatchResult {
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > frame.width() || th > frame.height() {
        return MatchResult::nothing();
    }

    let n = (tw * th) as f64;
    let (t_sum, t_sq) = template.pixels().fold((0.0f64, 0.0f64), |(s, q), p| {
        let v = p[0] as f64;
        (s + v, q + v * v)
    });
    let t_var = n * t_sq - t_sum * t_sum;
    if t_var <= 0.0 {
        // A flat template correlates with nothing.
        return MatchResult::nothing();
    }

    let cross = match_template_parallel(frame, template, MatchTemplateMethod::CrossCorrelation);
    let table = SummedArea::new(frame);
    let (rw, rh) = cross.dimensions();

    (0..rh)
        .into_par_iter()
        .map(|y| {
            let mut best = MatchResult { confidence: -1.0, x: 0, y };
            for x in 0..rw {
                let (f_sum, f_sq) = table.window(x, y, tw, th);
                let f_var = n * f_sq - f_sum * f_sum;
                let confidence = if f_var <= 0.0 {
                    0.0
                } else {
                    let numerator = n * cross.get_pixel(x, y)[0] as f64 - t_sum * f_sum;
                    (numerator / (t_var * f_var).sqrt()).clamp(0.0, 1.0)
                };
                best = best.better(MatchResult { confidence, x, y });
            }
            best
        })
        .reduce_with(MatchResult::better)
        .unwrap_or_else(MatchResult::nothing)
}

/// Summed-area tables of pixel values and squared pixel values.
struct SummedArea {
    stride: usize,
    sums: Vec<f64>,
    squares: Vec<f64>,
}

impl SummedArea {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sums = vec![0.0; stride * (h + 1)];
        let mut squares = vec![0.0; stride * (h + 1)];

        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = image.get_pixel(x as u32, y as u32)[0] as f64;
                row_sum += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sums[at] = sums[at - stride] + row_sum;
                squares[at] = squares[at - stride] + row_sq;
            }
        }

        Self { stride, sums, squares }
    }

    /// Sum and sum of squares over the `w`×`h` window at (`x`, `y`).
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let area = |t: &[f64]| {
            t[y1 * self.stride + x1] - t[y0 * self.stride + x1] - t[y1 * self.stride + x0]
                + t[y0 * self.stride + x0]
        };
        (area(&self.sums), area(&self.squares))
    }
}
