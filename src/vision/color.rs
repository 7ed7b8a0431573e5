//! # Colour Classification
//!
//! Estimates how much of an orb is filled by counting pixels whose colour
//! falls in a hue class. Pixels are converted to HSV first: a raw RGB
//! threshold cannot tell dark red fluid from a dark background once the
//! brightness changes.
//!
//! ## HSV convention
//! 8-bit OpenCV layout: hue 0..=180 (degrees / 2), saturation and value
//! 0..=255. All rule bounds are inclusive.

use image::Rgb;
use rayon::prelude::*;

/// Pixel colour in 8-bit HSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let v = max;
        if max == 0 {
            return Hsv { h: 0, s: 0, v: 0 };
        }

        let diff = (max - min) as f32;
        let s = (255.0 * diff / max as f32).round() as u8;
        if diff == 0.0 {
            return Hsv { h: 0, s, v };
        }

        let (r, g, b) = (r as f32, g as f32, b as f32);
        let mut degrees = if max as f32 == r {
            60.0 * (g - b) / diff
        } else if max as f32 == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if degrees < 0.0 {
            degrees += 360.0;
        }

        // 359.x degrees rounds to 180, which wraps back to red at 0.
        Hsv {
            h: ((degrees / 2.0).round() as u32 % 180) as u8,
            s,
            v,
        }
    }
}

/// Membership test for one hue class.
///
/// Saturation and value floors keep near-black and near-grey noise out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    pub hue_min: u8,
    pub hue_max: u8,
    pub sat_min: u8,
    pub val_min: u8,
}

impl ClassificationRule {
    pub fn matches(&self, hsv: Hsv) -> bool {
        (self.hue_min..=self.hue_max).contains(&hsv.h)
            && hsv.s >= self.sat_min
            && hsv.v >= self.val_min
    }
}

/// Mana fluid. Wide hue range tolerates the desaturated rim of the orb.
pub const BLUE: ClassificationRule = ClassificationRule {
    hue_min: 70,
    hue_max: 180,
    sat_min: 40,
    val_min: 40,
};

/// Red below the hue wrap point.
pub const RED_LOW: ClassificationRule = ClassificationRule {
    hue_min: 0,
    hue_max: 10,
    sat_min: 50,
    val_min: 50,
};

/// Red above the hue wrap point.
pub const RED_HIGH: ClassificationRule = ClassificationRule {
    hue_min: 170,
    hue_max: 180,
    sat_min: 50,
    val_min: 50,
};

pub const GREEN: ClassificationRule = ClassificationRule {
    hue_min: 40,
    hue_max: 90,
    sat_min: 50,
    val_min: 50,
};

/// True if the pixel satisfies any rule in `rules`.
pub fn matches_any(pixel: Rgb<u8>, rules: &[ClassificationRule]) -> bool {
    let hsv = Hsv::from_rgb(pixel[0], pixel[1], pixel[2]);
    rules.iter().any(|rule| rule.matches(hsv))
}

/// Percentage (0..=100) of pixels in `subimage` matching any rule.
///
/// An empty image counts as 0% filled.
pub fn classify(subimage: &image::RgbImage, rules: &[ClassificationRule]) -> f64 {
    let total = subimage.width() as u64 * subimage.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let matching = subimage
        .as_raw()
        .par_chunks_exact(3)
        .filter(|px| matches_any(Rgb([px[0], px[1], px[2]]), rules))
        .count() as u64;

    matching as f64 / total as f64 * 100.0
}
