//! # Vision
//!
//! Everything between the screen and a fill percentage:
//! - [`capture`]: grabs RGB frames of a screen rectangle
//! - [`template`]: the two orb templates and where they are loaded from
//! - [`matching`]: zero-mean NCC template localization
//! - [`color`]: HSV-based pixel classification

pub mod capture;
pub mod color;
pub mod matching;
pub mod template;

/// A captured 3-channel pixel buffer. Owned by the cycle that produced it.
pub type Frame = image::RgbImage;

/// Screen rectangle in primary-display pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }
}
