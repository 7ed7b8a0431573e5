//! Screen capture backed by xcap.

use super::{Frame, Region};
use crate::error::{GuardError, GuardResult};
use image::DynamicImage;
use xcap::Monitor;

/// Source of screen frames.
///
/// Implementations never retry: a failure is returned to the caller, which
/// ends the run.
pub trait Capturer: Send {
    /// Bounding rectangle of the primary display.
    fn display_bounds(&mut self) -> GuardResult<Region>;

    /// Capture `region` as an RGB frame of exactly the requested size.
    fn capture(&mut self, region: Region) -> GuardResult<Frame>;
}

/// Captures from the primary monitor.
#[derive(Default)]
pub struct ScreenCapturer;

impl ScreenCapturer {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor() -> GuardResult<Monitor> {
        let monitors = Monitor::all()
            .map_err(|e| GuardError::CaptureUnavailable(format!("cannot list monitors: {e}")))?;

        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
        fallback.ok_or_else(|| GuardError::CaptureUnavailable("no active display".into()))
    }
}

impl Capturer for ScreenCapturer {
    fn display_bounds(&mut self) -> GuardResult<Region> {
        let monitor = Self::primary_monitor()?;
        let unavailable = |e: xcap::XCapError| GuardError::CaptureUnavailable(e.to_string());

        // Monitor size is logical, the captured image is physical.
        let scale = monitor.scale_factor().map_err(unavailable)?;
        let width = (monitor.width().map_err(unavailable)? as f32 * scale).round() as u32;
        let height = (monitor.height().map_err(unavailable)? as f32 * scale).round() as u32;

        Ok(Region::new(0, 0, width, height))
    }

    fn capture(&mut self, region: Region) -> GuardResult<Frame> {
        let monitor = Self::primary_monitor()?;
        let screen = monitor
            .capture_image()
            .map_err(|e| GuardError::CaptureUnavailable(format!("capture failed: {e}")))?;

        crop_region(DynamicImage::ImageRgba8(screen).to_rgb8(), region)
    }
}

/// Cut `region` out of a full-display frame.
///
/// The region is clamped to the frame to absorb logical/physical rounding
/// at the display edge; an empty result is a capture failure.
pub fn crop_region(screen: Frame, region: Region) -> GuardResult<Frame> {
    if region.left == 0
        && region.top == 0
        && region.width == screen.width()
        && region.height == screen.height()
    {
        return Ok(screen);
    }

    let left = region.left.min(screen.width());
    let top = region.top.min(screen.height());
    let width = region.width.min(screen.width() - left);
    let height = region.height.min(screen.height() - top);

    if width == 0 || height == 0 {
        return Err(GuardError::CaptureUnavailable(format!(
            "region {}x{} at ({},{}) lies outside the {}x{} display",
            region.width,
            region.height,
            region.left,
            region.top,
            screen.width(),
            screen.height()
        )));
    }
    if width != region.width || height != region.height {
        log::debug!(
            "capture region clamped from {}x{} to {}x{}",
            region.width,
            region.height,
            width,
            height
        );
    }

    Ok(image::imageops::crop_imm(&screen, left, top, width, height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn numbered_frame(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn crop_returns_requested_rectangle() {
        let cropped = crop_region(numbered_frame(40, 30), Region::new(5, 7, 10, 4)).unwrap();
        assert_eq!(cropped.dimensions(), (10, 4));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([5, 7, 0]));
        assert_eq!(cropped.get_pixel(9, 3), &Rgb([14, 10, 0]));
    }

    #[test]
    fn full_region_is_passed_through() {
        let frame = numbered_frame(16, 9);
        let cropped = crop_region(frame.clone(), Region::new(0, 0, 16, 9)).unwrap();
        assert_eq!(cropped, frame);
    }

    #[test]
    fn region_past_the_edge_is_clamped() {
        let cropped = crop_region(numbered_frame(20, 20), Region::new(15, 15, 10, 10)).unwrap();
        assert_eq!(cropped.dimensions(), (5, 5));
    }

    #[test]
    fn region_outside_display_is_unavailable() {
        let err = crop_region(numbered_frame(20, 20), Region::new(30, 0, 5, 5)).unwrap_err();
        assert!(matches!(err, GuardError::CaptureUnavailable(_)));
    }
}
