//! One sampling pass: full-display capture, template localization, orb
//! capture and colour classification.

use super::session::Reading;
use crate::error::GuardResult;
use crate::vision::Region;
use crate::vision::capture::Capturer;
use crate::vision::color;
use crate::vision::matching;
use crate::vision::template::{GaugeKind, TemplateSet};
use std::sync::Arc;

/// Produces a [`Reading`] for the selected gauge.
pub trait GaugeProbe: Send {
    fn probe(&mut self, gauge: GaugeKind) -> GuardResult<Reading>;
}

/// [`GaugeProbe`] over a real [`Capturer`] and the loaded templates.
pub struct VisionProbe<C> {
    capturer: C,
    templates: Arc<TemplateSet>,
}

impl<C: Capturer> VisionProbe<C> {
    pub fn new(capturer: C, templates: Arc<TemplateSet>) -> Self {
        Self { capturer, templates }
    }
}

impl<C: Capturer> GaugeProbe for VisionProbe<C> {
    fn probe(&mut self, gauge: GaugeKind) -> GuardResult<Reading> {
        let template = self.templates.get(gauge);

        let bounds = self.capturer.display_bounds()?;
        let screen = self.capturer.capture(bounds)?;
        let found = matching::locate(&screen, template);
        drop(screen);

        if !found.is_found() {
            log::debug!("[{} NO MATCH] conf={:.2}", gauge.label(), found.confidence);
            return Ok(Reading::Miss);
        }

        let orb_region = Region::new(
            bounds.left + found.x,
            bounds.top + found.y,
            template.width(),
            template.height(),
        );
        let orb = self.capturer.capture(orb_region)?;
        let percent = color::classify(&orb, gauge.rules());

        log::debug!(
            "[{} MATCH] {:.2}% | conf={:.2}",
            gauge.label(),
            percent,
            found.confidence
        );
        Ok(Reading::Filled(percent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;
    use crate::vision::Frame;
    use crate::vision::capture::crop_region;
    use crate::vision::template::Template;
    use image::Rgb;

    /// Serves crops of a fixed screen image.
    struct StillScreen {
        screen: Frame,
        captures: usize,
    }

    impl Capturer for StillScreen {
        fn display_bounds(&mut self) -> GuardResult<Region> {
            Ok(Region::new(0, 0, self.screen.width(), self.screen.height()))
        }

        fn capture(&mut self, region: Region) -> GuardResult<Frame> {
            self.captures += 1;
            crop_region(self.screen.clone(), region)
        }
    }

    struct NoDisplay;

    impl Capturer for NoDisplay {
        fn display_bounds(&mut self) -> GuardResult<Region> {
            Err(GuardError::CaptureUnavailable("no active display".into()))
        }

        fn capture(&mut self, _region: Region) -> GuardResult<Frame> {
            Err(GuardError::CaptureUnavailable("no active display".into()))
        }
    }

    /// A 20x20 orb: grey textured ring, bottom `filled_rows` of the 14x14
    /// inside painted with `fluid`.
    fn orb(filled_rows: u32, fluid: Rgb<u8>) -> Frame {
        Frame::from_fn(20, 20, |x, y| {
            if x < 3 || y < 3 || x >= 17 || y >= 17 {
                let v = ((x * 41 + y * 67) % 200) as u8 + 30;
                Rgb([v, v, v])
            } else if y >= 17 - filled_rows {
                fluid
            } else {
                Rgb([8, 8, 8])
            }
        })
    }

    fn templates(mana: Frame, life: Frame) -> Arc<TemplateSet> {
        Arc::new(TemplateSet::new(Template::new(mana), Template::new(life)))
    }

    fn screen_with(orb_image: &Frame, at: (i64, i64)) -> Frame {
        let mut screen = Frame::from_pixel(120, 90, Rgb([25, 25, 25]));
        image::imageops::replace(&mut screen, orb_image, at.0, at.1);
        screen
    }

    #[test]
    fn reads_fill_of_located_orb() {
        let blue = Rgb([20, 40, 220]);
        let template = orb(14, blue);
        // Same orb on screen but only 7 of 14 inner rows filled.
        let on_screen = orb(7, blue);
        let mut probe = VisionProbe::new(
            StillScreen { screen: screen_with(&on_screen, (60, 50)), captures: 0 },
            templates(template.clone(), template),
        );

        match probe.probe(GaugeKind::Mana).unwrap() {
            // 7 rows x 14 columns out of 400 pixels.
            Reading::Filled(p) => assert!((p - 24.5).abs() < 1e-9, "percent {}", p),
            other => panic!("expected a fill reading, got {:?}", other),
        }
        assert_eq!(probe.capturer.captures, 2);
    }

    #[test]
    fn missing_orb_is_a_miss_without_second_capture() {
        let template = orb(10, Rgb([200, 10, 10]));
        let blank = Frame::from_fn(120, 90, |x, _| Rgb([(x * 2) as u8, 0, 0]));
        let mut probe = VisionProbe::new(
            StillScreen { screen: blank, captures: 0 },
            templates(template.clone(), template),
        );

        assert_eq!(probe.probe(GaugeKind::Life).unwrap(), Reading::Miss);
        assert_eq!(probe.capturer.captures, 1);
    }

    #[test]
    fn capture_failure_propagates() {
        let template = orb(10, Rgb([200, 10, 10]));
        let mut probe = VisionProbe::new(NoDisplay, templates(template.clone(), template));
        let err = probe.probe(GaugeKind::Life).unwrap_err();
        assert!(matches!(err, GuardError::CaptureUnavailable(_)));
    }
}
