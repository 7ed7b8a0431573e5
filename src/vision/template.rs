//! Orb templates and asset resolution.
//!
//! Both templates are loaded once at startup and shared read-only for the
//! lifetime of the process. Missing or corrupt assets are fatal.

use super::Frame;
use super::color::{BLUE, ClassificationRule, GREEN, RED_HIGH, RED_LOW};
use crate::error::{GuardError, GuardResult};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which orb is being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeKind {
    #[default]
    Mana,
    Life,
}

const MANA_RULES: &[ClassificationRule] = &[BLUE];
// Green covers the poisoned life orb.
const LIFE_RULES: &[ClassificationRule] = &[RED_LOW, RED_HIGH, GREEN];

impl GaugeKind {
    pub const ALL: [GaugeKind; 2] = [GaugeKind::Mana, GaugeKind::Life];

    /// Asset file name of this gauge's template.
    pub fn template_file(self) -> &'static str {
        match self {
            GaugeKind::Mana => "mana_template.png",
            GaugeKind::Life => "life_template.png",
        }
    }

    /// Hue classes that count as "filled" for this gauge, OR-combined.
    pub fn rules(self) -> &'static [ClassificationRule] {
        match self {
            GaugeKind::Mana => MANA_RULES,
            GaugeKind::Life => LIFE_RULES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GaugeKind::Mana => "MANA",
            GaugeKind::Life => "LIFE",
        }
    }
}

impl fmt::Display for GaugeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GaugeKind::Mana => "mana",
            GaugeKind::Life => "life",
        })
    }
}

/// Immutable reference image for one gauge kind.
pub struct Template {
    rgb: Frame,
    gray: GrayImage,
}

impl Template {
    pub fn new(rgb: Frame) -> Self {
        let gray = image::imageops::grayscale(&rgb);
        Self { rgb, gray }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Luma copy used for matching, computed once at load.
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }
}

/// The two templates, one per [`GaugeKind`].
pub struct TemplateSet {
    mana: Template,
    life: Template,
}

impl TemplateSet {
    #[cfg(test)]
    pub fn new(mana: Template, life: Template) -> Self {
        Self { mana, life }
    }

    /// Load both templates, searching `dirs` in order for each file.
    pub fn load(dirs: &[PathBuf]) -> GuardResult<Self> {
        let mana = load_template(GaugeKind::Mana, dirs)?;
        let life = load_template(GaugeKind::Life, dirs)?;
        Ok(Self { mana, life })
    }

    pub fn get(&self, kind: GaugeKind) -> &Template {
        match kind {
            GaugeKind::Mana => &self.mana,
            GaugeKind::Life => &self.life,
        }
    }
}

fn load_template(kind: GaugeKind, dirs: &[PathBuf]) -> GuardResult<Template> {
    let file = kind.template_file();
    let path = find_asset(file, dirs).ok_or_else(|| GuardError::TemplateMissing {
        kind,
        file,
        searched: dirs.to_vec(),
    })?;

    let image = image::open(&path).map_err(|source| GuardError::TemplateUnreadable {
        kind,
        path: path.clone(),
        source,
    })?;
    let template = Template::new(image.to_rgb8());

    log::info!(
        "Loaded {} template {}x{} from {:?}",
        kind,
        template.width(),
        template.height(),
        path
    );
    Ok(template)
}

fn find_asset(file: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(file)).find(|p| p.is_file())
}

/// Directories searched for template assets, most specific first.
///
/// Covers an explicit override, a packaged layout next to the executable,
/// and the development layout inside the crate.
pub fn asset_search_dirs(override_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = override_dir {
        dirs.push(dir.to_path_buf());
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir.join("assets"));
        dirs.push(exe_dir);
    }
    dirs.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"));
    dirs.push(PathBuf::from("assets"));
    dirs.push(PathBuf::from("."));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("orb_guard_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &Path, file: &str, w: u32, h: u32) {
        Frame::from_pixel(w, h, Rgb([10, 20, 200]))
            .save(dir.join(file))
            .unwrap();
    }

    #[test]
    fn loads_both_templates() {
        let dir = scratch_dir("both");
        write_png(&dir, "mana_template.png", 6, 4);
        write_png(&dir, "life_template.png", 5, 5);

        let set = TemplateSet::load(&[dir.clone()]).unwrap();
        assert_eq!((set.get(GaugeKind::Mana).width(), set.get(GaugeKind::Mana).height()), (6, 4));
        assert_eq!(set.get(GaugeKind::Life).gray().dimensions(), (5, 5));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_life_template_is_fatal() {
        let dir = scratch_dir("missing");
        write_png(&dir, "mana_template.png", 6, 4);

        let err = TemplateSet::load(&[dir.clone()]).err().unwrap();
        assert!(matches!(err, GuardError::TemplateMissing { kind: GaugeKind::Life, .. }));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_template_is_fatal() {
        let dir = scratch_dir("corrupt");
        std::fs::write(dir.join("mana_template.png"), b"not a png").unwrap();
        write_png(&dir, "life_template.png", 5, 5);

        let err = TemplateSet::load(&[dir.clone()]).err().unwrap();
        assert!(matches!(err, GuardError::TemplateUnreadable { kind: GaugeKind::Mana, .. }));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn later_directories_are_searched() {
        let empty = scratch_dir("empty");
        let full = scratch_dir("full");
        write_png(&full, "mana_template.png", 3, 3);
        write_png(&full, "life_template.png", 3, 3);

        assert!(TemplateSet::load(&[empty.clone(), full.clone()]).is_ok());
        let _ = std::fs::remove_dir_all(empty);
        let _ = std::fs::remove_dir_all(full);
    }

    #[test]
    fn override_dir_comes_first() {
        let dirs = asset_search_dirs(Some(Path::new("/opt/orbs")));
        assert_eq!(dirs[0], PathBuf::from("/opt/orbs"));
        assert!(dirs.contains(&PathBuf::from("assets")));
    }
}
