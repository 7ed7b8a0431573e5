//! Error taxonomy for the guard core.
//!
//! Only fatal conditions are errors. A template that is not found on screen
//! is a normal [`Reading::Miss`](crate::guard::session::Reading) and a bad
//! threshold entry is coerced by [`crate::settings::parse_threshold`].

use crate::vision::template::GaugeKind;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A required template asset is missing. Sampling must not start.
    #[error("{kind} template '{file}' not found in any of: {searched:?}")]
    TemplateMissing {
        kind: GaugeKind,
        file: &'static str,
        searched: Vec<PathBuf>,
    },

    /// A template asset exists but cannot be decoded.
    #[error("{kind} template at {path:?} is unreadable: {source}")]
    TemplateUnreadable {
        kind: GaugeKind,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The display or session cannot be captured. Ends the current run.
    #[error("screen capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The sampling worker panicked and could not be reclaimed.
    #[error("sampling worker panicked")]
    WorkerPanicked,
}

pub type GuardResult<T> = Result<T, GuardError>;
