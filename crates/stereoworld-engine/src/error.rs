use std::panic::Location;
use std::path::PathBuf;

use stereoworld_scene::SceneError;
use thiserror::Error;

/// Errors raised while creating GPU resources or rendering a frame.
///
/// Every variant is fatal for the session; the only recoverable per-frame
/// condition is [`PoseUnavailable`], which never leaves a display target.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A GPU resource could not be created, bound or drawn.
    #[error("{message} (at {call_site})")]
    Resource {
        call_site: &'static Location<'static>,
        message: String,
    },

    /// Uploaded per-material resources do not line up one to one.
    #[error(
        "material/buffer mismatch: {materials} materials, {vertex_arrays} vertex arrays, {index_buffers} index buffers"
    )]
    MaterialMismatch {
        materials: usize,
        vertex_arrays: usize,
        index_buffers: usize,
    },

    /// A stereo frame was about to be submitted with the eyes out of step.
    #[error(
        "incomplete stereo frame: right eye {right_draws} draws (resolved: {right_resolved}), left eye {left_draws} draws (resolved: {left_resolved})"
    )]
    IncompleteStereoFrame {
        right_draws: u32,
        left_draws: u32,
        right_resolved: bool,
        left_resolved: bool,
    },

    #[error("failed to decode texture {}", path.display())]
    TextureDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl RenderError {
    /// Builds a [`RenderError::Resource`] tagged with the caller's location.
    #[track_caller]
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            call_site: Location::caller(),
            message: message.into(),
        }
    }
}

/// The pose source had no valid head transform this frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pose unavailable: {reason}")]
pub struct PoseUnavailable {
    pub reason: String,
}

impl PoseUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
