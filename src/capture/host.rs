use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use tokio::sync::mpsc::UnboundedSender;

use crate::capture::config::{CaptureConstraints, RegionHandle, RenderOptions};
use crate::capture::controller::{ControlEvent, SessionId};
use crate::capture::format::RecordingFormat;
use crate::error::CaptureError;

/// Grants live capture-and-encode sessions.
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Ask the host (and through it, the user) for a session.
    ///
    /// Fails with [`CaptureError::PermissionDenied`] when the user refuses and
    /// [`CaptureError::DeviceError`] for anything else. `events` is the sink
    /// the session reports slices, finalization and interruption through.
    async fn request_session(
        &self,
        constraints: &CaptureConstraints,
        events: SessionEvents,
    ) -> Result<Box<dyn EncodeSession>, CaptureError>;
}

/// A granted session: the live tracks plus their encoder.
pub trait EncodeSession: Send {
    fn is_format_supported(&self, mime_type: &str) -> bool;

    /// Begin encoding, delivering a slice every `slice_interval`.
    fn start(
        &mut self,
        format: &RecordingFormat,
        slice_interval: Duration,
    ) -> Result<(), CaptureError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Flush and stop the encoder. Completion is reported asynchronously with
    /// [`SessionEvents::finalized`].
    fn stop(&mut self);

    /// Release every live media track.
    fn stop_tracks(&mut self);
}

/// Converts a rendered content region into an image.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn render(
        &self,
        region: &RegionHandle,
        options: &RenderOptions,
    ) -> Result<RgbaImage, CaptureError>;
}

#[derive(Debug)]
pub enum SessionEvent {
    /// An encoded slice. Empty slices are dropped by the controller.
    DataAvailable(Vec<u8>),
    /// The encoder finished flushing after `stop`, having produced `slices`
    /// slices in total. Slices still in transit are waited for.
    Finalized { slices: u64 },
    /// The user stopped sharing from outside the app.
    SurfaceEnded,
    /// The session broke mid-recording.
    Failed(String),
}

/// Handle a host uses to report back on one session.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    session: SessionId,
    tx: UnboundedSender<ControlEvent>,
}

impl SessionEvents {
    pub(crate) fn new(session: SessionId, tx: UnboundedSender<ControlEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn data_available(&self, data: Vec<u8>) {
        self.send(SessionEvent::DataAvailable(data));
    }

    /// `slices` is how many slices the host delivered over the whole session.
    pub fn finalized(&self, slices: u64) {
        self.send(SessionEvent::Finalized { slices });
    }

    pub fn surface_ended(&self) {
        self.send(SessionEvent::SurfaceEnded);
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.send(SessionEvent::Failed(message.into()));
    }

    fn send(&self, event: SessionEvent) {
        let event = ControlEvent::Session {
            session: self.session,
            event,
        };
        if self.tx.send(event).is_err() {
            log::debug!("Session {} event dropped, controller is gone", self.session);
        }
    }
}
