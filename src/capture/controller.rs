use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc::UnboundedSender};
use uuid::Uuid;

use crate::capture::config::{
    AppConfig, RegionHandle, RenderOptions, COPY_FEEDBACK, ELAPSED_TICK, FINALIZE_GRACE,
    PROGRESS_TICK, SETTLE_DELAY, SLICE_INTERVAL,
};
use crate::capture::format::{RecordingFormat, IMAGE_EXTENSION, IMAGE_MIME_TYPE};
use crate::capture::host::{CaptureHost, Rasterizer, SessionEvent, SessionEvents};
use crate::capture::recording::RecordingSession;
use crate::capture::result::{CaptureResult, CopyPayload, MediaKind, ObjectUrls};
use crate::capture::screenshot::{ScreenshotSession, StepOutcome};
use crate::capture::timer::{ScheduledTask, Scheduler};
use crate::capture::view::ControlView;
use crate::error::{CaptureError, FailureKind};
use crate::shortcuts::{KeyChord, ShortcutAction};

pub type SessionId = Uuid;

/// Exactly one of these is current at any time.
#[derive(Debug)]
pub enum CaptureState {
    Idle,
    Recording(RecordingSession),
    Screenshotting(ScreenshotSession),
    Finished(CaptureResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Recording,
    Screenshotting,
    Finished,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Recording => "recording",
            CapturePhase::Screenshotting => "screenshotting",
            CapturePhase::Finished => "finished",
        }
    }
}

impl CaptureState {
    pub fn phase(&self) -> CapturePhase {
        match self {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Recording(_) => CapturePhase::Recording,
            CaptureState::Screenshotting(_) => CapturePhase::Screenshotting,
            CaptureState::Finished(_) => CapturePhase::Finished,
        }
    }
}

/// Everything that reaches the controller asynchronously.
#[derive(Debug)]
pub enum ControlEvent {
    ElapsedTick {
        session: SessionId,
    },
    ProgressTick {
        session: SessionId,
    },
    SettleElapsed {
        session: SessionId,
    },
    Rendered {
        session: SessionId,
        outcome: Result<RgbaImage, CaptureError>,
    },
    CopyFeedbackExpired {
        result: Uuid,
    },
    /// Slices announced at finalization did not all arrive in time.
    FinalizeExpired {
        session: SessionId,
    },
    Session {
        session: SessionId,
        event: SessionEvent,
    },
}

/// Outcome reports for the user.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notice {
    Completed { kind: MediaKind, url: String },
    Failed { kind: FailureKind, message: String },
}

/// Collaborators the controller delegates the real work to.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub host: Arc<dyn CaptureHost>,
    /// `None` when no renderer is loaded; screenshots then fail cleanly.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,
    /// The content region screenshots are taken of.
    pub region: RegionHandle,
}

pub struct CaptureController {
    state: CaptureState,
    config: AppConfig,
    deps: CaptureDependencies,
    scheduler: Scheduler,
    objects: ObjectUrls,
    notices: broadcast::Sender<Notice>,
}

impl CaptureController {
    pub fn new(
        config: AppConfig,
        deps: CaptureDependencies,
        events: UnboundedSender<ControlEvent>,
    ) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            state: CaptureState::Idle,
            config,
            deps,
            scheduler: Scheduler::new(events),
            objects: ObjectUrls::new(),
            notices,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn phase(&self) -> CapturePhase {
        self.state.phase()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn view(&self) -> ControlView {
        ControlView::from_state(&self.state, &self.config)
    }

    pub fn objects(&self) -> &ObjectUrls {
        &self.objects
    }

    /// Timers and background jobs currently owned by the state.
    pub fn live_tasks(&self) -> usize {
        self.scheduler.live_tasks()
    }

    /// Replace the screenshot region, e.g. after the page was resized.
    pub fn set_region(&mut self, region: RegionHandle) {
        self.deps.region = region;
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub(crate) fn notice_sender(&self) -> broadcast::Sender<Notice> {
        self.notices.clone()
    }

    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.prepare_start("start recording")?;

        let id = Uuid::new_v4();
        let events = SessionEvents::new(id, self.scheduler.sender());
        let constraints = self.config.capture_constraints();

        let encoder = match self.deps.host.request_session(&constraints, events).await {
            Ok(encoder) => encoder,
            Err(e) => return Err(self.fail(e)),
        };

        let format = RecordingFormat::negotiate(|mime| encoder.is_format_supported(mime));
        let mut session = RecordingSession::new(id, encoder, format.clone());
        if let Err(e) = session.encoder_mut().start(&format, SLICE_INTERVAL) {
            drop(session);
            return Err(self.fail(e));
        }
        session.set_ticker(Some(elapsed_ticker(&self.scheduler, id)));

        log::info!(
            "Recording {} started with mime type {}",
            id,
            session.format().mime_type()
        );
        self.state = CaptureState::Recording(session);
        Ok(())
    }

    pub fn start_screenshot(&mut self) -> Result<(), CaptureError> {
        self.prepare_start("start screenshot")?;

        let id = Uuid::new_v4();
        let mut session = ScreenshotSession::new(id);
        let ticker = self
            .scheduler
            .every(PROGRESS_TICK, move || ControlEvent::ProgressTick { session: id });
        session.set_task(Some(ticker));

        log::info!("Screenshot {} started", id);
        self.state = CaptureState::Screenshotting(session);
        Ok(())
    }

    /// Pause or resume the recording. Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> Result<bool, CaptureError> {
        let phase = self.phase();
        let CaptureState::Recording(session) = &mut self.state else {
            return Err(invalid("pause", phase));
        };
        if session.is_stopping() {
            return Err(invalid("pause", phase));
        }

        if session.is_paused() {
            session.resume(elapsed_ticker(&self.scheduler, session.id()));
            log::info!("Recording {} resumed", session.id());
        } else {
            session.pause();
            log::info!("Recording {} paused at {}s", session.id(), session.elapsed_secs());
        }
        Ok(session.is_paused())
    }

    /// Stop a recording, or cancel a running screenshot.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        match self.phase() {
            CapturePhase::Recording => {
                if let CaptureState::Recording(session) = &mut self.state {
                    if !session.is_stopping() {
                        log::info!("Stopping recording {}", session.id());
                        session.request_stop();
                    }
                }
                Ok(())
            }
            CapturePhase::Screenshotting => self.cancel_screenshot(),
            phase => Err(invalid("stop", phase)),
        }
    }

    pub fn cancel_screenshot(&mut self) -> Result<(), CaptureError> {
        match &self.state {
            CaptureState::Screenshotting(session) => {
                log::info!("Screenshot {} cancelled at step {}", session.id(), session.step());
                self.state = CaptureState::Idle;
                Ok(())
            }
            _ => Err(invalid("cancel a screenshot", self.phase())),
        }
    }

    /// Dismiss the result and return to idle.
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        match self.phase() {
            CapturePhase::Finished => {
                self.discard_result();
                Ok(())
            }
            CapturePhase::Idle => Ok(()),
            phase => Err(invalid("retry", phase)),
        }
    }

    /// Honor a keyboard shortcut; only acted on while idle.
    pub async fn handle_shortcut(
        &mut self,
        chord: &KeyChord,
    ) -> Result<Option<ShortcutAction>, CaptureError> {
        let Some(action) = ShortcutAction::from_chord(chord) else {
            return Ok(None);
        };
        if self.phase() != CapturePhase::Idle {
            log::debug!("Ignoring {} shortcut while {}", chord, self.phase().as_str());
            return Ok(None);
        }

        match action {
            ShortcutAction::StartRecording => self.start_recording().await?,
            ShortcutAction::StartScreenshot => self.start_screenshot()?,
        }
        Ok(Some(action))
    }

    pub fn copy_result(&mut self) -> Result<CopyPayload, CaptureError> {
        let CaptureState::Finished(result) = &self.state else {
            return Err(CaptureError::ResultNotAvailable);
        };
        let payload = result.copy_payload(&self.objects)?;

        let id = result.id();
        let feedback = self
            .scheduler
            .once(COPY_FEEDBACK, move || ControlEvent::CopyFeedbackExpired { result: id });
        if let CaptureState::Finished(result) = &mut self.state {
            result.mark_copied(feedback);
        }
        Ok(payload)
    }

    pub fn save_result(&self, dir: &Path) -> Result<PathBuf, CaptureError> {
        match &self.state {
            CaptureState::Finished(result) => result.save_to(&self.objects, dir),
            _ => Err(CaptureError::ResultNotAvailable),
        }
    }

    pub async fn dispatch(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::ElapsedTick { session } => {
                if let CaptureState::Recording(s) = &mut self.state {
                    if s.id() == session {
                        s.tick();
                        return;
                    }
                }
                log::debug!("Ignoring stale elapsed tick for {}", session);
            }
            ControlEvent::ProgressTick { session } => self.on_progress_tick(session),
            ControlEvent::SettleElapsed { session } => self.on_settled(session),
            ControlEvent::Rendered { session, outcome } => self.on_rendered(session, outcome),
            ControlEvent::CopyFeedbackExpired { result } => {
                if let CaptureState::Finished(r) = &mut self.state {
                    if r.id() == result {
                        r.clear_copied();
                    }
                }
            }
            ControlEvent::FinalizeExpired { session } => {
                if let CaptureState::Recording(s) = &self.state {
                    if s.id() == session {
                        log::warn!(
                            "Recording {} finalized without all of its slices",
                            session
                        );
                        self.complete_recording();
                    }
                }
            }
            ControlEvent::Session { session, event } => self.on_session_event(session, event),
        }
    }

    fn on_progress_tick(&mut self, id: SessionId) {
        let CaptureState::Screenshotting(session) = &mut self.state else {
            log::debug!("Ignoring stale progress tick for {}", id);
            return;
        };
        if session.id() != id {
            log::debug!("Ignoring stale progress tick for {}", id);
            return;
        }

        if session.advance() == StepOutcome::Completed {
            log::debug!("Screenshot {} scan complete, settling", id);
            let settle = self
                .scheduler
                .once(SETTLE_DELAY, move || ControlEvent::SettleElapsed { session: id });
            session.set_task(Some(settle));
        }
    }

    fn on_settled(&mut self, id: SessionId) {
        let rasterizer = self.deps.rasterizer.clone();
        let CaptureState::Screenshotting(session) = &mut self.state else {
            return;
        };
        if session.id() != id || !session.begin_render() {
            return;
        }

        let Some(rasterizer) = rasterizer else {
            log::warn!("No rasterizer available for screenshot {}", id);
            self.fail(CaptureError::RasterizerUnavailable);
            return;
        };

        let region = self.deps.region.clone();
        let options = RenderOptions::for_region(&region, &self.config);
        let render = self.scheduler.spawn(async move {
            let outcome = rasterizer.render(&region, &options).await;
            ControlEvent::Rendered { session: id, outcome }
        });
        session.set_task(Some(render));
    }

    fn on_rendered(&mut self, id: SessionId, outcome: Result<RgbaImage, CaptureError>) {
        match &self.state {
            CaptureState::Screenshotting(session) if session.id() == id => {}
            _ => {
                log::debug!("Discarding render for ended screenshot {}", id);
                return;
            }
        }

        let png = outcome.and_then(|image| encode_png(&image));
        match png {
            Ok(data) => {
                let size = data.len();
                let handle = self.objects.create(data, IMAGE_MIME_TYPE);
                let result = CaptureResult::new(
                    MediaKind::Image,
                    handle,
                    IMAGE_MIME_TYPE,
                    IMAGE_EXTENSION,
                    size,
                    None,
                );
                log::info!("Screenshot {} finished ({} bytes)", id, size);
                self.finish(result);
            }
            Err(e) => {
                let e = match e {
                    e @ CaptureError::RasterizationFailed(_) => e,
                    other => CaptureError::RasterizationFailed(other.to_string()),
                };
                self.fail(e);
            }
        }
    }

    fn on_session_event(&mut self, id: SessionId, event: SessionEvent) {
        let CaptureState::Recording(session) = &mut self.state else {
            log::debug!("Ignoring {:?} for inactive session {}", event, id);
            return;
        };
        if session.id() != id {
            log::debug!("Ignoring {:?} for stale session {}", event, id);
            return;
        }

        match event {
            SessionEvent::DataAvailable(data) => {
                session.push_chunk(data);
                if session.is_flushed() {
                    self.complete_recording();
                }
            }
            SessionEvent::SurfaceEnded => {
                if !session.is_stopping() {
                    log::info!("Shared surface ended, stopping recording {}", id);
                    session.request_stop();
                }
            }
            SessionEvent::Finalized { slices } => {
                session.expect_slices(slices);
                if session.is_flushed() {
                    self.complete_recording();
                } else {
                    log::debug!("Recording {} finalized, waiting for late slices", id);
                    let grace = self
                        .scheduler
                        .once(FINALIZE_GRACE, move || ControlEvent::FinalizeExpired { session: id });
                    session.set_ticker(Some(grace));
                }
            }
            SessionEvent::Failed(message) => {
                self.fail(CaptureError::DeviceError(message));
            }
        }
    }

    /// Assemble the recorded slices into the result.
    fn complete_recording(&mut self) {
        let CaptureState::Recording(session) = std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return;
        };
        let id = session.id();
        let media = session.finish();
        let size = media.data.len();
        let handle = self.objects.create(media.data, media.format.mime_type());
        let result = CaptureResult::new(
            MediaKind::Video,
            handle,
            media.format.mime_type(),
            media.format.extension(),
            size,
            Some(media.elapsed_secs),
        );
        log::info!(
            "Recording {} finished: {}s, {} bytes",
            id,
            media.elapsed_secs,
            size
        );
        self.finish(result);
    }

    /// Gate for both start operations: idle is required, a held result is
    /// released first.
    fn prepare_start(&mut self, action: &'static str) -> Result<(), CaptureError> {
        match self.phase() {
            CapturePhase::Idle => Ok(()),
            CapturePhase::Finished => {
                self.discard_result();
                Ok(())
            }
            phase => Err(invalid(action, phase)),
        }
    }

    fn discard_result(&mut self) {
        if let CaptureState::Finished(result) = std::mem::replace(&mut self.state, CaptureState::Idle)
        {
            result.release(&self.objects);
        }
    }

    fn finish(&mut self, result: CaptureResult) {
        let notice = Notice::Completed {
            kind: result.kind(),
            url: result.url().to_string(),
        };
        self.state = CaptureState::Finished(result);
        let _ = self.notices.send(notice);
    }

    /// Abort the current attempt: drop whatever session is active (stopping
    /// its tracks and timers), return to idle and report.
    fn fail(&mut self, error: CaptureError) -> CaptureError {
        log::warn!("Capture failed: {}", error);
        if let CaptureState::Finished(result) = std::mem::replace(&mut self.state, CaptureState::Idle)
        {
            result.release(&self.objects);
        }
        let _ = self.notices.send(Notice::Failed {
            kind: error.kind(),
            message: error.to_string(),
        });
        error
    }
}

fn invalid(action: &'static str, phase: CapturePhase) -> CaptureError {
    CaptureError::InvalidTransition {
        action,
        state: phase.as_str(),
    }
}

fn elapsed_ticker(scheduler: &Scheduler, id: SessionId) -> ScheduledTask {
    scheduler.every(ELAPSED_TICK, move || ControlEvent::ElapsedTick { session: id })
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
