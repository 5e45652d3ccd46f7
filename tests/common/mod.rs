#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::sync::mpsc::UnboundedReceiver;

use pagecap_lib::capture::config::{
    AppConfig, CaptureConstraints, RegionHandle, RenderOptions,
};
use pagecap_lib::capture::format::RecordingFormat;
use pagecap_lib::capture::host::{CaptureHost, EncodeSession, Rasterizer, SessionEvents};
use pagecap_lib::capture::{CaptureController, CaptureDependencies, ControlEvent};
use pagecap_lib::error::CaptureError;

/// How long `next_event` waits (in virtual time) before deciding nothing is coming.
pub const QUIET: Duration = Duration::from_secs(10);

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBehavior {
    Grant,
    Deny,
    Fail,
    /// Grant the session, but refuse to start the encoder.
    BrokenEncoder,
}

pub struct FakeHost {
    behavior: HostBehavior,
    /// Slices the host has produced, delivered or not.
    produced: Arc<AtomicU64>,
    supported: Vec<&'static str>,
    calls: CallLog,
    sessions: Mutex<Vec<SessionEvents>>,
    constraints: Mutex<Option<CaptureConstraints>>,
}

impl FakeHost {
    pub fn new(behavior: HostBehavior) -> Arc<Self> {
        Self::with_formats(behavior, &["video/mp4", "video/webm"])
    }

    pub fn with_formats(behavior: HostBehavior, supported: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            produced: Arc::new(AtomicU64::new(0)),
            supported: supported.to_vec(),
            calls: CallLog::default(),
            sessions: Mutex::new(Vec::new()),
            constraints: Mutex::new(None),
        })
    }

    /// Encoder calls in order, across every session.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Event sink of the most recently requested session.
    pub fn session(&self) -> SessionEvents {
        self.sessions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no session was requested")
    }

    /// Produce a slice and deliver it right away.
    pub fn deliver_slice(&self, data: Vec<u8>) {
        self.produced.fetch_add(1, Ordering::SeqCst);
        self.session().data_available(data);
    }

    /// Produce a slice whose delivery the caller performs later.
    pub fn hold_slice(&self) {
        self.produced.fetch_add(1, Ordering::SeqCst);
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.constraints.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureHost for FakeHost {
    async fn request_session(
        &self,
        constraints: &CaptureConstraints,
        events: SessionEvents,
    ) -> Result<Box<dyn EncodeSession>, CaptureError> {
        self.sessions.lock().unwrap().push(events.clone());
        *self.constraints.lock().unwrap() = Some(constraints.clone());

        match self.behavior {
            HostBehavior::Deny => Err(CaptureError::PermissionDenied("Permission denied".into())),
            HostBehavior::Fail => Err(CaptureError::DeviceError("no capture device".into())),
            HostBehavior::Grant | HostBehavior::BrokenEncoder => Ok(Box::new(FakeEncoder {
                events,
                produced: Arc::clone(&self.produced),
                supported: self.supported.clone(),
                calls: Arc::clone(&self.calls),
                broken: self.behavior == HostBehavior::BrokenEncoder,
            })),
        }
    }
}

struct FakeEncoder {
    events: SessionEvents,
    produced: Arc<AtomicU64>,
    supported: Vec<&'static str>,
    calls: CallLog,
    broken: bool,
}

impl FakeEncoder {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl EncodeSession for FakeEncoder {
    fn is_format_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|f| *f == mime_type)
    }

    fn start(&mut self, _format: &RecordingFormat, _slice: Duration) -> Result<(), CaptureError> {
        self.record("start");
        if self.broken {
            return Err(CaptureError::DeviceError("encoder refused to start".into()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn resume(&mut self) {
        self.record("resume");
    }

    /// Flushes immediately, announcing every slice produced so far.
    fn stop(&mut self) {
        self.record("stop");
        self.events.finalized(self.produced.load(Ordering::SeqCst));
    }

    fn stop_tracks(&mut self) {
        self.record("stop_tracks");
    }
}

pub struct FakeRasterizer {
    fail: bool,
    renders: Mutex<Vec<RenderOptions>>,
}

impl FakeRasterizer {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            renders: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            renders: Mutex::new(Vec::new()),
        })
    }

    pub fn renders(&self) -> Vec<RenderOptions> {
        self.renders.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn render(
        &self,
        _region: &RegionHandle,
        options: &RenderOptions,
    ) -> Result<RgbaImage, CaptureError> {
        self.renders.lock().unwrap().push(options.clone());
        if self.fail {
            return Err(CaptureError::RasterizationFailed("canvas is tainted".into()));
        }
        Ok(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])))
    }
}

pub fn region() -> RegionHandle {
    RegionHandle {
        id: "page-content".into(),
        scroll_width: 1152,
        scroll_height: 3200,
        viewport_height: 800,
    }
}

pub fn deps(host: &Arc<FakeHost>, rasterizer: Option<Arc<FakeRasterizer>>) -> CaptureDependencies {
    CaptureDependencies {
        host: Arc::clone(host) as Arc<dyn CaptureHost>,
        rasterizer: rasterizer.map(|r| r as Arc<dyn Rasterizer>),
        region: region(),
    }
}

pub fn controller(
    host: &Arc<FakeHost>,
    rasterizer: Option<Arc<FakeRasterizer>>,
) -> (CaptureController, UnboundedReceiver<ControlEvent>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let ctl = CaptureController::new(AppConfig::default(), deps(host, rasterizer), tx);
    (ctl, rx)
}

/// Next queued or scheduled event, or `None` if nothing arrives within [`QUIET`].
pub async fn next_event(rx: &mut UnboundedReceiver<ControlEvent>) -> Option<ControlEvent> {
    tokio::time::timeout(QUIET, rx.recv()).await.ok().flatten()
}

/// Receive and dispatch exactly `n` events.
pub async fn pump(ctl: &mut CaptureController, rx: &mut UnboundedReceiver<ControlEvent>, n: usize) {
    for _ in 0..n {
        let event = next_event(rx).await.expect("expected another control event");
        ctl.dispatch(event).await;
    }
}
