use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tauri::http::{header, HeaderValue, Response, StatusCode};
use tauri::{AppHandle, Emitter};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::capture::config::{CaptureConstraints, RegionHandle, RenderOptions};
use crate::capture::controller::SessionId;
use crate::capture::format::{RecordingFormat, PREFERRED_FORMATS};
use crate::capture::host::{CaptureHost, EncodeSession, Rasterizer, SessionEvents};
use crate::capture::result::ObjectUrls;
use crate::error::CaptureError;
use crate::events;

/// The webview's answer to a session request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SessionReply {
    Granted { supported_formats: Vec<String> },
    Denied { name: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    request_id: Uuid,
    session_id: SessionId,
    constraints: CaptureConstraints,
    candidate_formats: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
enum EncoderCommand {
    Start {
        session_id: SessionId,
        mime_type: String,
        slice_ms: u64,
    },
    Pause {
        session_id: SessionId,
    },
    Resume {
        session_id: SessionId,
    },
    Stop {
        session_id: SessionId,
    },
    StopTracks {
        session_id: SessionId,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    request_id: Uuid,
    region: RegionHandle,
    options: RenderOptions,
}

type RenderReply = Result<String, String>;

/// Pending requests to the webview, answered through the `host_*` commands.
pub struct WebviewBridge {
    app: AppHandle,
    pending_sessions: Mutex<HashMap<Uuid, oneshot::Sender<SessionReply>>>,
    pending_renders: Mutex<HashMap<Uuid, oneshot::Sender<RenderReply>>>,
    active: Mutex<Option<SessionEvents>>,
}

impl WebviewBridge {
    pub fn new(app: AppHandle) -> Arc<Self> {
        Arc::new(Self {
            app,
            pending_sessions: Mutex::new(HashMap::new()),
            pending_renders: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
        })
    }

    pub fn resolve_session(&self, request_id: Uuid, reply: SessionReply) -> bool {
        match lock(&self.pending_sessions).remove(&request_id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                log::warn!("No pending session request {}", request_id);
                false
            }
        }
    }

    /// `reply` carries the base64 PNG on success, the error message on failure.
    pub fn resolve_render(&self, request_id: Uuid, reply: RenderReply) -> bool {
        match lock(&self.pending_renders).remove(&request_id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                log::warn!("No pending render request {}", request_id);
                false
            }
        }
    }

    /// Events sink of the session the webview is currently recording.
    pub fn active_session(&self) -> Option<SessionEvents> {
        lock(&self.active).clone()
    }

    fn emit_encoder(&self, command: EncoderCommand) {
        if let Err(e) = self.app.emit(events::HOST_ENCODER, &command) {
            log::error!("Failed to send {:?} to webview: {}", command, e);
        }
    }
}

pub struct WebviewHost {
    bridge: Arc<WebviewBridge>,
}

impl WebviewHost {
    pub fn new(bridge: Arc<WebviewBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl CaptureHost for WebviewHost {
    async fn request_session(
        &self,
        constraints: &CaptureConstraints,
        session_events: SessionEvents,
    ) -> Result<Box<dyn EncodeSession>, CaptureError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        lock(&self.bridge.pending_sessions).insert(request_id, tx);

        let request = SessionRequest {
            request_id,
            session_id: session_events.session_id(),
            constraints: constraints.clone(),
            candidate_formats: PREFERRED_FORMATS.to_vec(),
        };
        if let Err(e) = self.bridge.app.emit(events::HOST_REQUEST_SESSION, &request) {
            lock(&self.bridge.pending_sessions).remove(&request_id);
            return Err(CaptureError::DeviceError(e.to_string()));
        }

        match rx.await {
            Ok(SessionReply::Granted { supported_formats }) => {
                let session_id = session_events.session_id();
                *lock(&self.bridge.active) = Some(session_events);
                Ok(Box::new(WebviewSession {
                    bridge: Arc::clone(&self.bridge),
                    session_id,
                    supported_formats,
                }))
            }
            Ok(SessionReply::Denied { name, message }) if name == "NotAllowedError" => {
                Err(CaptureError::PermissionDenied(message))
            }
            Ok(SessionReply::Denied { message, .. }) => Err(CaptureError::DeviceError(message)),
            Err(_) => Err(CaptureError::DeviceError(
                "capture request was abandoned".into(),
            )),
        }
    }
}

struct WebviewSession {
    bridge: Arc<WebviewBridge>,
    session_id: SessionId,
    supported_formats: Vec<String>,
}

impl EncodeSession for WebviewSession {
    fn is_format_supported(&self, mime_type: &str) -> bool {
        self.supported_formats.iter().any(|f| f == mime_type)
    }

    fn start(
        &mut self,
        format: &RecordingFormat,
        slice_interval: Duration,
    ) -> Result<(), CaptureError> {
        self.bridge
            .app
            .emit(
                events::HOST_ENCODER,
                &EncoderCommand::Start {
                    session_id: self.session_id,
                    mime_type: format.mime_type().to_string(),
                    slice_ms: slice_interval.as_millis() as u64,
                },
            )
            .map_err(|e| CaptureError::DeviceError(e.to_string()))
    }

    fn pause(&mut self) {
        self.bridge.emit_encoder(EncoderCommand::Pause {
            session_id: self.session_id,
        });
    }

    fn resume(&mut self) {
        self.bridge.emit_encoder(EncoderCommand::Resume {
            session_id: self.session_id,
        });
    }

    fn stop(&mut self) {
        self.bridge.emit_encoder(EncoderCommand::Stop {
            session_id: self.session_id,
        });
    }

    fn stop_tracks(&mut self) {
        self.bridge.emit_encoder(EncoderCommand::StopTracks {
            session_id: self.session_id,
        });
        let mut active = lock(&self.bridge.active);
        if active.as_ref().map(SessionEvents::session_id) == Some(self.session_id) {
            *active = None;
        }
    }
}

pub struct WebviewRasterizer {
    bridge: Arc<WebviewBridge>,
}

impl WebviewRasterizer {
    pub fn new(bridge: Arc<WebviewBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Rasterizer for WebviewRasterizer {
    async fn render(
        &self,
        region: &RegionHandle,
        options: &RenderOptions,
    ) -> Result<RgbaImage, CaptureError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        lock(&self.bridge.pending_renders).insert(request_id, tx);

        let request = RenderRequest {
            request_id,
            region: region.clone(),
            options: options.clone(),
        };
        if let Err(e) = self.bridge.app.emit(events::HOST_RENDER, &request) {
            lock(&self.bridge.pending_renders).remove(&request_id);
            return Err(CaptureError::RasterizationFailed(e.to_string()));
        }

        let png_base64 = rx
            .await
            .map_err(|_| CaptureError::RasterizationFailed("render was abandoned".into()))?
            .map_err(CaptureError::RasterizationFailed)?;
        let png = STANDARD
            .decode(png_base64.as_bytes())
            .map_err(|e| CaptureError::RasterizationFailed(e.to_string()))?;
        let image = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?;
        Ok(image.to_rgba8())
    }
}

/// Decode a base64 slice sent by the webview.
pub fn decode_slice(data: &str) -> Result<Vec<u8>, CaptureError> {
    STANDARD
        .decode(data.as_bytes())
        .map_err(|e| CaptureError::DeviceError(format!("invalid slice: {e}")))
}

/// Serve `pagecap://localhost/<id>` from the result registry, so the result
/// dialog can preview `blob:pagecap/<id>` handles.
pub fn serve_blob(objects: &ObjectUrls, path: &str) -> Response<Vec<u8>> {
    let id = path.trim_start_matches('/');
    match objects.resolve_url(&format!("blob:pagecap/{id}")) {
        Some(blob) => {
            let mut response = Response::new(blob.data.to_vec());
            let content_type = HeaderValue::from_str(&blob.mime_type)
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
            response
        }
        None => not_found(),
    }
}

pub fn not_found() -> Response<Vec<u8>> {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
