use std::sync::Arc;

use tauri::image::Image;
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_notification::NotificationExt;
use uuid::Uuid;

use crate::capture::bridge::{decode_slice, SessionReply, WebviewBridge};
use crate::capture::config::{AppConfig, RegionHandle};
use crate::capture::result::CopyPayload;
use crate::capture::view::ControlView;
use crate::error::CaptureError;
use crate::shortcuts::{KeyChord, ShortcutAction};
use crate::state::app_state::AppState;

#[tauri::command]
pub async fn start_recording(state: tauri::State<'_, AppState>) -> Result<(), CaptureError> {
    state.controller.start_recording().await
}

#[tauri::command]
pub async fn start_screenshot(state: tauri::State<'_, AppState>) -> Result<(), CaptureError> {
    state.controller.start_screenshot().await
}

#[tauri::command]
pub async fn toggle_pause(state: tauri::State<'_, AppState>) -> Result<bool, CaptureError> {
    state.controller.toggle_pause().await
}

#[tauri::command]
pub async fn stop_capture(state: tauri::State<'_, AppState>) -> Result<(), CaptureError> {
    state.controller.stop().await
}

#[tauri::command]
pub async fn cancel_screenshot(state: tauri::State<'_, AppState>) -> Result<(), CaptureError> {
    state.controller.cancel_screenshot().await
}

#[tauri::command]
pub async fn retry_capture(state: tauri::State<'_, AppState>) -> Result<(), CaptureError> {
    state.controller.retry().await
}

/// In-window keydown, for when the global shortcut did not fire.
#[tauri::command]
pub async fn press_keys(
    chord: KeyChord,
    state: tauri::State<'_, AppState>,
) -> Result<Option<ShortcutAction>, CaptureError> {
    state.controller.shortcut(chord).await
}

#[tauri::command]
pub fn get_control_view(state: tauri::State<'_, AppState>) -> ControlView {
    state.controller.view()
}

#[tauri::command]
pub fn get_config(state: tauri::State<'_, AppState>) -> AppConfig {
    state.config.as_ref().clone()
}

#[tauri::command]
pub async fn report_content_region(
    region: RegionHandle,
    state: tauri::State<'_, AppState>,
) -> Result<(), CaptureError> {
    state.controller.set_region(region).await
}

/// Save the result into the user's Downloads folder.
#[tauri::command]
pub async fn download_result(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
) -> Result<String, CaptureError> {
    let dir = dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .ok_or_else(|| CaptureError::InvalidConfig("No downloads folder".into()))?;
    let path = state.controller.save_result(dir).await?;

    let body = format!("Saved to {}", path.display());
    if let Err(e) = app.notification().builder().title("PageCap").body(&body).show() {
        log::warn!("Failed to show notification: {}", e);
    }
    Ok(path.to_string_lossy().into_owned())
}

#[tauri::command]
pub async fn copy_result(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
) -> Result<(), CaptureError> {
    let clipboard = app.clipboard();
    match state.controller.copy_result().await? {
        CopyPayload::Image(png) => {
            let image = Image::from_bytes(&png)
                .map_err(|e| CaptureError::RasterizationFailed(e.to_string()))?;
            clipboard
                .write_image(&image)
                .map_err(|e| CaptureError::InvalidConfig(format!("Clipboard: {e}")))
        }
        CopyPayload::Text(text) => clipboard
            .write_text(text)
            .map_err(|e| CaptureError::InvalidConfig(format!("Clipboard: {e}"))),
    }
}

// Host bridge callbacks, invoked by the webview.

#[tauri::command]
pub fn host_session_granted(
    request_id: Uuid,
    supported_formats: Vec<String>,
    bridge: tauri::State<'_, Arc<WebviewBridge>>,
) -> bool {
    bridge.resolve_session(request_id, SessionReply::Granted { supported_formats })
}

#[tauri::command]
pub fn host_session_denied(
    request_id: Uuid,
    name: String,
    message: String,
    bridge: tauri::State<'_, Arc<WebviewBridge>>,
) -> bool {
    bridge.resolve_session(request_id, SessionReply::Denied { name, message })
}

#[tauri::command]
pub fn host_data_available(
    data: String,
    bridge: tauri::State<'_, Arc<WebviewBridge>>,
) -> Result<(), CaptureError> {
    let slice = decode_slice(&data)?;
    if let Some(session) = bridge.active_session() {
        session.data_available(slice);
    }
    Ok(())
}

/// `slices` is the number of `host_data_available` calls made for the session.
#[tauri::command]
pub fn host_session_finalized(slices: u64, bridge: tauri::State<'_, Arc<WebviewBridge>>) {
    if let Some(session) = bridge.active_session() {
        session.finalized(slices);
    }
}

#[tauri::command]
pub fn host_surface_ended(bridge: tauri::State<'_, Arc<WebviewBridge>>) {
    if let Some(session) = bridge.active_session() {
        session.surface_ended();
    }
}

#[tauri::command]
pub fn host_session_failed(message: String, bridge: tauri::State<'_, Arc<WebviewBridge>>) {
    if let Some(session) = bridge.active_session() {
        session.failed(message);
    }
}

#[tauri::command]
pub fn host_region_rendered(
    request_id: Uuid,
    png: String,
    bridge: tauri::State<'_, Arc<WebviewBridge>>,
) -> bool {
    bridge.resolve_render(request_id, Ok(png))
}

#[tauri::command]
pub fn host_render_failed(
    request_id: Uuid,
    message: String,
    bridge: tauri::State<'_, Arc<WebviewBridge>>,
) -> bool {
    bridge.resolve_render(request_id, Err(message))
}
