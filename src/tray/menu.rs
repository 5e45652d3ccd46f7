use tauri::menu::{Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::TrayIconBuilder;
use tauri::{AppHandle, Manager};

use crate::state::app_state::AppState;

/// Build and configure the system tray icon with menu
pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let record = MenuItem::with_id(app, "record", "Record Tab          ⌥⇧R", true, None::<&str>)?;
    let screenshot =
        MenuItem::with_id(app, "screenshot", "Page Screenshot  ⌥⇧S", true, None::<&str>)?;

    let sep1 = PredefinedMenuItem::separator(app)?;

    let show = MenuItem::with_id(app, "show", "Show Widget", true, None::<&str>)?;
    let open_downloads =
        MenuItem::with_id(app, "open_downloads", "Open Downloads Folder", true, None::<&str>)?;

    let sep2 = PredefinedMenuItem::separator(app)?;

    let quit = MenuItem::with_id(app, "quit", "Quit PageCap", true, None::<&str>)?;

    let menu = Menu::with_items(
        app,
        &[&record, &screenshot, &sep1, &show, &open_downloads, &sep2, &quit],
    )?;

    let icon_bytes = include_bytes!("../../icons/tray-icon.png");
    let icon = tauri::image::Image::from_bytes(icon_bytes)?;

    let _tray = TrayIconBuilder::new()
        .icon(icon)
        .icon_as_template(true)
        .menu(&menu)
        .show_menu_on_left_click(true)
        .tooltip("PageCap")
        .on_menu_event(move |app, event| match event.id().as_ref() {
            "quit" => {
                app.exit(0);
            }
            "show" => show_widget(app),
            "open_downloads" => {
                if let Some(path) = dirs::download_dir() {
                    if let Err(e) = open_folder(&path) {
                        log::error!("Failed to open {}: {}", path.display(), e);
                    }
                }
            }
            "record" => {
                show_widget(app);
                let app_handle = app.clone();
                tauri::async_runtime::spawn(async move {
                    let state: tauri::State<'_, AppState> = app_handle.state();
                    if let Err(e) = state.controller.start_recording().await {
                        log::warn!("Tray recording failed: {}", e);
                    }
                });
            }
            "screenshot" => {
                show_widget(app);
                let app_handle = app.clone();
                tauri::async_runtime::spawn(async move {
                    let state: tauri::State<'_, AppState> = app_handle.state();
                    if let Err(e) = state.controller.start_screenshot().await {
                        log::warn!("Tray screenshot failed: {}", e);
                    }
                });
            }
            _ => {}
        })
        .build(app)?;

    Ok(())
}

/// Bring the floating widget window to the front
fn show_widget(app: &AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn open_folder(path: &std::path::Path) -> std::io::Result<()> {
    let opener = folder_opener();
    let child = std::process::Command::new(opener).arg(path).spawn()?;
    log::info!("Opened {} with {} (pid {})", path.display(), opener, child.id());
    // Not waited on: the opener hands off to the file manager and exits
    drop(child);
    Ok(())
}

fn folder_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_opener_matches_platform() {
        #[cfg(target_os = "macos")]
        assert_eq!(folder_opener(), "open");
        #[cfg(target_os = "windows")]
        assert_eq!(folder_opener(), "explorer");
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        assert_eq!(folder_opener(), "xdg-open");
    }
}
