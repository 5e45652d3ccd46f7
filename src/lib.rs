pub mod capture;
pub mod error;
pub mod events;
pub mod shortcuts;
#[cfg(feature = "desktop")]
pub mod state;
#[cfg(feature = "desktop")]
pub mod tray;

/// Initialize `env_logger`, defaulting to `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    use tauri::{Emitter, Manager};
    use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
    use tokio::sync::broadcast::error::RecvError;

    use capture::bridge::{not_found, serve_blob, WebviewBridge, WebviewHost, WebviewRasterizer};
    use capture::config::{AppConfig, RegionHandle};
    use capture::{spawn_controller, CaptureDependencies, Notice};
    use state::app_state::AppState;

    init_logging();

    tauri::Builder::default()
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .register_uri_scheme_protocol("pagecap", |ctx, request| {
            match ctx.app_handle().try_state::<AppState>() {
                Some(state) => serve_blob(state.controller.objects(), request.uri().path()),
                None => not_found(),
            }
        })
        .setup(|app| {
            // Hide from dock: the widget and tray are the whole UI
            #[cfg(target_os = "macos")]
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            let config = AppConfig::default();
            let bridge = WebviewBridge::new(app.handle().clone());
            let deps = CaptureDependencies {
                host: Arc::new(WebviewHost::new(Arc::clone(&bridge))),
                rasterizer: Some(Arc::new(WebviewRasterizer::new(Arc::clone(&bridge)))),
                // Replaced by the webview's report_content_region on load
                region: RegionHandle {
                    id: "page-content".into(),
                    scroll_width: 1152,
                    scroll_height: 2160,
                    viewport_height: 1080,
                },
            };
            let (controller, _task) = tauri::async_runtime::block_on({
                let config = config.clone();
                async move { spawn_controller(config, deps) }
            })?;

            // Forward view changes and notices to the webview
            let mut views = controller.watch_view();
            let mut notices = controller.subscribe_notices();
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while views.changed().await.is_ok() {
                    let view = views.borrow_and_update().clone();
                    let _ = handle.emit(events::STATE_CHANGED, &view);
                }
            });
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                loop {
                    let notice = match notices.recv().await {
                        Ok(notice) => notice,
                        Err(RecvError::Lagged(missed)) => {
                            log::warn!("Dropped {} capture notices", missed);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    match &notice {
                        Notice::Completed { .. } => {
                            let _ = handle.emit(events::CAPTURE_COMPLETED, &notice);
                        }
                        Notice::Failed { message, .. } => {
                            let _ = handle.emit(events::CAPTURE_FAILED, &notice);
                            handle
                                .dialog()
                                .message(message.clone())
                                .title("PageCap")
                                .kind(MessageDialogKind::Error)
                                .show(|_| {});
                        }
                    }
                }
            });

            app.manage(bridge);
            app.manage(AppState::new(controller, config));

            shortcuts::commands::register_default_shortcuts(app.handle());
            tray::menu::setup_tray(app.handle())?;

            log::info!("PageCap ready");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            capture::commands::start_recording,
            capture::commands::start_screenshot,
            capture::commands::toggle_pause,
            capture::commands::stop_capture,
            capture::commands::cancel_screenshot,
            capture::commands::retry_capture,
            capture::commands::press_keys,
            capture::commands::get_control_view,
            capture::commands::get_config,
            capture::commands::report_content_region,
            capture::commands::download_result,
            capture::commands::copy_result,
            capture::commands::host_session_granted,
            capture::commands::host_session_denied,
            capture::commands::host_data_available,
            capture::commands::host_session_finalized,
            capture::commands::host_surface_ended,
            capture::commands::host_session_failed,
            capture::commands::host_region_rendered,
            capture::commands::host_render_failed,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
