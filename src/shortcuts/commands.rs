use std::collections::HashMap;

use tauri::{Emitter, Manager};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

use crate::events;
use crate::shortcuts::bindings::{default_bindings, KeyChord};
use crate::state::app_state::AppState;

/// Register the capture shortcuts during app setup
pub fn register_default_shortcuts(app: &tauri::AppHandle) {
    if let Err(e) = register_shortcuts(app) {
        log::warn!("Failed to register default shortcuts: {}", e);
    }
}

fn register_shortcuts(app: &tauri::AppHandle) -> Result<(), String> {
    let manager = app.global_shortcut();

    for (combo, action) in default_bindings() {
        let chord: KeyChord = combo.parse().map_err(|e| format!("{e}"))?;
        let shortcut: tauri_plugin_global_shortcut::Shortcut = combo
            .parse()
            .map_err(|e| format!("Invalid shortcut '{}': {:?}", combo, e))?;
        let app_clone = app.clone();
        manager
            .on_shortcut(shortcut, move |_app, _shortcut, event| {
                if event.state != ShortcutState::Pressed {
                    return;
                }
                let app = app_clone.clone();
                let chord = chord.clone();
                tauri::async_runtime::spawn(async move {
                    let state: tauri::State<'_, AppState> = app.state();
                    match state.controller.shortcut(chord).await {
                        Ok(Some(_)) => {
                            let mut payload = HashMap::new();
                            payload.insert("action", action.as_str());
                            let _ = app.emit(events::SHORTCUT_TRIGGERED, &payload);
                        }
                        Ok(None) => {}
                        Err(e) => log::warn!("Shortcut {} failed: {}", combo, e),
                    }
                });
            })
            .map_err(|e| format!("Failed to register shortcut: {}", e))?;
    }

    Ok(())
}
