use serde::Serialize;

use crate::capture::config::AppConfig;
use crate::capture::controller::CaptureState;
use crate::capture::result::MediaKind;
use crate::capture::screenshot::ScreenshotPhase;

/// Snapshot of what the floating widget and the result dialog display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ControlView {
    Idle {
        audio_label: &'static str,
        audio_muted: bool,
        quality_label: &'static str,
    },
    Recording {
        elapsed: String,
        elapsed_secs: u64,
        paused: bool,
        stopping: bool,
    },
    Screenshotting {
        progress: u8,
        screen: u32,
        scroll_offset: u32,
        settling: bool,
    },
    Finished {
        kind: MediaKind,
        url: String,
        extension: &'static str,
        filename: String,
        download_label: String,
        copy_label: &'static str,
    },
}

impl ControlView {
    pub fn from_state(state: &CaptureState, config: &AppConfig) -> Self {
        match state {
            CaptureState::Idle => ControlView::Idle {
                audio_label: config.audio_source.label(),
                audio_muted: config.audio_source.is_muted(),
                quality_label: config.video_quality.label(),
            },
            CaptureState::Recording(session) => ControlView::Recording {
                elapsed: format_elapsed(session.elapsed_secs()),
                elapsed_secs: session.elapsed_secs(),
                paused: session.is_paused(),
                stopping: session.is_stopping(),
            },
            CaptureState::Screenshotting(session) => ControlView::Screenshotting {
                progress: session.progress(),
                screen: session.screen_number(),
                scroll_offset: session.visual_scroll(),
                settling: session.phase() != ScreenshotPhase::Scanning,
            },
            CaptureState::Finished(result) => ControlView::Finished {
                kind: result.kind(),
                url: result.url().to_string(),
                extension: result.extension(),
                filename: result.download_filename(),
                download_label: result.download_label(),
                copy_label: result.copy_label(),
            },
        }
    }
}

/// Format seconds as `MM:SS`. Minutes are padded to two digits, not capped.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::config::{AudioSource, VideoQuality};

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(599), "09:59");
        assert_eq!(format_elapsed(6000), "100:00");
    }

    #[test]
    fn idle_view_shows_config_labels() {
        let config = AppConfig {
            audio_source: AudioSource::Mic,
            video_quality: VideoQuality::Sd,
            ..AppConfig::default()
        };
        let view = ControlView::from_state(&CaptureState::Idle, &config);
        assert_eq!(
            view,
            ControlView::Idle {
                audio_label: "Microphone",
                audio_muted: false,
                quality_label: "SD",
            }
        );

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["state"], "idle");
        assert_eq!(json["audioLabel"], "Microphone");
        assert_eq!(json["qualityLabel"], "SD");
    }
}
