use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Encoded data is delivered by the host in slices of this length.
pub const SLICE_INTERVAL: Duration = Duration::from_millis(1000);
/// How long a finalized recording waits for slices still in transit.
pub const FINALIZE_GRACE: Duration = Duration::from_millis(2000);
/// Period of the elapsed-time counter while recording.
pub const ELAPSED_TICK: Duration = Duration::from_millis(1000);
/// Period of the simulated screenshot progress sequence.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);
pub const PROGRESS_STEPS: u32 = 20;
pub const SCROLL_STEP_PX: u32 = 50;
/// Largest scroll offset the widget animates to.
pub const MAX_VISUAL_SCROLL_PX: u32 = 500;
/// Delay between resetting the scroll and rasterizing, so the page can repaint.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// How long the "Copied!" label stays up.
pub const COPY_FEEDBACK: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    Tab,
    Mic,
    None,
}

impl AudioSource {
    pub fn label(&self) -> &'static str {
        match self {
            AudioSource::Tab => "Tab Audio",
            AudioSource::Mic => "Microphone",
            AudioSource::None => "Muted",
        }
    }

    pub fn is_muted(&self) -> bool {
        matches!(self, AudioSource::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Hd, // 1080p, 8 Mbps
    Sd, // 720p, 5 Mbps
}

impl VideoQuality {
    pub fn max_height(&self) -> u32 {
        match self {
            VideoQuality::Hd => 1080,
            VideoQuality::Sd => 720,
        }
    }

    pub fn bitrate(&self) -> u32 {
        match self {
            VideoQuality::Hd => 8_000_000,
            VideoQuality::Sd => 5_000_000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::Hd => "HD",
            VideoQuality::Sd => "SD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotRange {
    Full,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub audio_source: AudioSource,
    pub video_quality: VideoQuality,
    pub screenshot_range: ScreenshotRange,
    /// Maximum number of viewport-sized screens a full-range screenshot covers.
    pub screenshot_limit: u32,
    pub hide_fixed_nav: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio_source: AudioSource::Tab,
            video_quality: VideoQuality::Hd,
            screenshot_range: ScreenshotRange::Full,
            screenshot_limit: 10,
            hide_fixed_nav: true,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.screenshot_limit == 0 {
            return Err(CaptureError::InvalidConfig(
                "screenshotLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn capture_constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            video: VideoConstraints {
                display_surface: DisplaySurface::Browser,
                max_height: self.video_quality.max_height(),
                bitrate: self.video_quality.bitrate(),
            },
            audio: self.audio_source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySurface {
    Browser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub display_surface: DisplaySurface,
    pub max_height: u32,
    pub bitrate: u32,
}

/// What the controller asks the host for when a recording starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub video: VideoConstraints,
    pub audio: AudioSource,
}

/// The content region handed to the rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionHandle {
    pub id: String,
    pub scroll_width: u32,
    pub scroll_height: u32,
    pub viewport_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub scale: f32,
    pub use_cors: bool,
    pub allow_taint: bool,
    pub background_color: String,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub width: u32,
    pub height: u32,
    pub hide_fixed_nav: bool,
}

impl RenderOptions {
    pub fn for_region(region: &RegionHandle, config: &AppConfig) -> Self {
        let height = match config.screenshot_range {
            ScreenshotRange::Full => {
                let limit = region
                    .viewport_height
                    .saturating_mul(config.screenshot_limit.max(1));
                region.scroll_height.min(limit)
            }
            ScreenshotRange::Visible => region.viewport_height.min(region.scroll_height),
        };

        Self {
            scale: 2.0,
            use_cors: true,
            allow_taint: true,
            background_color: "#ffffff".into(),
            scroll_x: 0,
            scroll_y: 0,
            width: region.scroll_width,
            height,
            hide_fixed_nav: config.hide_fixed_nav,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionHandle {
        RegionHandle {
            id: "content".into(),
            scroll_width: 1152,
            scroll_height: 4000,
            viewport_height: 800,
        }
    }

    #[test]
    fn default_config_round_trips_camel_case() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(json["audioSource"], "tab");
        assert_eq!(json["videoQuality"], "hd");
        assert_eq!(json["screenshotRange"], "full");
        assert_eq!(json["screenshotLimit"], 10);
        assert_eq!(json["hideFixedNav"], true);
    }

    #[test]
    fn zero_screenshot_limit_is_rejected() {
        let config = AppConfig {
            screenshot_limit: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CaptureError::InvalidConfig(_))
        ));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn constraints_follow_quality_and_audio() {
        let config = AppConfig {
            audio_source: AudioSource::None,
            video_quality: VideoQuality::Sd,
            ..AppConfig::default()
        };
        let constraints = config.capture_constraints();
        assert_eq!(constraints.video.display_surface, DisplaySurface::Browser);
        assert_eq!(constraints.video.max_height, 720);
        assert_eq!(constraints.video.bitrate, 5_000_000);
        assert!(constraints.audio.is_muted());
    }

    #[test]
    fn constraints_request_the_browser_surface() {
        let json = serde_json::to_value(AppConfig::default().capture_constraints()).unwrap();
        assert_eq!(json["video"]["displaySurface"], "browser");
        assert_eq!(json["video"]["maxHeight"], 1080);
        assert_eq!(json["audio"], "tab");
    }

    #[test]
    fn full_range_is_capped_by_screenshot_limit() {
        let config = AppConfig {
            screenshot_limit: 3,
            ..AppConfig::default()
        };
        let options = RenderOptions::for_region(&region(), &config);
        assert_eq!(options.width, 1152);
        assert_eq!(options.height, 2400);
        assert_eq!(options.scale, 2.0);
        assert_eq!(options.background_color, "#ffffff");
        assert_eq!((options.scroll_x, options.scroll_y), (0, 0));

        let uncapped = RenderOptions::for_region(&region(), &AppConfig::default());
        assert_eq!(uncapped.height, 4000);
    }

    #[test]
    fn visible_range_uses_viewport_height() {
        let config = AppConfig {
            screenshot_range: ScreenshotRange::Visible,
            hide_fixed_nav: false,
            ..AppConfig::default()
        };
        let options = RenderOptions::for_region(&region(), &config);
        assert_eq!(options.height, 800);
        assert!(!options.hide_fixed_nav);
    }
}
