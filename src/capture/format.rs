use serde::{Deserialize, Serialize};

/// Recording formats in order of preference. MP4 plays almost everywhere,
/// so it is tried first.
pub const PREFERRED_FORMATS: [&str; 3] = [
    "video/mp4",
    "video/webm;codecs=h264",
    "video/webm;codecs=vp9",
];

/// Every host encoder is expected to accept plain WebM.
pub const FALLBACK_FORMAT: &str = "video/webm";

pub const IMAGE_MIME_TYPE: &str = "image/png";
pub const IMAGE_EXTENSION: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingFormat {
    mime_type: String,
}

impl RecordingFormat {
    /// Pick the first preferred format the encoder supports, else the fallback.
    pub fn negotiate<F>(is_supported: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mime_type = PREFERRED_FORMATS
            .iter()
            .copied()
            .find(|candidate| is_supported(candidate))
            .unwrap_or(FALLBACK_FORMAT);

        Self {
            mime_type: mime_type.to_string(),
        }
    }

    pub fn fallback() -> Self {
        Self {
            mime_type: FALLBACK_FORMAT.to_string(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn extension(&self) -> &'static str {
        if self.mime_type.contains("mp4") {
            "mp4"
        } else {
            "webm"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supporting(list: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |mime| list.contains(&mime)
    }

    #[test]
    fn prefers_mp4_when_available() {
        let format = RecordingFormat::negotiate(supporting(&[
            "video/webm",
            "video/webm;codecs=vp9",
            "video/mp4",
        ]));
        assert_eq!(format.mime_type(), "video/mp4");
        assert_eq!(format.extension(), "mp4");
    }

    #[test]
    fn picks_first_supported_in_preference_order() {
        let format = RecordingFormat::negotiate(supporting(&[
            "video/webm;codecs=vp9",
            "video/webm;codecs=h264",
        ]));
        assert_eq!(format.mime_type(), "video/webm;codecs=h264");
        assert_eq!(format.extension(), "webm");
    }

    #[test]
    fn vp9_only_maps_to_webm() {
        let format =
            RecordingFormat::negotiate(supporting(&["video/webm;codecs=vp9", "video/webm"]));
        assert_eq!(format.mime_type(), "video/webm;codecs=vp9");
        assert_eq!(format.extension(), "webm");
    }

    #[test]
    fn falls_back_when_nothing_preferred_is_supported() {
        let format = RecordingFormat::negotiate(|_| false);
        assert_eq!(format, RecordingFormat::fallback());
        assert_eq!(format.mime_type(), FALLBACK_FORMAT);
        assert_eq!(format.extension(), "webm");
    }
}
