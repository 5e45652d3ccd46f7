use crate::capture::controller::SessionId;
use crate::capture::format::RecordingFormat;
use crate::capture::host::EncodeSession;
use crate::capture::timer::ScheduledTask;

/// Media produced when a recording is finalized.
#[derive(Debug)]
pub struct RecordedMedia {
    pub data: Vec<u8>,
    pub format: RecordingFormat,
    pub elapsed_secs: u64,
}

/// State held while the controller is recording.
///
/// The live tracks are released when the session is dropped, whichever way
/// the recording ends.
pub struct RecordingSession {
    id: SessionId,
    encoder: Box<dyn EncodeSession>,
    format: RecordingFormat,
    chunks: Vec<Vec<u8>>,
    slices_received: u64,
    expected_slices: Option<u64>,
    paused: bool,
    stopping: bool,
    elapsed_secs: u64,
    ticker: Option<ScheduledTask>,
}

impl RecordingSession {
    pub(crate) fn new(
        id: SessionId,
        encoder: Box<dyn EncodeSession>,
        format: RecordingFormat,
    ) -> Self {
        Self {
            id,
            encoder,
            format,
            chunks: Vec::new(),
            slices_received: 0,
            expected_slices: None,
            paused: false,
            stopping: false,
            elapsed_secs: 0,
            ticker: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn format(&self) -> &RecordingFormat {
        &self.format
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn recorded_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// True once the host has finalized and every slice it announced has
    /// arrived.
    pub fn is_flushed(&self) -> bool {
        matches!(self.expected_slices, Some(expected) if self.slices_received >= expected)
    }

    pub(crate) fn encoder_mut(&mut self) -> &mut dyn EncodeSession {
        self.encoder.as_mut()
    }

    pub(crate) fn set_ticker(&mut self, ticker: Option<ScheduledTask>) {
        self.ticker = ticker;
    }

    /// Returns false for empty slices, which are not kept.
    pub(crate) fn push_chunk(&mut self, data: Vec<u8>) -> bool {
        self.slices_received += 1;
        if data.is_empty() {
            return false;
        }
        self.chunks.push(data);
        true
    }

    pub(crate) fn tick(&mut self) {
        if !self.paused && !self.stopping {
            self.elapsed_secs += 1;
        }
    }

    /// Pause the encoder and drop the elapsed ticker.
    pub(crate) fn pause(&mut self) {
        self.paused = true;
        self.ticker = None;
        self.encoder.pause();
    }

    /// Resume the encoder; the caller installs a fresh ticker.
    pub(crate) fn resume(&mut self, ticker: ScheduledTask) {
        self.paused = false;
        self.encoder.resume();
        self.ticker = Some(ticker);
    }

    /// Ask the encoder to flush. The session stays alive until the host
    /// reports it finalized.
    pub(crate) fn request_stop(&mut self) {
        self.stopping = true;
        self.ticker = None;
        self.encoder.stop();
    }

    /// Record the host's final slice count.
    pub(crate) fn expect_slices(&mut self, slices: u64) {
        self.expected_slices = Some(slices);
    }

    pub(crate) fn finish(mut self) -> RecordedMedia {
        let data = std::mem::take(&mut self.chunks).concat();
        RecordedMedia {
            data,
            format: self.format.clone(),
            elapsed_secs: self.elapsed_secs,
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.ticker = None;
        self.encoder.stop_tracks();
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("chunks", &self.chunks.len())
            .field("slices_received", &self.slices_received)
            .field("expected_slices", &self.expected_slices)
            .field("paused", &self.paused)
            .field("stopping", &self.stopping)
            .field("elapsed_secs", &self.elapsed_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    use crate::error::CaptureError;

    #[derive(Default)]
    struct CallLog(Arc<Mutex<Vec<&'static str>>>);

    impl EncodeSession for CallLog {
        fn is_format_supported(&self, _mime_type: &str) -> bool {
            true
        }
        fn start(&mut self, _: &RecordingFormat, _: Duration) -> Result<(), CaptureError> {
            self.0.lock().unwrap().push("start");
            Ok(())
        }
        fn pause(&mut self) {
            self.0.lock().unwrap().push("pause");
        }
        fn resume(&mut self) {
            self.0.lock().unwrap().push("resume");
        }
        fn stop(&mut self) {
            self.0.lock().unwrap().push("stop");
        }
        fn stop_tracks(&mut self) {
            self.0.lock().unwrap().push("stop_tracks");
        }
    }

    fn session() -> (RecordingSession, Arc<Mutex<Vec<&'static str>>>) {
        let log = CallLog::default();
        let calls = Arc::clone(&log.0);
        let session = RecordingSession::new(Uuid::new_v4(), Box::new(log), RecordingFormat::fallback());
        (session, calls)
    }

    #[test]
    fn empty_slices_are_not_accumulated() {
        let (mut session, _) = session();
        assert!(session.push_chunk(vec![1, 2]));
        assert!(!session.push_chunk(Vec::new()));
        assert!(session.push_chunk(vec![3]));
        assert_eq!(session.chunk_count(), 2);
        assert_eq!(session.recorded_bytes(), 3);
    }

    #[test]
    fn finish_concatenates_chunks_in_order_and_stops_tracks() {
        let (mut session, calls) = session();
        session.push_chunk(vec![1, 2]);
        session.push_chunk(vec![3, 4]);
        session.tick();

        let media = session.finish();
        assert_eq!(media.data, vec![1, 2, 3, 4]);
        assert_eq!(media.elapsed_secs, 1);
        assert_eq!(media.format.extension(), "webm");
        assert_eq!(*calls.lock().unwrap(), vec!["stop_tracks"]);
    }

    #[test]
    fn counter_is_frozen_while_paused_or_stopping() {
        let (mut session, calls) = session();
        session.tick();
        session.pause();
        session.tick();
        assert_eq!(session.elapsed_secs(), 1);
        assert!(session.is_paused());

        session.paused = false;
        session.request_stop();
        session.tick();
        assert_eq!(session.elapsed_secs(), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["pause", "stop"]);
    }

    #[test]
    fn flushed_only_after_every_announced_slice() {
        let (mut session, _) = session();
        session.push_chunk(vec![1]);
        assert!(!session.is_flushed());

        session.expect_slices(3);
        assert!(!session.is_flushed());
        session.push_chunk(Vec::new());
        assert!(!session.is_flushed());
        session.push_chunk(vec![2]);
        assert!(session.is_flushed());
        assert_eq!(session.chunk_count(), 2);
    }

    #[test]
    fn dropping_a_session_releases_tracks() {
        let (session, calls) = session();
        drop(session);
        assert_eq!(*calls.lock().unwrap(), vec!["stop_tracks"]);
    }
}
