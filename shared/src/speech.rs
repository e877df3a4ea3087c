//! Push-to-talk dictation feeding a text input.
//!
//! The platform recognizer is reached through [`CaptureProvider`]; a missing
//! provider means the platform has no speech capability and input stays
//! text-only. At most one [`CaptureHandle`] is live per [`SpeechCapture`],
//! and it is aborted when the capture is released or dropped. A stopped
//! handle is kept until the recognizer reports its end, so final results
//! still in flight are delivered.

use miette::Diagnostic;
use thiserror::Error;

pub const DEFAULT_LOCALE: &str = "ja-JP";

/// Recognizer error code reported when the microphone is open but nobody
/// spoke. Expected during normal use.
pub const NO_SPEECH: &str = "no-speech";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub continuous: bool,
    pub interim_results: bool,
    pub locale: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            locale: DEFAULT_LOCALE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("speech capture is not supported on this platform")]
    Unsupported,
    #[error("a capture session is already active")]
    AlreadyActive,
    #[error("speech capture failed: {0}")]
    Platform(String),
}

/// A running recognizer session.
pub trait CaptureHandle {
    /// Ends capture, letting the recognizer deliver pending final results.
    fn stop(&mut self);
    /// Ends capture immediately and discards pending results.
    fn abort(&mut self);
}

pub trait CaptureProvider {
    type Handle: CaptureHandle;

    fn open(&self, config: &CaptureConfig) -> Result<Self::Handle, CaptureError>;
}

pub struct SpeechCapture<P: CaptureProvider> {
    provider: Option<P>,
    config: CaptureConfig,
    active: Option<P::Handle>,
    /// Stopped but not yet ended.
    stopping: Option<P::Handle>,
    interim: String,
}

impl<P: CaptureProvider> SpeechCapture<P> {
    pub fn new(provider: Option<P>) -> Self {
        Self::with_config(provider, CaptureConfig::default())
    }

    pub fn with_config(provider: Option<P>, config: CaptureConfig) -> Self {
        Self {
            provider,
            config,
            active: None,
            stopping: None,
            interim: String::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// A stopped session is still flushing its final results.
    pub fn is_stopping(&self) -> bool {
        self.stopping.is_some()
    }

    /// Unstable text heard so far; never part of the committed input.
    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() || self.stopping.is_some() {
            return Err(CaptureError::AlreadyActive);
        }
        let provider = self.provider.as_ref().ok_or(CaptureError::Unsupported)?;

        let handle = provider.open(&self.config)?;
        self.active = Some(handle);
        self.interim.clear();
        log::debug!("speech capture started ({})", self.config.locale);
        Ok(())
    }

    /// Asks the recognizer to finish. The handle stays attached until
    /// [`Self::on_end`] or [`Self::on_error`].
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.stop();
            self.stopping = Some(handle);
            log::debug!("speech capture stopping");
        }
        self.interim.clear();
    }

    /// Starts when idle, stops when listening. Returns whether capture is
    /// active afterwards.
    pub fn toggle(&mut self) -> Result<bool, CaptureError> {
        if self.is_listening() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Folds one recognizer result batch. Interim text replaces the status
    /// line; finalized text is returned for the caller to append to its
    /// input.
    pub fn on_results(&mut self, segments: &[TranscriptSegment]) -> Option<String> {
        let mut finished = String::new();
        let mut interim = String::new();
        for segment in segments {
            if segment.is_final {
                finished.push_str(&segment.text);
            } else {
                interim.push_str(&segment.text);
            }
        }

        if !finished.is_empty() {
            self.interim.clear();
        }
        if !interim.is_empty() && self.is_listening() {
            self.interim = interim;
        }

        (!finished.is_empty()).then_some(finished)
    }

    /// The recognizer ended, on its own or after [`Self::stop`].
    pub fn on_end(&mut self) {
        self.active = None;
        self.stopping = None;
        self.interim.clear();
    }

    pub fn on_error(&mut self, code: &str) {
        if code != NO_SPEECH {
            log::warn!("speech recognition error: {code}");
        }
        self.on_end();
    }

    /// Aborts any live session. Safe to call repeatedly.
    pub fn release(&mut self) {
        for mut handle in self.active.take().into_iter().chain(self.stopping.take()) {
            handle.abort();
        }
        self.interim.clear();
    }
}

impl<P: CaptureProvider> Drop for SpeechCapture<P> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Log(Rc<RefCell<Vec<&'static str>>>);

    struct FakeHandle(Rc<RefCell<Vec<&'static str>>>);

    impl CaptureHandle for FakeHandle {
        fn stop(&mut self) {
            self.0.borrow_mut().push("stop");
        }

        fn abort(&mut self) {
            self.0.borrow_mut().push("abort");
        }
    }

    impl CaptureProvider for Log {
        type Handle = FakeHandle;

        fn open(&self, config: &CaptureConfig) -> Result<FakeHandle, CaptureError> {
            assert!(config.continuous && config.interim_results);
            assert_eq!(config.locale, "ja-JP");
            self.0.borrow_mut().push("open");
            Ok(FakeHandle(self.0.clone()))
        }
    }

    fn capture() -> (SpeechCapture<Log>, Rc<RefCell<Vec<&'static str>>>) {
        let log = Log::default();
        let events = log.0.clone();
        (SpeechCapture::new(Some(log)), events)
    }

    #[test]
    fn unsupported_platform_refuses_to_start() {
        let mut capture = SpeechCapture::<Log>::new(None);

        assert!(!capture.is_supported());
        assert_eq!(capture.start(), Err(CaptureError::Unsupported));
    }

    #[test]
    fn only_one_session_at_a_time() {
        let (mut capture, events) = capture();

        capture.start().unwrap();
        assert_eq!(capture.start(), Err(CaptureError::AlreadyActive));
        assert_eq!(*events.borrow(), vec!["open"]);
    }

    #[test]
    fn interim_text_never_reaches_the_input() {
        let (mut capture, _) = capture();
        let mut input = String::from("typed ");
        capture.start().unwrap();

        let appended = capture.on_results(&[TranscriptSegment::interim("hel")]);
        assert_eq!(appended, None);
        assert_eq!(capture.interim(), "hel");

        if let Some(text) = capture.on_results(&[
            TranscriptSegment::finished("hello"),
            TranscriptSegment::interim(" wor"),
        ]) {
            input.push_str(&text);
        }

        assert_eq!(input, "typed hello");
        assert_eq!(capture.interim(), " wor");
    }

    #[test]
    fn toggle_stops_the_handle() {
        let (mut capture, events) = capture();

        assert_eq!(capture.toggle(), Ok(true));
        assert_eq!(capture.toggle(), Ok(false));
        assert!(!capture.is_listening());
        assert!(capture.is_stopping());
        assert_eq!(*events.borrow(), vec!["open", "stop"]);
    }

    #[test]
    fn final_results_after_stop_are_still_appended() {
        let (mut capture, events) = capture();
        let mut input = String::from("typed ");
        capture.start().unwrap();
        capture.on_results(&[TranscriptSegment::interim("hel")]);

        capture.stop();
        assert_eq!(capture.interim(), "");

        if let Some(text) = capture.on_results(&[TranscriptSegment::finished("hello")]) {
            input.push_str(&text);
        }
        assert_eq!(input, "typed hello");

        // Late interim text is not shown once stopped.
        capture.on_results(&[TranscriptSegment::interim("more")]);
        assert_eq!(capture.interim(), "");

        capture.on_end();
        assert!(!capture.is_stopping());
        assert_eq!(*events.borrow(), vec!["open", "stop"]);
    }

    #[test]
    fn no_new_session_until_the_stopped_one_ends() {
        let (mut capture, events) = capture();
        capture.start().unwrap();
        capture.stop();

        assert_eq!(capture.start(), Err(CaptureError::AlreadyActive));

        capture.on_end();
        capture.start().unwrap();
        assert_eq!(*events.borrow(), vec!["open", "stop", "open"]);
    }

    #[test]
    fn release_aborts_a_stopping_session() {
        let (mut capture, events) = capture();
        capture.start().unwrap();
        capture.stop();

        drop(capture);

        assert_eq!(*events.borrow(), vec!["open", "stop", "abort"]);
    }

    #[test]
    fn drop_aborts_a_live_session() {
        let (mut capture, events) = capture();
        capture.start().unwrap();

        drop(capture);

        assert_eq!(*events.borrow(), vec!["open", "abort"]);
    }

    #[test]
    fn recognizer_end_allows_a_new_session() {
        let (mut capture, events) = capture();
        capture.start().unwrap();

        capture.on_error("no-speech");
        assert!(!capture.is_listening());
        capture.start().unwrap();

        assert_eq!(*events.borrow(), vec!["open", "open"]);
    }
}
