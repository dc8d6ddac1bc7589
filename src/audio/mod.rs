pub mod buffer;
pub mod capture;

pub use buffer::AudioBuffer;
pub use capture::AudioCapture;

use std::sync::{atomic::AtomicU32, Arc};
use thiserror::Error;

/// Microphone capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No microphone available or permission denied")]
    DeviceUnavailable,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording and no finalized buffer exists")]
    NotRecording,

    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// Microphone backend the recorder drives. The cpal stack in `capture` is
/// the production implementation.
pub trait CaptureBackend: Send {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Finalize and hand back everything captured since `start`.
    fn stop(&mut self) -> Result<AudioBuffer, CaptureError>;

    fn audio_level_handle(&self) -> Arc<AtomicU32>;

    fn list_input_devices(&self) -> Result<Vec<String>, CaptureError>;

    fn selected_input_device(&self) -> Option<String>;

    fn set_selected_input_device(&mut self, name: Option<String>);
}

/// Exclusive handle over the microphone.
///
/// The device is a singleton: at most one capture runs at a time. `stop` is
/// idempotent; stopping an already-stopped recorder hands back the last
/// finalized buffer.
pub struct AudioRecorder {
    capture: Box<dyn CaptureBackend>,
    is_recording: bool,
    last_buffer: Option<AudioBuffer>,
}

impl AudioRecorder {
    pub fn new() -> Self {
        Self::with_backend(Box::new(AudioCapture::new()))
    }

    pub fn with_backend(capture: Box<dyn CaptureBackend>) -> Self {
        Self {
            capture,
            is_recording: false,
            last_buffer: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.is_recording {
            return Err(CaptureError::AlreadyRecording);
        }
        self.capture.start()?;
        self.is_recording = true;
        self.last_buffer = None;
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<AudioBuffer, CaptureError> {
        if !self.is_recording {
            // Idempotent stop: return the previously finalized buffer.
            return self
                .last_buffer
                .clone()
                .ok_or(CaptureError::NotRecording);
        }
        let buffer = self.capture.stop()?;
        self.is_recording = false;
        self.last_buffer = Some(buffer.clone());
        Ok(buffer)
    }

    /// Stop and throw away whatever was captured so far.
    pub fn discard_recording(&mut self) {
        if self.is_recording {
            let _ = self.capture.stop();
            self.is_recording = false;
        }
        self.last_buffer = None;
    }

    pub fn audio_level_handle(&self) -> Arc<AtomicU32> {
        self.capture.audio_level_handle()
    }

    pub fn list_input_devices(&self) -> Result<Vec<String>, CaptureError> {
        self.capture.list_input_devices()
    }

    pub fn selected_input_device(&self) -> Option<String> {
        self.capture.selected_input_device()
    }

    pub fn set_selected_input_device(&mut self, name: Option<String>) {
        self.capture.set_selected_input_device(name);
    }
}

impl Default for AudioRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        samples: Vec<i16>,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        level: Arc<AtomicU32>,
    }

    impl ScriptedBackend {
        fn with_samples(samples: Vec<i16>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let starts = Arc::new(AtomicUsize::new(0));
            let stops = Arc::new(AtomicUsize::new(0));
            let backend = Self {
                samples,
                starts: starts.clone(),
                stops: stops.clone(),
                level: Arc::new(AtomicU32::new(0)),
            };
            (backend, starts, stops)
        }
    }

    impl CaptureBackend for ScriptedBackend {
        fn start(&mut self) -> Result<(), CaptureError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> Result<AudioBuffer, CaptureError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            let mut buffer = AudioBuffer::new(16000, 1);
            buffer.append(&self.samples);
            Ok(buffer)
        }

        fn audio_level_handle(&self) -> Arc<AtomicU32> {
            self.level.clone()
        }

        fn list_input_devices(&self) -> Result<Vec<String>, CaptureError> {
            Ok(vec!["Scripted Mic".to_string()])
        }

        fn selected_input_device(&self) -> Option<String> {
            None
        }

        fn set_selected_input_device(&mut self, _name: Option<String>) {}
    }

    #[test]
    fn test_second_stop_returns_same_buffer() {
        let (backend, _, stops) = ScriptedBackend::with_samples(vec![1, 2, 3]);
        let mut recorder = AudioRecorder::with_backend(Box::new(backend));

        recorder.start_recording().unwrap();
        let first = recorder.stop_recording().unwrap();
        let second = recorder.stop_recording().unwrap();

        assert_eq!(first.samples, second.samples);
        // The backend is stopped once; the repeat comes from the cache.
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_stop_without_any_capture_is_an_error() {
        let (backend, _, _) = ScriptedBackend::with_samples(vec![]);
        let mut recorder = AudioRecorder::with_backend(Box::new(backend));

        let err = recorder.stop_recording().unwrap_err();
        assert!(matches!(err, CaptureError::NotRecording));
    }

    #[test]
    fn test_start_while_recording_is_rejected() {
        let (backend, starts, _) = ScriptedBackend::with_samples(vec![0]);
        let mut recorder = AudioRecorder::with_backend(Box::new(backend));

        recorder.start_recording().unwrap();
        let err = recorder.start_recording().unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyRecording));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_discard_clears_finalized_buffer() {
        let (backend, _, _) = ScriptedBackend::with_samples(vec![1, 2]);
        let mut recorder = AudioRecorder::with_backend(Box::new(backend));

        recorder.start_recording().unwrap();
        recorder.stop_recording().unwrap();
        recorder.discard_recording();

        let err = recorder.stop_recording().unwrap_err();
        assert!(matches!(err, CaptureError::NotRecording));
    }

    #[test]
    fn test_restart_drops_previous_buffer() {
        let (backend, _, _) = ScriptedBackend::with_samples(vec![7]);
        let mut recorder = AudioRecorder::with_backend(Box::new(backend));

        recorder.start_recording().unwrap();
        recorder.stop_recording().unwrap();
        recorder.start_recording().unwrap();

        // The cached buffer belongs to the finished take, not the new one.
        assert!(recorder.is_recording());
        recorder.discard_recording();
        assert!(matches!(
            recorder.stop_recording().unwrap_err(),
            CaptureError::NotRecording
        ));
    }
}
