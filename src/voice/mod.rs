// Speech synthesis playback half of the voice I/O layer.

pub mod catalog;
pub mod system;

pub use catalog::{LanguageOption, Voice};
pub use system::SystemSynthesizer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("No speech output device available")]
    DeviceUnavailable,

    #[error("Synthesis error: {0}")]
    Synthesis(String),
}

/// Backend able to enumerate voices and play synthesized speech.
///
/// The output device is a singleton: implementations must let `cancel`
/// silence any in-flight utterance, and `cancel` is idempotent.
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<Voice>;

    /// Begin speaking; returns as soon as playback is started.
    fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<(), VoiceError>;

    fn cancel(&self);
}

/// Facade over a synthesizer backend applying the voice selection policy.
pub struct Speaker {
    synth: Box<dyn SpeechSynthesizer>,
}

impl Speaker {
    pub fn new(synth: Box<dyn SpeechSynthesizer>) -> Self {
        Self { synth }
    }

    /// Speak `text` with the best available voice for `language_hint`.
    ///
    /// Best-effort: playback problems are logged, never surfaced. Any
    /// utterance already playing is cancelled first (one playback at a
    /// time per device).
    pub fn speak(&self, text: &str, language_hint: &str) {
        if text.is_empty() {
            return;
        }

        self.synth.cancel();

        let voices = self.synth.voices();
        let voice = catalog::select_voice(&voices, language_hint);

        match voice {
            Some(v) => tracing::debug!("Speaking with voice '{}' ({})", v.name, v.lang),
            None => tracing::debug!(
                "No voice installed for '{}', using synthesizer default",
                language_hint
            ),
        }

        if let Err(e) = self.synth.speak(text, voice) {
            tracing::warn!("Speech playback failed: {}", e);
        }
    }

    /// Cancel any in-flight or queued utterance. Idempotent.
    pub fn stop(&self) {
        self.synth.cancel();
    }

    pub fn list_languages(&self) -> Vec<LanguageOption> {
        catalog::list_languages(&self.synth.voices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type SpokenLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

    struct FakeSynth {
        voices: Vec<Voice>,
        spoken: SpokenLog,
        cancels: Arc<AtomicUsize>,
    }

    impl FakeSynth {
        fn with_voices(voices: Vec<Voice>) -> (Self, SpokenLog, Arc<AtomicUsize>) {
            let spoken: SpokenLog = Arc::default();
            let cancels = Arc::new(AtomicUsize::new(0));
            let synth = Self {
                voices,
                spoken: spoken.clone(),
                cancels: cancels.clone(),
            };
            (synth, spoken, cancels)
        }
    }

    impl SpeechSynthesizer for FakeSynth {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<(), VoiceError> {
            self.spoken
                .lock()
                .unwrap()
                .push((text.to_string(), voice.map(|v| v.lang.clone())));
            Ok(())
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_speak_cancels_prior_playback_first() {
        let (synth, _, cancels) = FakeSynth::with_voices(vec![]);
        let speaker = Speaker::new(Box::new(synth));

        speaker.speak("hello", "en");
        speaker.speak("world", "en");
        speaker.stop();
        speaker.stop();

        // one cancel per speak plus each explicit (idempotent) stop
        assert_eq!(cancels.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_speak_selects_hinted_voice() {
        let (synth, spoken, _) = FakeSynth::with_voices(vec![
            Voice {
                name: "Samantha".into(),
                lang: "en-US".into(),
                is_default: true,
            },
            Voice {
                name: "Kalpana".into(),
                lang: "hi-IN".into(),
                is_default: false,
            },
        ]);
        let speaker = Speaker::new(Box::new(synth));

        speaker.speak("namaste", "hi");
        let calls = spoken.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.as_deref(), Some("hi-IN"));
    }

    #[test]
    fn test_empty_text_is_a_no_op() {
        let (synth, spoken, cancels) = FakeSynth::with_voices(vec![]);
        let speaker = Speaker::new(Box::new(synth));

        speaker.speak("", "en");
        assert!(spoken.lock().unwrap().is_empty());
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
    }
}
