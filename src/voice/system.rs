// Subprocess-backed speech synthesis: `say` on macOS, `espeak` elsewhere.
// The OS engine is an external collaborator; this adapter only launches it,
// tracks the running child for cancellation, and reads its voice list.

use super::{SpeechSynthesizer, Voice, VoiceError};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

pub struct SystemSynthesizer {
    child: Mutex<Option<Child>>,
}

impl SystemSynthesizer {
    pub fn new() -> Self {
        Self {
            child: Mutex::new(None),
        }
    }

    #[cfg(target_os = "macos")]
    fn spawn_speech(text: &str, voice: Option<&Voice>) -> std::io::Result<Child> {
        let mut cmd = Command::new("say");
        if let Some(v) = voice {
            cmd.arg("-v").arg(&v.name);
        }
        cmd.arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    #[cfg(not(target_os = "macos"))]
    fn spawn_speech(text: &str, voice: Option<&Voice>) -> std::io::Result<Child> {
        let mut cmd = Command::new("espeak");
        if let Some(v) = voice {
            cmd.arg("-v").arg(v.lang.to_ascii_lowercase());
        }
        cmd.arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    fn load_voices() -> Vec<Voice> {
        #[cfg(target_os = "macos")]
        let output = Command::new("say").arg("-v").arg("?").output();
        #[cfg(not(target_os = "macos"))]
        let output = Command::new("espeak").arg("--voices").output();

        let Ok(output) = output else {
            tracing::warn!("Speech engine not found, no native voices available");
            return Vec::new();
        };

        let listing = String::from_utf8_lossy(&output.stdout);
        parse_voice_listing(&listing)
    }
}

impl Default for SystemSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for SystemSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        Self::load_voices()
    }

    fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<(), VoiceError> {
        self.cancel();

        let child = Self::spawn_speech(text, voice)
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        if let Ok(mut guard) = self.child.lock() {
            *guard = Some(child);
        }
        Ok(())
    }

    fn cancel(&self) {
        if let Ok(mut guard) = self.child.lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Parse `say -v ?` / `espeak --voices` output into voices.
///
/// Both formats carry a name column and a language tag column; lines that
/// don't yield a recognizable tag are skipped.
fn parse_voice_listing(listing: &str) -> Vec<Voice> {
    let mut voices = Vec::new();

    for line in listing.lines().skip_while(|l| l.trim_start().starts_with("Pty")) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }

        #[cfg(target_os = "macos")]
        let (name, lang) = (fields[0].to_string(), fields[1].replace('_', "-"));

        #[cfg(not(target_os = "macos"))]
        let (name, lang) = {
            // espeak columns: Pty Language Age/Gender VoiceName File Other
            if fields.len() < 4 {
                continue;
            }
            (fields[3].to_string(), fields[1].to_string())
        };

        if !lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
            || lang.len() < 2
        {
            continue;
        }

        voices.push(Voice {
            name,
            lang,
            is_default: voices.is_empty(),
        });
    }

    voices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_parse_espeak_listing() {
        let listing = "\
Pty Language Age/Gender VoiceName          File          Other Languages
 5  af             M  afrikaans            other/af
 5  en-us          M  english-us           en-us         (en 3)
 5  hi             M  hindi                other/hi
";
        let voices = parse_voice_listing(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].name, "english-us");
        assert_eq!(voices[1].lang, "en-us");
        assert!(voices[0].is_default);
        assert!(!voices[2].is_default);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_parse_say_listing() {
        let listing = "\
Samantha            en_US    # Hello! My name is Samantha.
Lekha               hi_IN    # Hello! My name is Lekha.
";
        let voices = parse_voice_listing(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "Samantha");
        assert_eq!(voices[0].lang, "en-US");
        assert_eq!(voices[1].lang, "hi-IN");
    }
}
