// Voice catalog: groups installed synthesis voices by language and applies
// the voice selection precedence used for spoken playback.

use serde::Serialize;

/// One installed synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP-47-ish tag, e.g. "hi-IN", "en-US", or a bare "hi".
    pub lang: String,
    pub is_default: bool,
}

/// One language offered for display/playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOption {
    pub code: String,
    pub display_name: String,
    pub has_native_voice: bool,
}

/// Languages always offered for translation even when the device has no
/// matching synthesis voice.
pub const SUPPLEMENTARY_CODES: &[&str] = &[
    "hi", "ar", "bn", "ko", "fa", "vi", "tr", "th", "sw", "ur", "uk", "ta", "te", "ml", "mr",
    "kn", "id", "ms", "fil", "he", "el", "cs", "pl", "hu", "ro", "bg", "sr", "hr", "sk", "sl",
    "da", "fi", "no", "sv",
];

/// Preferred full region tag per bare code. Region-exact matches against
/// this table win over any other variant of the same code.
const PREFERRED_REGIONS: &[(&str, &str)] = &[
    ("en", "en-US"),
    ("es", "es-ES"),
    ("fr", "fr-FR"),
    ("de", "de-DE"),
    ("it", "it-IT"),
    ("pt", "pt-BR"),
    ("ru", "ru-RU"),
    ("zh", "zh-CN"),
    ("ja", "ja-JP"),
    ("ko", "ko-KR"),
    ("hi", "hi-IN"),
    ("ar", "ar-SA"),
    ("bn", "bn-IN"),
    ("ta", "ta-IN"),
    ("te", "te-IN"),
    ("ml", "ml-IN"),
    ("mr", "mr-IN"),
    ("kn", "kn-IN"),
    ("ur", "ur-PK"),
    ("sv", "sv-SE"),
    ("da", "da-DK"),
    ("el", "el-GR"),
    ("he", "he-IL"),
    ("vi", "vi-VN"),
    ("uk", "uk-UA"),
    ("cs", "cs-CZ"),
];

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("hi", "Hindi"),
    ("ar", "Arabic"),
    ("bn", "Bengali"),
    ("ko", "Korean"),
    ("fa", "Persian"),
    ("vi", "Vietnamese"),
    ("tr", "Turkish"),
    ("th", "Thai"),
    ("sw", "Swahili"),
    ("ur", "Urdu"),
    ("uk", "Ukrainian"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("kn", "Kannada"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("fil", "Filipino"),
    ("he", "Hebrew"),
    ("el", "Greek"),
    ("cs", "Czech"),
    ("pl", "Polish"),
    ("hu", "Hungarian"),
    ("ro", "Romanian"),
    ("bg", "Bulgarian"),
    ("sr", "Serbian"),
    ("hr", "Croatian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("no", "Norwegian"),
    ("sv", "Swedish"),
    ("nl", "Dutch"),
];

pub fn display_name(code: &str) -> String {
    DISPLAY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Bare language code of a voice tag: "hi-IN" -> "hi".
pub fn lang_code(tag: &str) -> String {
    tag.split('-').next().unwrap_or(tag).to_ascii_lowercase()
}

fn preferred_region(code: &str) -> Option<&'static str> {
    PREFERRED_REGIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, tag)| *tag)
}

/// Pick the voice used to speak text in `code`.
///
/// Precedence is a hard contract:
/// 1. exact preferred-region match (e.g. "hi-IN" for code "hi")
/// 2. any region variant of the code
/// 3. a bare-code voice
/// 4. the synthesizer's default voice
pub fn select_voice<'a>(voices: &'a [Voice], code: &str) -> Option<&'a Voice> {
    let code = code.to_ascii_lowercase();

    if let Some(preferred) = preferred_region(&code) {
        if let Some(voice) = voices
            .iter()
            .find(|v| v.lang.eq_ignore_ascii_case(preferred))
        {
            return Some(voice);
        }
    }

    if let Some(voice) = voices
        .iter()
        .find(|v| lang_code(&v.lang) == code && v.lang.contains('-'))
    {
        return Some(voice);
    }

    if let Some(voice) = voices.iter().find(|v| lang_code(&v.lang) == code) {
        return Some(voice);
    }

    voices.iter().find(|v| v.is_default)
}

/// Enumerate languages derivable from the installed voices, plus the
/// supplementary list with `has_native_voice = false` where no voice
/// exists. Sorted by display name; stable under repeated calls.
pub fn list_languages(voices: &[Voice]) -> Vec<LanguageOption> {
    let mut options: Vec<LanguageOption> = Vec::new();

    for voice in voices {
        let code = lang_code(&voice.lang);
        if code.is_empty() {
            continue;
        }
        if !options.iter().any(|o| o.code == code) {
            options.push(LanguageOption {
                display_name: display_name(&code),
                code,
                has_native_voice: true,
            });
        }
    }

    for code in SUPPLEMENTARY_CODES {
        if !options.iter().any(|o| o.code == *code) {
            options.push(LanguageOption {
                code: (*code).to_string(),
                display_name: display_name(code),
                has_native_voice: false,
            });
        }
    }

    options.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    options
}
