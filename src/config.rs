use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const CONFIG_DIR_ENV: &str = "INTERVOX_CONFIG_DIR";
const CONFIG_DIR: &str = ".intervox";
const CONFIG_FILE: &str = "config.json";
const API_KEY_XOR_KEY: &[u8] = b"intervox-local-key-v1";

pub const DEFAULT_RECORDING_LANGUAGE: &str = "en";
pub const DEFAULT_DISPLAY_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to resolve config dir: {0}")]
    Resolve(String),

    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Failed to save config: {0}")]
    Save(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recording_language: String,
    pub display_language: String,
    pub assemblyai_api_key_obfuscated: Option<String>,
    pub evaluator_endpoint: Option<String>,
    pub input_device_name: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recording_language: DEFAULT_RECORDING_LANGUAGE.to_string(),
            display_language: DEFAULT_DISPLAY_LANGUAGE.to_string(),
            assemblyai_api_key_obfuscated: None,
            evaluator_endpoint: None,
            input_device_name: None,
        }
    }
}

/// Settings view safe to hand to a UI: the credential appears only masked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsState {
    pub recording_language: String,
    pub display_language: String,
    pub has_api_key: bool,
    pub api_key_masked: Option<String>,
    pub input_device_name: Option<String>,
}

/// Load `.env` overrides once at startup.
pub fn init_env() {
    if dotenvy::dotenv().is_ok() {
        tracing::debug!("Loaded environment from .env");
    }
}

pub fn load_or_create() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        let config = AppConfig::default();
        save_raw(&path, &config)?;
        return Ok(config);
    }

    let raw = fs::read_to_string(&path).map_err(|e| ConfigError::Read(e.to_string()))?;
    match serde_json::from_str::<AppConfig>(&raw) {
        Ok(mut config) => {
            normalize_config(&mut config);
            Ok(config)
        }
        Err(_) => {
            // Unparseable file: keep it aside and start over.
            let backup = path.with_extension("json.bak");
            let _ = fs::copy(&path, backup);
            let config = AppConfig::default();
            save_raw(&path, &config)?;
            Ok(config)
        }
    }
}

pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_raw(&path, config)
}

pub fn settings_state(config: &AppConfig) -> SettingsState {
    SettingsState {
        recording_language: normalize_language(&config.recording_language),
        display_language: normalize_language(&config.display_language),
        has_api_key: config.assemblyai_api_key_obfuscated.is_some(),
        api_key_masked: decode_api_key(config).map(|key| mask_api_key(&key)),
        input_device_name: config.input_device_name.clone(),
    }
}

pub fn set_api_key(config: &mut AppConfig, api_key: &str) {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        config.assemblyai_api_key_obfuscated = None;
    } else {
        config.assemblyai_api_key_obfuscated = Some(obfuscate_api_key(trimmed));
    }
}

/// Resolve the transcription credential: environment wins over the stored
/// obfuscated key.
pub fn resolve_api_key(config: &AppConfig) -> Option<String> {
    std::env::var("ASSEMBLYAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .or_else(|| decode_api_key(config))
}

fn decode_api_key(config: &AppConfig) -> Option<String> {
    config
        .assemblyai_api_key_obfuscated
        .as_deref()
        .and_then(deobfuscate_api_key)
}

fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .map_err(|_| ConfigError::Resolve("no home directory".to_string()))?;
            PathBuf::from(home).join(CONFIG_DIR)
        }
    };
    fs::create_dir_all(&dir).map_err(|e| ConfigError::Resolve(e.to_string()))?;
    Ok(dir.join(CONFIG_FILE))
}

fn save_raw(path: &PathBuf, config: &AppConfig) -> Result<(), ConfigError> {
    let json =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::Save(e.to_string()))?;
    fs::write(path, json).map_err(|e| ConfigError::Save(e.to_string()))
}

fn normalize_config(config: &mut AppConfig) {
    config.recording_language = normalize_language(&config.recording_language);
    config.display_language = normalize_language(&config.display_language);
    config.input_device_name = normalize_device_name(config.input_device_name.take());
}

fn normalize_language(language: &str) -> String {
    let trimmed = language.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        DEFAULT_RECORDING_LANGUAGE.to_string()
    } else {
        trimmed
    }
}

fn normalize_device_name(name: Option<String>) -> Option<String> {
    name.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn obfuscate_api_key(api_key: &str) -> String {
    let mut bytes = api_key.as_bytes().to_vec();
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= API_KEY_XOR_KEY[idx % API_KEY_XOR_KEY.len()];
    }
    BASE64_STANDARD.encode(bytes)
}

fn deobfuscate_api_key(obfuscated: &str) -> Option<String> {
    let mut bytes = BASE64_STANDARD.decode(obfuscated).ok()?;
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= API_KEY_XOR_KEY[idx % API_KEY_XOR_KEY.len()];
    }
    String::from_utf8(bytes).ok()
}

fn mask_api_key(api_key: &str) -> String {
    if api_key.len() <= 10 {
        return "******".to_string();
    }

    let prefix = &api_key[..6];
    let suffix = &api_key[api_key.len().saturating_sub(4)..];
    format!("{}********{}", prefix, suffix)
}
