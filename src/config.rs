// src/config.rs
//! Runtime configuration: one TOML file plus a few environment overrides.
//! A missing file means built-in defaults; a present-but-broken file is a
//! startup error.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/newsdesk.toml";

pub const ENV_CONFIG_PATH: &str = "NEWSDESK_CONFIG_PATH";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub ai: AiSection,
    pub language: LanguageSection,
    pub pdf: PdfSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:newsdesk.db?mode=rwc".to_string(),
        }
    }
}

/// Endpoints and credentials for the AI gateway. The bases are plain URLs so
/// tests can point them at a local mock server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSection {
    /// "ENV" means: read from OPENAI_API_KEY at load time.
    pub api_key: String,
    pub chat_model: String,
    pub chat_url: String,
    pub image_url: String,
    pub translate_url: String,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            api_key: "ENV".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
            image_url: "https://api.openai.com/v1/images/generations".to_string(),
            translate_url: "https://translate.googleapis.com/translate_a/single".to_string(),
        }
    }
}

/// The operator's language pair. `source`/`target` are codes for the machine
/// translator; `target_name` is the human name woven into generative prompts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageSection {
    pub source: String,
    pub target: String,
    pub target_name: String,
}

impl Default for LanguageSection {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "fa".to_string(),
            target_name: "Persian".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSection {
    /// Optional TTF to embed; without it a builtin Latin font is used.
    pub font_path: Option<String>,
    /// Reverse each rendered line (right-to-left scripts).
    pub rtl: bool,
}

impl Default for PdfSection {
    fn default() -> Self {
        Self {
            font_path: None,
            rtl: true,
        }
    }
}

impl AppConfig {
    /// Resolve the config path (NEWSDESK_CONFIG_PATH or the default), load it,
    /// then apply env overrides. A missing file falls back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from_path(&path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// File-only load; env overrides are `load`'s business.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s)
                .with_context(|| format!("parse config at {}", path.display())),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    /// Parse from a TOML string; no env resolution.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    /// DATABASE_URL wins over the file; an api_key of "ENV" resolves to
    /// OPENAI_API_KEY (empty when unset -- the gateway then degrades instead
    /// of the server refusing to start).
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
        if self.ai.api_key.trim().eq_ignore_ascii_case("env") {
            self.ai.api_key = env::var(ENV_OPENAI_API_KEY).unwrap_or_default();
        }
    }
}

/* ----------------------------
Tests
---------------------------- */
