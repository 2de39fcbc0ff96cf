//! Pipeline configuration loaded from `crew.toml`.
//!
//! Credentials are never stored in the file. The file names the environment
//! variables that hold them, and [`Credentials::from_env`] reads those once at
//! startup so the values can be passed explicitly to the backend.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::agents::ModelSlot;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "crew.toml";

/// Which agent backend answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Google Generative Language API.
    Gemini,
    /// Any CLI that reads a prompt on stdin and answers on stdout.
    Command,
}

/// Pipeline configuration (TOML). Missing fields take defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CrewConfig {
    pub backend: BackendKind,

    /// Wall-clock limit for a single agent call.
    pub request_timeout_secs: u64,

    /// Discard backend output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Maximum bytes for a rendered prompt before context is dropped.
    pub prompt_budget_bytes: usize,

    /// Language the developer agent is asked to write.
    pub language: String,

    pub models: ModelsConfig,
    pub gemini: GeminiConfig,
    pub command: CommandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelsConfig {
    pub primary: ModelConfig,
    pub lite: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model identifier passed to the backend.
    pub name: String,
    /// Environment variable holding the API key for this model.
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Program and arguments, e.g. `["codex", "exec", "-"]`.
    pub argv: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: ModelConfig {
                name: "gemini-2.5-flash".to_string(),
                api_key_env: "GOOGLE_API_KEY".to_string(),
            },
            lite: ModelConfig {
                name: "gemini-2.5-flash-lite".to_string(),
                api_key_env: "GOOGLE_API_KEY2".to_string(),
            },
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            argv: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
                "-".to_string(),
            ],
        }
    }
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            request_timeout_secs: 5 * 60,
            output_limit_bytes: 200_000,
            prompt_budget_bytes: 60_000,
            language: "Python".to_string(),
            models: ModelsConfig::default(),
            gemini: GeminiConfig::default(),
            command: CommandConfig::default(),
        }
    }
}

impl CrewConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.language.trim().is_empty() {
            return Err(anyhow!("language must be non-empty"));
        }
        for (slot, model) in [
            ("primary", &self.models.primary),
            ("lite", &self.models.lite),
        ] {
            if model.name.trim().is_empty() {
                return Err(anyhow!("models.{slot}.name must be non-empty"));
            }
        }
        match self.backend {
            BackendKind::Gemini => {
                if self.gemini.base_url.trim().is_empty() {
                    return Err(anyhow!("gemini.base_url must be non-empty"));
                }
            }
            BackendKind::Command => {
                if self.command.argv.is_empty() || self.command.argv[0].trim().is_empty() {
                    return Err(anyhow!("command.argv must be a non-empty array"));
                }
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model(&self, slot: ModelSlot) -> &ModelConfig {
        match slot {
            ModelSlot::Primary => &self.models.primary,
            ModelSlot::Lite => &self.models.lite,
        }
    }
}

/// API keys resolved once at startup, one per model slot.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    primary: String,
    lite: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("primary", &"<redacted>")
            .field("lite", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(primary: impl Into<String>, lite: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            lite: lite.into(),
        }
    }

    /// Read both keys from the environment variables named in `cfg`.
    pub fn from_env(cfg: &CrewConfig) -> Result<Self> {
        Self::from_lookup(cfg, |name| std::env::var(name).ok())
    }

    /// Resolve keys through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(cfg: &CrewConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |model: &ModelConfig| -> Result<String> {
            lookup(&model.api_key_env)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("missing API key: set {}", model.api_key_env))
        };
        Ok(Self {
            primary: read(&cfg.models.primary)?,
            lite: read(&cfg.models.lite)?,
        })
    }

    pub fn key(&self, slot: ModelSlot) -> &str {
        match slot {
            ModelSlot::Primary => &self.primary,
            ModelSlot::Lite => &self.lite,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CrewConfig::default()`.
pub fn load_config(path: &Path) -> Result<CrewConfig> {
    if !path.exists() {
        let cfg = CrewConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CrewConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CrewConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, CrewConfig::default());
    }

    #[test]
    fn write_then_load_keeps_command_backend() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("crew.toml");
        let cfg = CrewConfig {
            backend: BackendKind::Command,
            command: CommandConfig {
                argv: vec!["cat".to_string()],
            },
            ..CrewConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("crew.toml");
        fs::write(
            &path,
            "language = \"Rust\"\n[models.lite]\nname = \"tiny\"\napi_key_env = \"TINY_KEY\"\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.language, "Rust");
        assert_eq!(cfg.model(ModelSlot::Lite).name, "tiny");
        assert_eq!(cfg.model(ModelSlot::Primary).name, "gemini-2.5-flash");
        assert_eq!(cfg.backend, BackendKind::Gemini);
    }

    #[test]
    fn rejects_empty_command_argv() {
        let cfg = CrewConfig {
            backend: BackendKind::Command,
            command: CommandConfig { argv: Vec::new() },
            ..CrewConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("command.argv"));
    }

    #[test]
    fn credentials_come_from_named_variables() {
        let cfg = CrewConfig::default();
        let creds = Credentials::from_lookup(&cfg, |name| match name {
            "GOOGLE_API_KEY" => Some("key-1".to_string()),
            "GOOGLE_API_KEY2" => Some("key-2".to_string()),
            _ => None,
        })
        .expect("credentials");

        assert_eq!(creds.key(ModelSlot::Primary), "key-1");
        assert_eq!(creds.key(ModelSlot::Lite), "key-2");
        assert!(!format!("{creds:?}").contains("key-1"));
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let cfg = CrewConfig::default();
        let err = Credentials::from_lookup(&cfg, |name| {
            (name == "GOOGLE_API_KEY").then(|| "key-1".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY2"));
    }
}
