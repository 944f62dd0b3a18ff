use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::error::ChatError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const EXAMPLE_CONFIG: &str = r#"# ai-chat configuration

# Each provider is an OpenAI-compatible chat-completion endpoint.
# api_key may be left empty and supplied through <NAME>_API_KEY instead.
[providers.openai]
api_key = ""
base_url = "https://api.openai.com/v1"
model = "gpt-4o"
max_tokens = 4096

[providers.deepseek]
api_key = ""
base_url = "https://api.deepseek.com/v1"
model = "deepseek-chat"
max_tokens = 4096

[advanced]
save_history = false
history_length = 10

[logging]
# Used when RUST_LOG is not set: error, warn, info, debug, trace
level = "warn"
# Log outgoing request bodies at info level
requests = false

[preference]
# "en" or "zh"; defaults to the LANG environment variable
# language = "en"
"#;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub advanced: AdvancedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub preference: PreferenceConfig,
}

/// Connection settings for one named backend. Empty strings and a zero
/// token limit mean "use the built-in default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Not applied: transcripts are never written to disk.
    pub save_history: bool,
    /// Not applied: the in-memory transcript is unbounded.
    pub history_length: u32,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            save_history: false,
            history_length: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            requests: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PreferenceConfig {
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Set,
    Env,
    Missing,
}

/// Environment variable consulted when a provider has no key in the file,
/// e.g. `free-oai` -> `FREE_OAI_API_KEY`.
pub fn env_key_name(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"))
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn load() -> Result<Self> {
        // 1. Check path specified by environment variable
        if let Ok(path) = env::var("AI_CHAT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        // 2. Check XDG config directory
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        // 3. Fall back to an empty configuration
        Ok(Self::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ai-chat-cli").join("config.toml"))
    }

    /// File that `config init` and `config set` write to.
    pub fn target_path() -> Result<PathBuf> {
        if let Ok(path) = env::var("AI_CHAT_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        Self::default_path().context("could not determine the user config directory")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Every configured provider name with whether a key is available.
    pub fn provider_keys(&self) -> Vec<(String, bool)> {
        self.provider_keys_with(&process_env)
    }

    pub fn key_status(&self, name: &str) -> KeyStatus {
        self.key_status_with(name, &process_env)
    }

    /// Picks the provider for this session: the requested one, or else the
    /// first (by name) that has a key.
    pub fn select_provider(
        &self,
        requested: Option<&str>,
    ) -> Result<(String, ProviderConfig), ChatError> {
        self.select_provider_with(requested, &process_env)
    }

    /// Looks up a provider, filling a missing key from the environment.
    fn provider_with(
        &self,
        name: &str,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ProviderConfig, ChatError> {
        let mut provider = self.providers.get(name).cloned().ok_or_else(|| {
            let available: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            let available = if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            };
            ChatError::config(format!(
                "provider '{name}' not found (available: {available})"
            ))
        })?;
        if provider.api_key.is_empty() {
            if let Some(key) = env(&env_key_name(name)) {
                provider.api_key = key;
            }
        }
        Ok(provider)
    }

    fn key_status_with(&self, name: &str, env: &dyn Fn(&str) -> Option<String>) -> KeyStatus {
        match self.providers.get(name) {
            Some(p) if !p.api_key.is_empty() => KeyStatus::Set,
            Some(_) if env(&env_key_name(name)).is_some() => KeyStatus::Env,
            _ => KeyStatus::Missing,
        }
    }

    fn provider_keys_with(&self, env: &dyn Fn(&str) -> Option<String>) -> Vec<(String, bool)> {
        self.providers
            .keys()
            .map(|name| {
                let present = self.key_status_with(name, env) != KeyStatus::Missing;
                (name.clone(), present)
            })
            .collect()
    }

    fn select_provider_with(
        &self,
        requested: Option<&str>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(String, ProviderConfig), ChatError> {
        let name = match requested {
            Some(name) => name.to_string(),
            None => {
                let first = self
                    .provider_keys_with(env)
                    .into_iter()
                    .find(|(_, present)| *present)
                    .map(|(name, _)| name);
                match first {
                    Some(name) => {
                        tracing::info!(provider = %name, "auto-selected provider");
                        name
                    }
                    None => {
                        return Err(ChatError::config(
                            "no provider with an API key is configured; run `ai-chat config init` and set an api_key",
                        ));
                    }
                }
            }
        };

        let provider = self.provider_with(&name, env)?;
        if provider.api_key.is_empty() {
            return Err(ChatError::config(format!(
                "API key for provider '{name}' is not set; run `ai-chat config set providers.{name}.api_key YOUR_API_KEY` or export {}",
                env_key_name(&name)
            )));
        }
        Ok((name, provider))
    }
}

/// Writes the example configuration, refusing to overwrite an existing file.
pub fn write_example(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("config file already exists: {}", path.display());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }
    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Sets a dotted key such as `providers.openai.model` in the file at `path`,
/// creating the file and intermediate tables as needed.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut table: toml::Table = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        content
            .parse()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        toml::Table::new()
    };

    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        bail!("invalid config key: {key:?}");
    }
    let (leaf, parents) = segments
        .split_last()
        .with_context(|| format!("invalid config key: {key:?}"))?;

    let mut current = &mut table;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(t) => t,
            _ => bail!("config key {segment:?} in {key:?} is not a table"),
        };
    }
    current.insert(leaf.to_string(), typed_value(value));

    let rendered = toml::to_string_pretty(&table).context("Failed to serialize config")?;
    toml::from_str::<Config>(&rendered)
        .with_context(|| format!("{key} = {value} does not fit the config schema"))?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }
    fs::write(path, rendered)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn typed_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        toml::Value::Integer(n)
    } else {
        toml::Value::String(raw.to_string())
    }
}
