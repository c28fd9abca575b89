//! Hub configuration management
//! Handles loading, saving, and environment overrides for the config file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "GBSTUDIO_HUB_CONFIG";

/// GB Studio Hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// Directory holding index.html and the browser client
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Image generator settings
    #[serde(default)]
    pub comfyui: ComfyUiConfig,

    /// Generation pipeline settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// GB Studio project settings
    #[serde(default)]
    pub project: ProjectConfig,
}

fn default_db_path() -> String {
    "~/.gbstudio-hub/gbstudio_hub.db".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            static_dir: default_static_dir(),
            server: ServerConfig::default(),
            ollama: OllamaConfig::default(),
            comfyui: ComfyUiConfig::default(),
            generation: GenerationConfig::default(),
            project: ProjectConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server, without the /api/generate suffix
    #[serde(default = "default_ollama_url")]
    pub api_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_ollama_timeout() -> u64 {
    300
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComfyUiConfig {
    #[serde(default = "default_comfyui_url")]
    pub api_url: String,
    /// ComfyUI installation root; generated images land in `<path>/output`
    #[serde(default = "default_comfyui_path")]
    pub path: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

fn default_comfyui_url() -> String {
    "http://127.0.0.1:8188".to_string()
}

fn default_comfyui_path() -> String {
    "~/ComfyUI".to_string()
}

fn default_client_id() -> String {
    "gbstudio_hub".to_string()
}

impl Default for ComfyUiConfig {
    fn default() -> Self {
        Self {
            api_url: default_comfyui_url(),
            path: default_comfyui_path(),
            client_id: default_client_id(),
        }
    }
}

/// Workflow template and polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,
    #[serde(default = "default_template")]
    pub default_template: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// Node whose `inputs.text` receives the positive prompt
    #[serde(default = "default_positive_node")]
    pub positive_node: String,
    /// Node whose `inputs.text` receives the negative prompt, when present
    #[serde(default = "default_negative_node")]
    pub negative_node: String,
    /// SaveImage node reported in the history endpoint
    #[serde(default = "default_output_node")]
    pub output_node: String,
}

fn default_workflows_dir() -> String {
    "workflows".to_string()
}

fn default_template() -> String {
    "workflow_pixel_art".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_generation_timeout() -> u64 {
    15 * 60
}

fn default_positive_node() -> String {
    "6".to_string()
}

fn default_negative_node() -> String {
    "7".to_string()
}

fn default_output_node() -> String {
    "9".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            default_template: default_template(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_generation_timeout(),
            positive_node: default_positive_node(),
            negative_node: default_negative_node(),
            output_node: default_output_node(),
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root of the GB Studio project (contains the .gbsproj file)
    #[serde(default = "default_project_path")]
    pub path: String,
    #[serde(default = "default_gbs_cli")]
    pub gbs_cli_path: String,
    #[serde(default)]
    pub emulator_path: String,
}

fn default_project_path() -> String {
    "project_files".to_string()
}

fn default_gbs_cli() -> String {
    "gb-studio-cli".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            path: default_project_path(),
            gbs_cli_path: default_gbs_cli(),
            emulator_path: String::new(),
        }
    }
}

impl Config {
    /// Load config from the default location or specified path, then apply
    /// `.env` and environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        let mut config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config =
                serde_yaml::from_str(&raw).context("Failed to parse config file")?;
            debug!("Loaded config from {:?}", config_path);
            config
        } else {
            debug!("Config file not found at {:?}, using defaults", config_path);
            Config::default()
        };

        // A missing .env is the common case
        if let Ok(env_file) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", env_file);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save config to the resolved location
    pub fn save(&self, path: Option<&str>) -> Result<PathBuf> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(config_path)
    }

    /// Get the config file path
    pub fn config_path(path: Option<&str>) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".gbstudio-hub").join("config.yml"))
    }

    /// Apply overrides using the `.env` variable names (`GB_PROJECT_PATH`, ...).
    /// The lookup is injected so tests do not have to touch process env.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!("Config override from {}", key);
                *target = value;
            }
        };

        set(&mut self.project.path, "GB_PROJECT_PATH");
        set(&mut self.comfyui.path, "COMFYUI_PATH");
        set(&mut self.project.gbs_cli_path, "GBS_CLI_PATH");
        set(&mut self.project.emulator_path, "EMULATOR_PATH");
        set(&mut self.ollama.api_url, "OLLAMA_API_URL");
        set(&mut self.ollama.model, "OLLAMA_MODEL");
        set(&mut self.comfyui.api_url, "COMFYUI_API_URL");
        set(&mut self.database_path, "GBSTUDIO_HUB_DB");

        // Older .env files point straight at the generate endpoint
        if let Some(base) = self.ollama.api_url.strip_suffix("/api/generate") {
            self.ollama.api_url = base.to_string();
        }
    }

    /// Resolve database path (expand ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }

    pub fn project_root(&self) -> Result<PathBuf> {
        expand_home(&self.project.path)
    }

    pub fn workflows_dir(&self) -> Result<PathBuf> {
        expand_home(&self.generation.workflows_dir)
    }

    pub fn static_dir(&self) -> Result<PathBuf> {
        expand_home(&self.static_dir)
    }

    /// Directory where ComfyUI writes generated images
    pub fn comfyui_output_path(&self) -> Result<PathBuf> {
        Ok(expand_home(&self.comfyui.path)?.join("output"))
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(raw: &str) -> Result<PathBuf> {
    if raw == "~" || raw.starts_with("~/") {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        let rest = raw.trim_start_matches('~').trim_start_matches('/');
        return Ok(home.join(rest));
    }
    Ok(Path::new(raw).to_path_buf())
}
