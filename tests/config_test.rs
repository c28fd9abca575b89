// Tests for config loading and environment overrides

use std::collections::HashMap;
use std::path::PathBuf;

use tempfile::TempDir;

use gbstudio_hub::config::{expand_home, Config};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.generation.positive_node, "6");
    assert_eq!(config.generation.poll_interval().as_millis(), 2000);
    assert_eq!(config.generation.timeout().as_secs(), 900);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let yaml = "server:\n  port: 9100\ngeneration:\n  output_node: \"12\"\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.generation.output_node, "12");
    assert_eq!(config.generation.negative_node, "7");
    assert_eq!(config.ollama.model, "llama3");
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("GB_PROJECT_PATH", "/games/quest"),
        ("COMFYUI_PATH", "/opt/ComfyUI"),
        ("OLLAMA_API_URL", "http://gpu-box:11434/api/generate"),
        ("EMULATOR_PATH", "   "),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.project.path, "/games/quest");
    assert_eq!(config.ollama.api_url, "http://gpu-box:11434");
    assert_eq!(
        config.comfyui_output_path().unwrap(),
        PathBuf::from("/opt/ComfyUI/output")
    );
    // Blank values are ignored
    assert_eq!(config.project.emulator_path, "");
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yml");
    let path_str = path.to_string_lossy().to_string();

    let mut config = Config::default();
    config.server.port = 8123;
    config.generation.default_template = "workflow_background".to_string();
    let written = config.save(Some(&path_str)).unwrap();
    assert_eq!(written, path);

    let loaded = Config::load(Some(&path_str)).unwrap();
    assert_eq!(loaded.server.port, 8123);
    assert_eq!(loaded.generation.default_template, "workflow_background");
}

#[test]
fn test_expand_home() {
    assert_eq!(expand_home("relative/dir").unwrap(), PathBuf::from("relative/dir"));
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home("~/hub.db").unwrap(), home.join("hub.db"));
    }
}
