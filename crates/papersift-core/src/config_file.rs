use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration. Every field is optional; unset values fall
/// back to [`Config::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub ocr: Option<OcrConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backend_url: Option<String>,
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub query_context_chars: Option<usize>,
    pub verbose_context_chars: Option<usize>,
    pub summary_min_chars: Option<usize>,
    pub abstract_display_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub tesseract_cmd: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

/// Platform config path: `<config_dir>/papersift/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("papersift").join("config.toml"))
}

/// Load the platform config with `./.papersift.toml` layered on top.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".papersift.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// `None` if the file is missing or unparseable.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs field by field; `overlay` wins where both are set.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        model: Some(ModelConfig {
            backend_url: pick(&overlay.model, &base.model, |m| m.backend_url.clone()),
            ollama_url: pick(&overlay.model, &base.model, |m| m.ollama_url.clone()),
            model: pick(&overlay.model, &base.model, |m| m.model.clone()),
            timeout_secs: pick(&overlay.model, &base.model, |m| m.timeout_secs),
        }),
        pipeline: Some(PipelineConfig {
            query_context_chars: pick(&overlay.pipeline, &base.pipeline, |p| p.query_context_chars),
            verbose_context_chars: pick(&overlay.pipeline, &base.pipeline, |p| {
                p.verbose_context_chars
            }),
            summary_min_chars: pick(&overlay.pipeline, &base.pipeline, |p| p.summary_min_chars),
            abstract_display_chars: pick(&overlay.pipeline, &base.pipeline, |p| {
                p.abstract_display_chars
            }),
        }),
        ocr: Some(OcrConfig {
            tesseract_cmd: pick(&overlay.ocr, &base.ocr, |o| o.tesseract_cmd.clone()),
            language: pick(&overlay.ocr, &base.ocr, |o| o.language.clone()),
        }),
        server: Some(ServerConfig {
            bind: pick(&overlay.server, &base.server, |s| s.bind.clone()),
        }),
    }
}

/// Fill a [`Config`] from file values, defaulting everything unset.
pub fn resolve(file: &ConfigFile) -> Config {
    let mut config = Config::default();

    if let Some(m) = &file.model {
        if let Some(v) = &m.backend_url {
            config.backend_url = v.clone();
        }
        if let Some(v) = &m.ollama_url {
            config.ollama_url = v.clone();
        }
        if let Some(v) = &m.model {
            config.model = v.clone();
        }
        config.request_timeout_secs = m.timeout_secs.or(config.request_timeout_secs);
    }
    if let Some(p) = &file.pipeline {
        config.query_context_chars = p.query_context_chars.unwrap_or(config.query_context_chars);
        config.verbose_context_chars = p
            .verbose_context_chars
            .unwrap_or(config.verbose_context_chars);
        config.summary_min_chars = p.summary_min_chars.unwrap_or(config.summary_min_chars);
        config.abstract_display_chars = p
            .abstract_display_chars
            .unwrap_or(config.abstract_display_chars);
    }
    if let Some(o) = &file.ocr {
        if let Some(v) = &o.tesseract_cmd {
            config.tesseract_cmd = v.clone();
        }
        if let Some(v) = &o.language {
            config.ocr_language = v.clone();
        }
    }
    if let Some(bind) = file.server.as_ref().and_then(|s| s.bind.clone()) {
        config.bind = bind;
    }
    config
}

/// Write `config` to the platform config path, creating its directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let toml_str = "[model]\nmodel = \"llama3:8b\"\n\n[ocr]\nlanguage = \"deu\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.model.as_ref().unwrap().model.as_deref(), Some("llama3:8b"));
        assert!(parsed.model.unwrap().backend_url.is_none());
        assert!(parsed.pipeline.is_none());
    }

    #[test]
    fn merge_overlay_wins_and_base_fills_gaps() {
        let base = ConfigFile {
            model: Some(ModelConfig {
                model: Some("gemma:2b".into()),
                ollama_url: Some("http://gpu-box:11434".into()),
                ..Default::default()
            }),
            pipeline: Some(PipelineConfig {
                summary_min_chars: Some(80),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            model: Some(ModelConfig {
                model: Some("mistral".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge(base, overlay);
        let model = merged.model.unwrap();
        assert_eq!(model.model.as_deref(), Some("mistral"));
        assert_eq!(model.ollama_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(merged.pipeline.unwrap().summary_min_chars, Some(80));
    }

    #[test]
    fn resolve_applies_file_over_defaults() {
        let file: ConfigFile = toml::from_str(
            "[model]\ntimeout_secs = 30\n[pipeline]\nabstract_display_chars = 200\n[server]\nbind = \"127.0.0.1:8080\"\n",
        )
        .unwrap();
        let config = resolve(&file);
        assert_eq!(config.request_timeout_secs, Some(30));
        assert_eq!(config.abstract_display_chars, 200);
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.query_context_chars, 4000);
        assert_eq!(config.model, crate::DEFAULT_MODEL);
    }

    #[test]
    fn missing_or_broken_files_load_as_none() {
        let dir = std::env::temp_dir().join(format!("papersift-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let broken = dir.join("broken.toml");
        std::fs::write(&broken, "[model\nmodel = ").unwrap();

        assert!(load_from_path(&dir.join("absent.toml")).is_none());
        assert!(load_from_path(&broken).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
