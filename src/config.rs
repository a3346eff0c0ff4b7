// config.rs — API 配置的加载与持久化

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "camera_api_config.json";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ApiConfig {
    /// 没保存过 key 之前禁止触发生成。
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// 带类型的加载结果：缺失和损坏都不会把异常抛进核心逻辑。
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLoad {
    Loaded(ApiConfig),
    Absent,
    Corrupt(String),
}

impl ConfigLoad {
    /// 缺失/损坏回退到默认配置。
    pub fn into_config(self) -> ApiConfig {
        match self {
            Self::Loaded(c) => c,
            Self::Absent | Self::Corrupt(_) => ApiConfig::default(),
        }
    }
}

/// 查找配置文件：
/// 1) <exe_dir>/camera_api_config.json
/// 2) ./camera_api_config.json
fn find_config_file() -> Option<PathBuf> {
    for p in candidate_paths() {
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            out.push(dir.join(CONFIG_FILE));
        }
    }
    out.push(PathBuf::from(CONFIG_FILE));
    out
}

pub fn parse(text: &str) -> ConfigLoad {
    match serde_json::from_str::<ApiConfig>(text) {
        Ok(c) => ConfigLoad::Loaded(c),
        Err(e) => ConfigLoad::Corrupt(e.to_string()),
    }
}

pub fn load() -> ConfigLoad {
    let Some(path) = find_config_file() else {
        return ConfigLoad::Absent;
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => parse(&text),
        Err(e) => ConfigLoad::Corrupt(e.to_string()),
    }
}

/// 写回原位置；从未保存过就写到 exe 同目录，失败再退回工作目录。
pub fn save(config: &ApiConfig) -> std::io::Result<PathBuf> {
    let text = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if let Some(path) = find_config_file() {
        std::fs::write(&path, &text)?;
        return Ok(path);
    }

    let mut last_err = None;
    for p in candidate_paths() {
        match std::fs::write(&p, &text) {
            Ok(()) => return Ok(p),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "no writable location")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ApiConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.model, DEFAULT_MODEL);
        assert!(!c.has_key());
    }

    #[test]
    fn parse_roundtrip_uses_storage_field_names() {
        let c = ApiConfig {
            base_url: "https://example.test".into(),
            api_key: "k".into(),
            model: "m".into(),
        };
        let text = serde_json::to_string(&c).unwrap();
        // 与原存储格式保持同名字段
        assert!(text.contains("\"baseUrl\""));
        assert!(text.contains("\"apiKey\""));
        assert_eq!(parse(&text), ConfigLoad::Loaded(c));
    }

    #[test]
    fn parse_corrupt_is_typed_not_thrown() {
        match parse("{not json") {
            ConfigLoad::Corrupt(_) => {}
            other => panic!("expected Corrupt, got {other:?}"),
        }
        assert_eq!(parse("{not json").into_config(), ApiConfig::default());
    }

    #[test]
    fn absent_falls_back_to_default() {
        assert_eq!(ConfigLoad::Absent.into_config(), ApiConfig::default());
    }

    #[test]
    fn key_presence_gates_generation() {
        let mut c = ApiConfig::default();
        assert!(!c.has_key());
        c.api_key = "   ".into();
        assert!(!c.has_key());
        c.api_key = "sk-123".into();
        assert!(c.has_key());
    }
}
