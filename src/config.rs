use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 重试次数上限
pub const MAX_ORACLE_RETRIES: usize = 10;

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".keyward")
}

/// 校验服务后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    /// 本地 Ollama 模型
    Ollama,
    /// 本地规则，无需网络
    Rules,
}

/// 校验服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub backend: OracleBackend,
    pub model: String,
    pub base_url: String,
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            backend: OracleBackend::Ollama,
            model: std::env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| "qwen3:4b-instruct-2507-q4_K_M".to_string()),
            base_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

/// 用户库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub session_ttl_hours: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            db_path: base_dir().join("users_db.json"),
            session_ttl_hours: 24,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// 统一配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败：{}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        base_dir().join("config.toml")
    }

    /// 从默认位置加载配置
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.session_ttl_hours == 0 {
            bail!("store.session_ttl_hours 必须大于 0");
        }
        if self.oracle.max_retries == 0 || self.oracle.max_retries > MAX_ORACLE_RETRIES {
            bail!("oracle.max_retries 必须在 1 到 {} 之间", MAX_ORACLE_RETRIES);
        }
        if self.oracle.timeout_secs == 0 {
            bail!("oracle.timeout_secs 必须大于 0");
        }
        if self.oracle.backend == OracleBackend::Ollama && self.oracle.model.trim().is_empty() {
            bail!("oracle.model 不能为空");
        }
        Ok(())
    }

    /// 确保用户库所在目录存在
    pub fn ensure_store_dir(&self) -> Result<()> {
        if let Some(parent) = self.store.db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
