//! 服务配置
//!
//! 查找顺序：`MARKET_HUB_CONFIG` 指定的文件 → `config.toml` →
//! `config/config.toml` → 默认值，最后叠加环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "MARKET_HUB_CONFIG";
pub const PORT_ENV: &str = "MARKET_HUB_PORT";
pub const LOG_LEVEL_ENV: &str = "MARKET_HUB_LOG";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// 服务配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 数据库连接池配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

/// 记录存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// 启动时写入演示产品目录
    pub seed_demo_data: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 5,
            acquire_timeout_seconds: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            seed_demo_data: true,
        }
    }
}

impl HttpConfig {
    /// 监听目标，主机名与 IPv6 字面量交给监听器解析
    pub fn bind_target(&self) -> (&str, u16) {
        (self.bind_address.trim_matches(|c| c == '[' || c == ']'), self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::FileWrite(e.to_string()))?;
        }

        fs::write(path.as_ref(), content).map_err(|e| ConfigError::FileWrite(e.to_string()))
    }

    /// 用环境变量覆盖文件中的值
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::Validation(format!("无效的 {PORT_ENV}: {e}")))?;
        }

        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.database.url = Some(url);
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level.trim().to_ascii_lowercase();
        }

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.http.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Validation("请求超时必须大于0".to_string()));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Validation(format!(
                "min_connections ({}) 不能大于 max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.store.backend == StoreBackend::Postgres
            && self.database.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Validation(
                "postgres 存储需要配置 database.url".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("文件写入错误: {0}")]
    FileWrite(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("配置序列化错误: {0}")]
    Serialize(String),
    #[error("配置验证错误: {0}")]
    Validation(String),
}

/// 配置来源，日志初始化之后再输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSource {
    /// 实际加载的配置文件
    pub path: Option<PathBuf>,
    /// 显式指定但不存在的文件
    pub missing_explicit: Option<PathBuf>,
}

impl ConfigSource {
    pub fn log(&self) {
        if let Some(path) = &self.missing_explicit {
            warn!("{} 指向的文件不存在: {}", CONFIG_PATH_ENV, path.display());
        }
        match &self.path {
            Some(path) => info!("从配置文件加载: {}", path.display()),
            None => info!("未找到配置文件，使用默认配置"),
        }
    }
}

/// 从文件或默认值加载配置，并叠加环境变量
///
/// 此时日志尚未初始化，配置来源由调用方在 `Logger::init` 之后通过
/// [`ConfigSource::log`] 输出。
pub fn load_config() -> Result<(Config, ConfigSource), ConfigError> {
    let source = locate_config(env::var(CONFIG_PATH_ENV).ok());
    let mut config = match &source.path {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    config.apply_env_overrides(|key| env::var(key).ok())?;
    config.validate()?;

    Ok((config, source))
}

pub fn locate_config(explicit: Option<String>) -> ConfigSource {
    let mut source = ConfigSource::default();
    if let Some(explicit) = explicit {
        let path = PathBuf::from(explicit);
        if path.exists() {
            source.path = Some(path);
            return source;
        }
        source.missing_explicit = Some(path);
    }

    source.path = ["config.toml", "./config/config.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists());
    source
}
