//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - 数据库连接
//! - JWT认证
//! - 密码哈希与历史消息分页
//!
//! 加载顺序：内置默认值 -> 可选配置文件（`APP_CONFIG_FILE`）-> 环境变量（`APP_*`，
//! 嵌套字段用 `__` 分隔，例如 `APP_JWT__SECRET`）。

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// 数据库配置
    #[validate(nested)]
    pub database: DatabaseConfig,
    /// JWT认证配置
    #[validate(nested)]
    pub jwt: JwtConfig,
    /// 密码哈希配置
    #[validate(nested)]
    pub security: SecurityConfig,
    /// 历史消息配置
    #[validate(nested)]
    pub history: HistoryConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// 数据库配置
///
/// 未配置 `url` 时进程使用内存存储运行。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    #[validate(length(min = 16))]
    pub secret: String,
    #[validate(range(min = 1))]
    pub expiration_hours: i64,
}

/// 密码哈希配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    #[validate(range(min = 4, max = 31))]
    pub bcrypt_cost: u32,
}

/// 历史消息配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HistoryConfig {
    /// `GET /messages` 返回的最大条数
    #[validate(range(min = 1))]
    pub global_limit: u32,
}

impl Default for AppConfig {
    /// 默认配置使用开发环境版本
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
                cors_origins: vec!["*".into()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "dev-secret-key-not-for-production-use".into(),
                expiration_hours: 24,
            },
            security: SecurityConfig { bcrypt_cost: 10 },
            history: HistoryConfig { global_limit: 200 },
        }
    }
}

impl AppConfig {
    /// 按默认值 -> 配置文件 -> 环境变量的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// 构建带全部配置来源的 figment
    pub fn figment() -> Figment {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: AppConfig = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 返回脱敏后的配置摘要（用于日志）
    pub fn sanitize(&self) -> String {
        let database = match &self.database.url {
            Some(url) => match url.split_once('@') {
                Some((_, host)) => format!("[REDACTED]@{host}"),
                None => "[REDACTED]".to_owned(),
            },
            None => "in-memory".to_owned(),
        };
        format!(
            "server={} database={} jwt.expiration_hours={} bcrypt_cost={} history.global_limit={}",
            self.bind_address(),
            database,
            self.jwt.expiration_hours,
            self.security.bcrypt_cost,
            self.history.global_limit,
        )
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
