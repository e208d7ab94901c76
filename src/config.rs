use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 为空时允许任意来源
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 金流网关（托管付款页 + 异步回调）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub merchant_id: String,
    /// 与网关共享的签名密钥
    pub hash_key: String,
    pub endpoint: String,
    pub notify_url: String,
    pub return_url: String,
    #[serde(default = "default_gateway_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// 订单事件投递地址，未配置时事件只保留在 outbox 中
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_notifier_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_notifier_batch")]
    pub batch_size: u64,
    #[serde(default = "default_notifier_attempts")]
    pub max_attempts: i32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval_secs: default_notifier_interval(),
            batch_size: default_notifier_batch(),
            max_attempts: default_notifier_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// 管理接口的 Bearer token，为空时管理接口全部拒绝
    #[serde(default)]
    pub api_token: String,
}

fn default_gateway_version() -> String {
    "2.0".to_string()
}

fn default_notifier_interval() -> u64 {
    30
}

fn default_notifier_batch() -> u64 {
    50
}

fn default_notifier_attempts() -> i32 {
    10
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;
                let hash_key = get_env("GATEWAY_HASH_KEY")
                    .ok_or("缺少 GATEWAY_HASH_KEY 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 3000u16),
                        allowed_origins: get_env("ALLOWED_ORIGINS")
                            .map(|v| split_list(&v))
                            .unwrap_or_default(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    gateway: GatewayConfig {
                        merchant_id: get_env("GATEWAY_MERCHANT_ID").unwrap_or_default(),
                        hash_key,
                        endpoint: get_env("GATEWAY_ENDPOINT").unwrap_or_else(|| {
                            "https://ccore.newebpay.com/MPG/mpg_gateway".to_string()
                        }),
                        notify_url: get_env("GATEWAY_NOTIFY_URL").unwrap_or_default(),
                        return_url: get_env("GATEWAY_RETURN_URL").unwrap_or_default(),
                        version: get_env("GATEWAY_VERSION")
                            .unwrap_or_else(default_gateway_version),
                    },
                    notifier: NotifierConfig {
                        endpoint: get_env("NOTIFIER_ENDPOINT"),
                        interval_secs: get_env_parse(
                            "NOTIFIER_INTERVAL_SECS",
                            default_notifier_interval(),
                        ),
                        batch_size: get_env_parse("NOTIFIER_BATCH_SIZE", default_notifier_batch()),
                        max_attempts: get_env_parse(
                            "NOTIFIER_MAX_ATTEMPTS",
                            default_notifier_attempts(),
                        ),
                    },
                    admin: AdminConfig {
                        api_token: get_env("ADMIN_API_TOKEN").unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();

        if config.gateway.hash_key.is_empty() {
            return Err("gateway.hash_key 不能为空".into());
        }

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("ALLOWED_ORIGINS") {
            self.server.allowed_origins = split_list(&v);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("GATEWAY_MERCHANT_ID") {
            self.gateway.merchant_id = v;
        }
        if let Ok(v) = env::var("GATEWAY_HASH_KEY") {
            self.gateway.hash_key = v;
        }
        if let Ok(v) = env::var("GATEWAY_ENDPOINT") {
            self.gateway.endpoint = v;
        }
        if let Ok(v) = env::var("GATEWAY_NOTIFY_URL") {
            self.gateway.notify_url = v;
        }
        if let Ok(v) = env::var("GATEWAY_RETURN_URL") {
            self.gateway.return_url = v;
        }
        if let Ok(v) = env::var("GATEWAY_VERSION") {
            self.gateway.version = v;
        }
        if let Ok(v) = env::var("NOTIFIER_ENDPOINT") {
            self.notifier.endpoint = Some(v);
        }
        if let Ok(v) = env::var("NOTIFIER_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.notifier.interval_secs = n;
        }
        if let Ok(v) = env::var("NOTIFIER_BATCH_SIZE")
            && let Ok(n) = v.parse()
        {
            self.notifier.batch_size = n;
        }
        if let Ok(v) = env::var("NOTIFIER_MAX_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.notifier.max_attempts = n;
        }
        if let Ok(v) = env::var("ADMIN_API_TOKEN") {
            self.admin.api_token = v;
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
