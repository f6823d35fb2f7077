use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(serde::Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub database: DBConfig,
    pub email_client: EmailClientConfig,
    pub otp: OtpConfig,
}

#[derive(serde::Deserialize)]
pub struct WebConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

impl WebConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize)]
pub struct DBConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub db_name: String,
    pub require_ssl: bool,
}

impl DBConfig {
    /// 连接postgres实例，不指定数据库
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.expose_secret())
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.db_name)
    }
}

#[derive(serde::Deserialize)]
pub struct EmailClientConfig {
    pub base_url: String,
    pub sender: String,
    pub authorization_token: SecretString,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize)]
pub struct OtpConfig {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_seconds: u32,
}

impl OtpConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.ttl_seconds))
    }
}

/// 读取配置
///
/// 依次读取`config.yaml`、`APP_`前缀的环境变量（`__`分隔嵌套字段），
/// 最后由`PORT`覆盖监听端口
pub fn config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::new("config.yaml", config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("web.port", std::env::var("PORT").ok())?
        .build()?
        .try_deserialize::<Config>()
}
