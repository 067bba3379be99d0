//! 伺服器設定
//!
//! 全部來自環境變數，遊戲 port 另外可用 `--port` 覆寫。

use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ADMIN_PORT: u16 = 8890;
const DEFAULT_ADMIN_TOKEN: &str = "admin";

/// 設定錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Parse { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Registry 使用的時間參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 配對掃描間隔
    pub matchmaking_interval: Duration,
    /// 單人等待多久改配 bot
    pub bot_wait: Duration,
    /// 斷線掃描間隔
    pub cleanup_interval: Duration,
    /// 斷線多久判負
    pub disconnect_timeout: Duration,
    /// bot 思考時間 (毫秒)
    pub bot_delay_ms: RangeInclusive<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            matchmaking_interval: Duration::from_millis(1000),
            bot_wait: Duration::from_secs(10),
            cleanup_interval: Duration::from_millis(5000),
            disconnect_timeout: Duration::from_secs(30),
            bot_delay_ms: 500..=1500,
        }
    }
}

/// 伺服器設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub admin_port: u16,
    pub admin_auth_token: String,
    pub session: SessionConfig,
    pub bot_search_depth: u32,
    /// 設定時事件以 NDJSON 寫入檔案，否則寫進 log
    pub event_log_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            admin_auth_token: DEFAULT_ADMIN_TOKEN.to_string(),
            session: SessionConfig::default(),
            bot_search_depth: crate::ai::DEFAULT_SEARCH_DEPTH,
            event_log_path: None,
        }
    }
}

impl ServerConfig {
    /// 從行程環境與命令列參數載入
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = env::args().collect();
        Self::from_lookup(|key| env::var(key).ok(), &args)
    }

    /// 以任意查詢函式載入，`args` 只看 `--port`
    pub fn from_lookup<F>(lookup: F, args: &[String]) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let session = &defaults.session;

        let port = match parse_port_from_args(args)? {
            Some(port) => port,
            None => parse_var(&lookup, "PORT", defaults.port)?,
        };

        let config = Self {
            port,
            admin_port: parse_var(&lookup, "ADMIN_PORT", defaults.admin_port)?,
            admin_auth_token: lookup("ADMIN_AUTH_TOKEN").unwrap_or(defaults.admin_auth_token),
            session: SessionConfig {
                matchmaking_interval: Duration::from_millis(parse_var(
                    &lookup,
                    "MATCHMAKING_INTERVAL_MS",
                    session.matchmaking_interval.as_millis() as u64,
                )?),
                bot_wait: Duration::from_secs(parse_var(
                    &lookup,
                    "BOT_WAIT_SECS",
                    session.bot_wait.as_secs(),
                )?),
                cleanup_interval: Duration::from_millis(parse_var(
                    &lookup,
                    "CLEANUP_INTERVAL_MS",
                    session.cleanup_interval.as_millis() as u64,
                )?),
                disconnect_timeout: Duration::from_secs(parse_var(
                    &lookup,
                    "DISCONNECT_TIMEOUT_SECS",
                    session.disconnect_timeout.as_secs(),
                )?),
                bot_delay_ms: parse_var(&lookup, "BOT_DELAY_MIN_MS", *session.bot_delay_ms.start())?
                    ..=parse_var(&lookup, "BOT_DELAY_MAX_MS", *session.bot_delay_ms.end())?,
            },
            bot_search_depth: parse_var(&lookup, "BOT_SEARCH_DEPTH", defaults.bot_search_depth)?,
            event_log_path: lookup("EVENT_LOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// 檢查設定彼此是否一致
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.matchmaking_interval.is_zero() {
            return Err(ConfigError::Validation(
                "MATCHMAKING_INTERVAL_MS must be greater than 0".into(),
            ));
        }
        if session.cleanup_interval.is_zero() {
            return Err(ConfigError::Validation(
                "CLEANUP_INTERVAL_MS must be greater than 0".into(),
            ));
        }
        if session.bot_delay_ms.start() > session.bot_delay_ms.end() {
            return Err(ConfigError::Validation(format!(
                "BOT_DELAY_MIN_MS ({}) exceeds BOT_DELAY_MAX_MS ({})",
                session.bot_delay_ms.start(),
                session.bot_delay_ms.end()
            )));
        }
        if self.bot_search_depth == 0 {
            return Err(ConfigError::Validation(
                "BOT_SEARCH_DEPTH must be at least 1".into(),
            ));
        }
        if self.port != 0 && self.port == self.admin_port {
            return Err(ConfigError::Validation(format!(
                "PORT and ADMIN_PORT are both {}",
                self.port
            )));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse { var, value }),
    }
}

fn parse_port_from_args(args: &[String]) -> Result<Option<u16>, ConfigError> {
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1]
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Parse {
                    var: "--port",
                    value: args[i + 1].clone(),
                });
        }
        i += 1;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], args: &[&str]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned(), &args)
    }

    #[test]
    fn test_defaults() {
        let config = load(&[], &["server"]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_port, 8890);
        assert_eq!(config.admin_auth_token, "admin");
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.session.bot_wait, Duration::from_secs(10));
        assert_eq!(config.session.disconnect_timeout, Duration::from_secs(30));
        assert_eq!(config.bot_search_depth, 5);
        assert!(config.event_log_path.is_none());
    }

    #[test]
    fn test_port_flag_overrides_env() {
        let config = load(&[("PORT", "9000")], &["server", "--port", "9100"]).unwrap();
        assert_eq!(config.port, 9100);

        let config = load(&[("PORT", "9000")], &["server"]).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_env_overrides() {
        let config = load(
            &[
                ("BOT_WAIT_SECS", "3"),
                ("BOT_DELAY_MIN_MS", "0"),
                ("BOT_DELAY_MAX_MS", "10"),
                ("EVENT_LOG_PATH", "/tmp/events.ndjson"),
                ("ADMIN_AUTH_TOKEN", "s3cret"),
            ],
            &["server"],
        )
        .unwrap();
        assert_eq!(config.session.bot_wait, Duration::from_secs(3));
        assert_eq!(config.session.bot_delay_ms, 0..=10);
        assert_eq!(
            config.event_log_path,
            Some(PathBuf::from("/tmp/events.ndjson"))
        );
        assert_eq!(config.admin_auth_token, "s3cret");
    }

    #[test]
    fn test_parse_error_names_variable() {
        let err = load(&[("CLEANUP_INTERVAL_MS", "soon")], &["server"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Parse {
                var: "CLEANUP_INTERVAL_MS",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_validation_rejects_inconsistent_values() {
        assert!(matches!(
            load(&[("BOT_DELAY_MIN_MS", "2000")], &["server"]),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            load(&[("BOT_SEARCH_DEPTH", "0")], &["server"]),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            load(&[("MATCHMAKING_INTERVAL_MS", "0")], &["server"]),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            load(&[("ADMIN_PORT", "8080")], &["server"]),
            Err(ConfigError::Validation(_))
        ));
    }
}
