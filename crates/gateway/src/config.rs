use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::gate::UnavailablePolicy;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub moderation_api_key: Option<String>,
    pub moderation_url: String,
    pub moderation_models: Vec<String>,
    pub moderation_max_chars: usize,
    pub moderation_timeout_ms: u64,
    pub search_api_key: Option<String>,
    pub search_url: String,
    pub search_page_size: u32,
    pub search_timeout_ms: u64,
    pub cache_ttl_ms: u64,
    pub cache_max_entries: usize,
    pub breaker_cooldown_ms: u64,
    pub on_unavailable: UnavailablePolicy,
    pub runtime_env: RuntimeEnv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Production,
    Development,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

const DEFAULT_MODERATION_URL: &str = "https://api.openai.com/v1/moderations";
const DEFAULT_MODERATION_MODELS: &str = "omni-moderation-latest,text-moderation-latest";
const DEFAULT_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const DEFAULT_CACHE_TTL_MS: u64 = 12 * 60 * 60 * 1000;
const DEFAULT_BREAKER_COOLDOWN_MS: u64 = 5 * 60 * 1000;

impl GatewayConfig {
    pub fn load() -> Result<Self, StartupError> {
        let mut merged = HashMap::new();

        if let Ok(config_path) = std::env::var("FOCUSTUBE_CONFIG_PATH") {
            let config_path = config_path.trim();
            if !config_path.is_empty() {
                let file_kv = parse_env_file(config_path)?;
                merged.extend(file_kv);
            }
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let bind_addr = parse_socket_addr(
            kv.get("FOCUSTUBE_BIND_ADDR"),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            "FOCUSTUBE_BIND_ADDR",
        )?;

        let moderation_api_key = optional_nonempty(kv, "FOCUSTUBE_MODERATION_API_KEY");
        let moderation_url = nonempty_or(kv, "FOCUSTUBE_MODERATION_URL", DEFAULT_MODERATION_URL);

        let models_raw = nonempty_or(kv, "FOCUSTUBE_MODERATION_MODELS", DEFAULT_MODERATION_MODELS);
        let moderation_models = models_raw
            .split(',')
            .map(|model| model.trim())
            .filter(|model| !model.is_empty())
            .map(|model| model.to_string())
            .collect::<Vec<_>>();
        if moderation_models.is_empty() {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "FOCUSTUBE_MODERATION_MODELS must name at least one model".to_string(),
            });
        }

        let moderation_max_chars = parse_usize(
            kv.get("FOCUSTUBE_MODERATION_MAX_CHARS"),
            4000,
            "FOCUSTUBE_MODERATION_MAX_CHARS",
        )?;
        if moderation_max_chars == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "FOCUSTUBE_MODERATION_MAX_CHARS must be >= 1".to_string(),
            });
        }

        let moderation_timeout_ms = parse_u64(
            kv.get("FOCUSTUBE_MODERATION_TIMEOUT_MS"),
            10_000,
            "FOCUSTUBE_MODERATION_TIMEOUT_MS",
        )?;
        if moderation_timeout_ms == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "FOCUSTUBE_MODERATION_TIMEOUT_MS must be >= 1".to_string(),
            });
        }

        let search_api_key = optional_nonempty(kv, "FOCUSTUBE_SEARCH_API_KEY");
        let search_url = nonempty_or(kv, "FOCUSTUBE_SEARCH_URL", DEFAULT_SEARCH_URL);

        let search_page_size = parse_u32(
            kv.get("FOCUSTUBE_SEARCH_PAGE_SIZE"),
            12,
            "FOCUSTUBE_SEARCH_PAGE_SIZE",
        )?;
        if !(1..=50).contains(&search_page_size) {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "FOCUSTUBE_SEARCH_PAGE_SIZE must be between 1 and 50".to_string(),
            });
        }

        let search_timeout_ms = parse_u64(
            kv.get("FOCUSTUBE_SEARCH_TIMEOUT_MS"),
            10_000,
            "FOCUSTUBE_SEARCH_TIMEOUT_MS",
        )?;
        if search_timeout_ms == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "FOCUSTUBE_SEARCH_TIMEOUT_MS must be >= 1".to_string(),
            });
        }

        let cache_ttl_ms = parse_u64(
            kv.get("FOCUSTUBE_CACHE_TTL_MS"),
            DEFAULT_CACHE_TTL_MS,
            "FOCUSTUBE_CACHE_TTL_MS",
        )?;
        let cache_max_entries = parse_usize(
            kv.get("FOCUSTUBE_CACHE_MAX_ENTRIES"),
            10_000,
            "FOCUSTUBE_CACHE_MAX_ENTRIES",
        )?;

        let breaker_cooldown_ms = parse_u64(
            kv.get("FOCUSTUBE_BREAKER_COOLDOWN_MS"),
            DEFAULT_BREAKER_COOLDOWN_MS,
            "FOCUSTUBE_BREAKER_COOLDOWN_MS",
        )?;

        let on_unavailable = parse_unavailable_policy(kv.get("FOCUSTUBE_ON_UNAVAILABLE"))?;
        let runtime_env = parse_runtime_env(kv.get("FOCUSTUBE_ENV"))?;

        Ok(Self {
            bind_addr,
            moderation_api_key,
            moderation_url,
            moderation_models,
            moderation_max_chars,
            moderation_timeout_ms,
            search_api_key,
            search_url,
            search_page_size,
            search_timeout_ms,
            cache_ttl_ms,
            cache_max_entries,
            breaker_cooldown_ms,
            on_unavailable,
            runtime_env,
        })
    }
}

fn parse_env_file(path: &str) -> Result<HashMap<String, String>, StartupError> {
    let contents = std::fs::read_to_string(path).map_err(|_| StartupError {
        code: "ERR_CONFIG_FILE_READ",
        message: format!("failed to read config file at {}", path),
    })?;

    let mut kv = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| StartupError {
            code: "ERR_CONFIG_FILE_PARSE",
            message: format!("invalid config line {} (expected KEY=VALUE)", idx + 1),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(StartupError {
                code: "ERR_CONFIG_FILE_PARSE",
                message: format!("invalid config line {} (empty key)", idx + 1),
            });
        }

        let value = strip_quotes(value.trim());
        kv.insert(key.to_string(), value);
    }

    Ok(kv)
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..bytes.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn optional_nonempty(kv: &HashMap<String, String>, key: &'static str) -> Option<String> {
    kv.get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn nonempty_or(kv: &HashMap<String, String>, key: &'static str, default: &str) -> String {
    kv.get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_socket_addr(
    value: Option<&String>,
    default: SocketAddr,
    key: &'static str,
) -> Result<SocketAddr, StartupError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse::<SocketAddr>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be a valid host:port socket address", key),
        }),
    }
}

fn parse_usize(
    value: Option<&String>,
    default: usize,
    key: &'static str,
) -> Result<usize, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.parse::<usize>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_u64(value: Option<&String>, default: u64, key: &'static str) -> Result<u64, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_u32(value: Option<&String>, default: u32, key: &'static str) -> Result<u32, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.parse::<u32>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_unavailable_policy(value: Option<&String>) -> Result<UnavailablePolicy, StartupError> {
    let mode = value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("block");

    match mode {
        "block" => Ok(UnavailablePolicy::Block),
        "allow" => Ok(UnavailablePolicy::Allow),
        _ => Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "FOCUSTUBE_ON_UNAVAILABLE must be block or allow".to_string(),
        }),
    }
}

fn parse_runtime_env(value: Option<&String>) -> Result<RuntimeEnv, StartupError> {
    let mode = value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("production");

    match mode {
        "production" => Ok(RuntimeEnv::Production),
        "development" => Ok(RuntimeEnv::Development),
        _ => Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "FOCUSTUBE_ENV must be production or development".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_an_empty_environment() {
        let config = GatewayConfig::from_kv(&HashMap::new()).expect("defaults should be valid");

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.moderation_api_key, None);
        assert_eq!(config.moderation_url, DEFAULT_MODERATION_URL);
        assert_eq!(
            config.moderation_models,
            vec!["omni-moderation-latest", "text-moderation-latest"]
        );
        assert_eq!(config.moderation_max_chars, 4000);
        assert_eq!(config.search_page_size, 12);
        assert_eq!(config.cache_ttl_ms, 12 * 60 * 60 * 1000);
        assert_eq!(config.breaker_cooldown_ms, 5 * 60 * 1000);
        assert_eq!(config.on_unavailable, UnavailablePolicy::Block);
        assert_eq!(config.runtime_env, RuntimeEnv::Production);
    }

    #[test]
    fn invalid_page_size_fails() {
        let env = HashMap::from([(
            "FOCUSTUBE_SEARCH_PAGE_SIZE".to_string(),
            "100".to_string(),
        )]);
        let err = GatewayConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn invalid_unavailable_policy_fails() {
        let env = HashMap::from([(
            "FOCUSTUBE_ON_UNAVAILABLE".to_string(),
            "maybe".to_string(),
        )]);
        let err = GatewayConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn empty_models_list_fails() {
        let env = HashMap::from([(
            "FOCUSTUBE_MODERATION_MODELS".to_string(),
            " , ,".to_string(),
        )]);
        let err = GatewayConfig::from_kv(&env).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }

    #[test]
    fn model_list_is_split_and_trimmed() {
        let env = HashMap::from([(
            "FOCUSTUBE_MODERATION_MODELS".to_string(),
            "primary-model, fallback-model ".to_string(),
        )]);
        let config = GatewayConfig::from_kv(&env).expect("config should parse");
        assert_eq!(
            config.moderation_models,
            vec!["primary-model", "fallback-model"]
        );
    }

    #[test]
    fn zero_timeouts_fail() {
        for key in [
            "FOCUSTUBE_MODERATION_TIMEOUT_MS",
            "FOCUSTUBE_SEARCH_TIMEOUT_MS",
        ] {
            let env = HashMap::from([(key.to_string(), "0".to_string())]);
            let err = GatewayConfig::from_kv(&env).unwrap_err();
            assert_eq!(err.code, "ERR_INVALID_CONFIG", "{key}");
        }
    }

    fn write_temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "focustube-config-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).expect("temp config should be writable");
        path
    }

    #[test]
    fn env_file_skips_comments_and_strips_quotes() {
        let path = write_temp_config(
            "ok.env",
            concat!(
                "# moderation settings\n",
                "\n",
                "FOCUSTUBE_MODERATION_API_KEY=\"quoted-key\"\n",
                "FOCUSTUBE_SEARCH_API_KEY='single-quoted'\n",
                "  FOCUSTUBE_SEARCH_PAGE_SIZE = 24 \n",
            ),
        );

        let kv = parse_env_file(path.to_str().expect("utf-8 temp path"))
            .expect("config file should parse");
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            kv.get("FOCUSTUBE_MODERATION_API_KEY").map(String::as_str),
            Some("quoted-key")
        );
        assert_eq!(
            kv.get("FOCUSTUBE_SEARCH_API_KEY").map(String::as_str),
            Some("single-quoted")
        );
        assert_eq!(
            kv.get("FOCUSTUBE_SEARCH_PAGE_SIZE").map(String::as_str),
            Some("24")
        );

        let config = GatewayConfig::from_kv(&kv).expect("parsed file should configure");
        assert_eq!(config.moderation_api_key.as_deref(), Some("quoted-key"));
        assert_eq!(config.search_page_size, 24);
    }

    #[test]
    fn env_file_line_without_separator_fails() {
        let path = write_temp_config("bad.env", "FOCUSTUBE_MODERATION_API_KEY\n");

        let err = parse_env_file(path.to_str().expect("utf-8 temp path")).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert_eq!(err.code, "ERR_CONFIG_FILE_PARSE");
    }

    #[test]
    fn unreadable_env_file_fails() {
        let err = parse_env_file("/nonexistent/focustube.env").unwrap_err();
        assert_eq!(err.code, "ERR_CONFIG_FILE_READ");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let env = HashMap::from([
            ("FOCUSTUBE_MODERATION_API_KEY".to_string(), "  ".to_string()),
            ("FOCUSTUBE_CACHE_TTL_MS".to_string(), "".to_string()),
        ]);
        let config = GatewayConfig::from_kv(&env).expect("config should parse");
        assert_eq!(config.moderation_api_key, None);
        assert_eq!(config.cache_ttl_ms, DEFAULT_CACHE_TTL_MS);
    }
}
