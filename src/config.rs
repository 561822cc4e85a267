use crate::auth::password::hash_scheme;
use crate::models::SessionPolicy;
use std::env;
use std::net::SocketAddr;

/// Which store implementation backs a concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("expected 'redis' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
    pub cors_allowed_origins: Vec<String>,

    // Backends
    pub storage_backend: Backend,
    pub session_backend: Backend,
    pub redis_url: Option<String>,

    // Admin provisioning
    pub admin_username: String,
    pub admin_password_hash: Option<String>,

    // Sessions (in seconds)
    pub session_ttl_secs: u64,
    pub session_idle_secs: u64,
    pub session_sweep_secs: u64,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("storage_backend", &self.storage_backend)
            .field("session_backend", &self.session_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password_hash",
                &self.admin_password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_idle_secs", &self.session_idle_secs)
            .field("session_sweep_secs", &self.session_sweep_secs)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", 65_536)?;

        let cors_allowed_origins: Vec<String> = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Backends
        let storage_backend = parse_env_or_default("STORAGE_BACKEND", Backend::Redis)?;
        let session_backend = parse_env_or_default("SESSION_BACKEND", Backend::Memory)?;

        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.is_empty());
        if redis_url.is_none()
            && (storage_backend == Backend::Redis || session_backend == Backend::Redis)
        {
            return Err(ConfigError::MissingVar("REDIS_URL".to_string()));
        }

        // Admin provisioning
        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        validate_username(&admin_username)?;

        let admin_password_hash = env::var("ADMIN_PASSWORD_HASH")
            .ok()
            .filter(|s| !s.is_empty());
        if let Some(hash) = &admin_password_hash {
            if hash_scheme(hash).is_none() {
                return Err(ConfigError::InvalidValue(
                    "ADMIN_PASSWORD_HASH".to_string(),
                    "expected an argon2 PHC string or a bcrypt hash".to_string(),
                ));
            }
        }

        // Sessions
        let session_ttl_secs: u64 = parse_env_or_default("SESSION_TTL_SECS", 28_800)?;
        let session_idle_secs: u64 = parse_env_or_default("SESSION_IDLE_SECS", 1_800)?;
        let session_sweep_secs: u64 = parse_env_or_default("SESSION_SWEEP_SECS", 300)?;

        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if session_idle_secs == 0 || session_idle_secs > session_ttl_secs {
            return Err(ConfigError::InvalidValue(
                "SESSION_IDLE_SECS".to_string(),
                "must be greater than 0 and at most SESSION_TTL_SECS".to_string(),
            ));
        }
        if session_sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_SWEEP_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let session_cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "eventreg_session".to_string());
        if session_cookie_name.is_empty()
            || !session_cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidValue(
                "SESSION_COOKIE_NAME".to_string(),
                "may only contain alphanumeric characters, hyphens, and underscores".to_string(),
            ));
        }
        let cookie_secure = parse_env_or_default("COOKIE_SECURE", true)?;

        Ok(Config {
            bind_addr,
            max_body_bytes,
            cors_allowed_origins,
            storage_backend,
            session_backend,
            redis_url,
            admin_username,
            admin_password_hash,
            session_ttl_secs,
            session_idle_secs,
            session_sweep_secs,
            session_cookie_name,
            cookie_secure,
        })
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            absolute_ttl_secs: self.session_ttl_secs,
            idle_ttl_secs: self.session_idle_secs,
        }
    }
}

/// Admin usernames: 2-64 chars, alphanumeric + hyphen + underscore.
fn validate_username(username: &str) -> Result<(), ConfigError> {
    if username.len() < 2 || username.len() > 64 {
        return Err(ConfigError::InvalidValue(
            "ADMIN_USERNAME".to_string(),
            "must be 2-64 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::InvalidValue(
            "ADMIN_USERNAME".to_string(),
            "may only contain alphanumeric characters, hyphens, and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    const VARS: &[&str] = &[
        "BIND_ADDR",
        "MAX_BODY_BYTES",
        "CORS_ALLOWED_ORIGINS",
        "STORAGE_BACKEND",
        "SESSION_BACKEND",
        "REDIS_URL",
        "ADMIN_USERNAME",
        "ADMIN_PASSWORD_HASH",
        "SESSION_TTL_SECS",
        "SESSION_IDLE_SECS",
        "SESSION_SWEEP_SECS",
        "SESSION_COOKIE_NAME",
        "COOKIE_SECURE",
    ];

    fn clear_test_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    /// Pin every variable so values from a local .env cannot leak in
    /// (dotenvy doesn't override existing vars).
    fn set_baseline_env() {
        clear_test_env();
        env::set_var("BIND_ADDR", "0.0.0.0:3000");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("SESSION_BACKEND", "memory");
        env::set_var("REDIS_URL", "");
        env::set_var("ADMIN_USERNAME", "admin");
        env::set_var("ADMIN_PASSWORD_HASH", "");
        env::set_var("CORS_ALLOWED_ORIGINS", "");
        env::set_var("SESSION_TTL_SECS", "28800");
        env::set_var("SESSION_IDLE_SECS", "1800");
        env::set_var("SESSION_SWEEP_SECS", "300");
        env::set_var("SESSION_COOKIE_NAME", "eventreg_session");
        env::set_var("COOKIE_SECURE", "true");
        env::set_var("MAX_BODY_BYTES", "65536");
    }

    fn assert_invalid(var: &str) {
        let result = Config::from_env();
        assert!(
            matches!(result, Err(ConfigError::InvalidValue(ref s, _)) if s == var),
            "expected InvalidValue({}), got {:?}",
            var,
            result
        );
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("redis".parse::<Backend>().unwrap(), Backend::Redis);
        assert_eq!(" Memory ".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("postgres".parse::<Backend>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        set_baseline_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.storage_backend, Backend::Memory);
        assert_eq!(config.session_backend, Backend::Memory);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.admin_password_hash, None);
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.session_ttl_secs, 28_800);
        assert_eq!(config.session_idle_secs, 1_800);
        assert_eq!(config.session_sweep_secs, 300);
        assert_eq!(config.session_cookie_name, "eventreg_session");
        assert!(config.cookie_secure);
        assert_eq!(config.max_body_bytes, 65_536);
        assert_eq!(
            config.session_policy(),
            SessionPolicy {
                absolute_ttl_secs: 28_800,
                idle_ttl_secs: 1_800
            }
        );

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var("SESSION_BACKEND", "redis");

        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::MissingVar(ref s) if s == "REDIS_URL"
        ));

        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
        let config = Config::from_env().unwrap();
        assert_eq!(config.session_backend, Backend::Redis);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));

        clear_test_env();
    }

    #[test]
    fn test_unknown_backend() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var("STORAGE_BACKEND", "mysql");

        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "STORAGE_BACKEND"
        ));

        clear_test_env();
    }

    #[test]
    fn test_cors_origins_parsing() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var(
            "CORS_ALLOWED_ORIGINS",
            "https://events.example.org, http://localhost:5173 ,",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://events.example.org", "http://localhost:5173"]
        );

        clear_test_env();
    }

    #[test]
    fn test_invalid_admin_username() {
        let _guard = lock_test();
        set_baseline_env();

        env::set_var("ADMIN_USERNAME", "a");
        assert_invalid("ADMIN_USERNAME");

        env::set_var("ADMIN_USERNAME", "a".repeat(65));
        assert_invalid("ADMIN_USERNAME");

        env::set_var("ADMIN_USERNAME", "admin@example");
        assert_invalid("ADMIN_USERNAME");

        env::set_var("ADMIN_USERNAME", "admin user");
        assert_invalid("ADMIN_USERNAME");

        clear_test_env();
    }

    #[test]
    fn test_valid_admin_username_edge_cases() {
        let _guard = lock_test();
        set_baseline_env();

        env::set_var("ADMIN_USERNAME", "ab");
        assert_eq!(Config::from_env().unwrap().admin_username, "ab");

        env::set_var("ADMIN_USERNAME", "a".repeat(64));
        assert_eq!(Config::from_env().unwrap().admin_username.len(), 64);

        env::set_var("ADMIN_USERNAME", "event_admin-2");
        assert_eq!(Config::from_env().unwrap().admin_username, "event_admin-2");

        clear_test_env();
    }

    #[test]
    fn test_admin_password_hash_must_be_a_hash() {
        let _guard = lock_test();
        set_baseline_env();

        env::set_var("ADMIN_PASSWORD_HASH", "admin123");
        assert_invalid("ADMIN_PASSWORD_HASH");

        let bcrypt_hash = bcrypt::hash("admin123", 4).unwrap();
        env::set_var("ADMIN_PASSWORD_HASH", &bcrypt_hash);
        let config = Config::from_env().unwrap();
        assert_eq!(config.admin_password_hash.as_deref(), Some(bcrypt_hash.as_str()));

        clear_test_env();
    }

    #[test]
    fn test_session_ttl_validation() {
        let _guard = lock_test();
        set_baseline_env();

        env::set_var("SESSION_TTL_SECS", "0");
        assert_invalid("SESSION_TTL_SECS");

        env::set_var("SESSION_TTL_SECS", "600");
        env::set_var("SESSION_IDLE_SECS", "601");
        assert_invalid("SESSION_IDLE_SECS");

        env::set_var("SESSION_IDLE_SECS", "0");
        assert_invalid("SESSION_IDLE_SECS");

        env::set_var("SESSION_IDLE_SECS", "600");
        assert!(Config::from_env().is_ok());

        clear_test_env();
    }

    #[test]
    fn test_invalid_cookie_name() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var("SESSION_COOKIE_NAME", "bad;name");

        assert_invalid("SESSION_COOKIE_NAME");

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let _guard = lock_test();
        set_baseline_env();
        env::set_var("REDIS_URL", "redis://:hunter2@10.0.0.5:6379");
        let hash = bcrypt::hash("admin123", 4).unwrap();
        env::set_var("ADMIN_PASSWORD_HASH", &hash);

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains(&hash));
        assert!(debug.contains("[REDACTED]"));

        clear_test_env();
    }
}
