use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub unit_of_work_timeout: Duration,
    pub balance_cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("unit_of_work_timeout", &self.unit_of_work_timeout)
            .field("balance_cache_ttl", &self.balance_cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env_or("PORT", 3000),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Use a secure secret in production
            token_ttl: Duration::from_secs(env_or("TOKEN_TTL_SECS", 3600)),
            bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            unit_of_work_timeout: Duration::from_millis(env_or("UNIT_OF_WORK_TIMEOUT_MS", 5000)),
            balance_cache_ttl: Duration::from_secs(env_or("BALANCE_CACHE_TTL_SECS", 300)),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 30)),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
