use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_INVITE_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub public_rps: u32,
    pub api_rps: u32,
    pub invite_ttl_days: i64,
    pub mail_relay_url: Option<String>,
    pub mail_relay_secret: Option<String>,
    pub mail_from_name: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let invite_ttl_days = match env::var("INVITE_TTL_DAYS") {
            Ok(_) => get_env_parse("INVITE_TTL_DAYS")?,
            Err(_) => DEFAULT_INVITE_TTL_DAYS,
        };
        if invite_ttl_days <= 0 {
            return Err(Error::Config(
                "INVITE_TTL_DAYS must be a positive number of days".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            frontend_url: get_env("FRONTEND_URL")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            api_rps: get_env_parse("API_RPS")?,
            invite_ttl_days,
            mail_relay_url: env::var("MAIL_RELAY_URL").ok().filter(|v| !v.is_empty()),
            mail_relay_secret: env::var("MAIL_RELAY_SECRET").ok(),
            mail_from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "QuizApp".to_string()),
        })
    }

    pub fn invite_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.invite_ttl_days)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
