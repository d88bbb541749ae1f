use std::env;

use anyhow::{Context, Result};
use dotenv::dotenv;

pub const DEFAULT_PORT: u16 = 3333;
pub static DEFAULT_ADMIN_CODE: &str = "000000";

/// Daemon settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub database_url: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var must be set!")?;
        let port = match env::var("TIMECLOCK_PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("TIMECLOCK_PORT is not a port number: {}", port))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(ServerSettings { database_url, port })
    }
}

/// CLI settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub admin_code: String,
}

impl ClientSettings {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let base_url: String = env::var("BASE_URL").context("BASE_URL env var must be set!")?;
        let admin_code = env::var("TIMECLOCK_ADMIN_CODE")
            .ok()
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_CODE.to_string());

        Ok(ClientSettings {
            base_url,
            admin_code,
        })
    }
}
