use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub environment: String,
    pub database_url: String,
    pub max_connections: u32,
    pub query_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8085".to_string()).parse().context("PORT")?;

        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinedex.db?mode=rwc".to_string());

        let max_connections: u32 =
            std::env::var("DB_MAX_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let query_timeout_secs: u64 =
            std::env::var("DB_QUERY_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(3);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            environment,
            database_url,
            max_connections: max_connections.max(1),
            query_timeout: Duration::from_secs(query_timeout_secs.max(1)),
        })
    }
}
