use std::env;
use std::time::Duration;

use chrono_tz::Tz;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Zone used to read departure times and to cut monthly report windows.
    pub timezone: Tz,
    pub expiry_sweep_interval: Duration,
    pub expiry_lookahead: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            timezone: env::var("APP_TIMEZONE")
                .unwrap_or_else(|_| "Asia/Ho_Chi_Minh".to_string())
                .parse()
                .expect("APP_TIMEZONE must be an IANA timezone name"),
            expiry_sweep_interval: Duration::from_secs(
                env::var("EXPIRY_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .expect("EXPIRY_SWEEP_INTERVAL_SECS must be a number"),
            ),
            expiry_lookahead: chrono::Duration::hours(
                env::var("EXPIRY_LOOKAHEAD_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .expect("EXPIRY_LOOKAHEAD_HOURS must be a number"),
            ),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
