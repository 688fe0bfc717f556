// runtime configuration, built once at startup and passed down by reference

use crate::core::Provider;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            provider: Provider::default(),
            api_key: None,
            model: None,
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Config {
    pub fn database_url(&self) -> Result<&str, crate::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| crate::Error::Server("database url required (--db or DATABASE_URL)".into()))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
