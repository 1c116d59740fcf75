use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_PATH: &str = "tickler.db";
pub const DEFAULT_DELIVERY_BUFFER: usize = 64;

/// Top-level config (tickler.toml + TICKLER_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicklerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Capacity of the fired-reminder channel between the engine loop and
    /// the delivery task.
    #[serde(default = "default_delivery_buffer")]
    pub buffer: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_DELIVERY_BUFFER,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_delivery_buffer() -> usize {
    DEFAULT_DELIVERY_BUFFER
}

impl TicklerConfig {
    /// Load from `path` (default `tickler.toml`), then apply `TICKLER_*`
    /// env overrides such as `TICKLER_DATABASE_PATH`.
    pub fn load(path: Option<&str>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.unwrap_or("tickler.toml")))
            .merge(Env::prefixed("TICKLER_").split("_"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TicklerConfig::default();
        assert_eq!(config.database.path, DEFAULT_DB_PATH);
        assert_eq!(config.delivery.buffer, DEFAULT_DELIVERY_BUFFER);
    }
}
