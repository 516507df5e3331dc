use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_port: u16,
    pub seed_report_count: usize,
    pub seed_rng: Option<u64>,
    pub community_radius_km: f64,
    pub geocode_enabled: bool,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 4000,
            seed_report_count: 150,
            seed_rng: None,
            community_radius_km: crate::store::DEFAULT_RADIUS_KM,
            geocode_enabled: true,
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            geocoder_user_agent: "civic-reports/0.1".to_string(),
            geocoder_timeout_secs: 5,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let server_port = parse_var("PORT", defaults.server_port)?;
        let seed_report_count = parse_var("SEED_REPORT_COUNT", defaults.seed_report_count)?;

        let seed_rng = match env::var("SEED_RNG") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidEnvVar("SEED_RNG".to_string(), e.to_string()))?,
            ),
            _ => None,
        };

        let community_radius_km = parse_var("COMMUNITY_RADIUS_KM", defaults.community_radius_km)?;
        let geocode_enabled = parse_var("GEOCODE_ENABLED", defaults.geocode_enabled)?;
        let geocoder_url = env::var("GEOCODER_URL").unwrap_or(defaults.geocoder_url);
        let geocoder_user_agent =
            env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.geocoder_user_agent);
        let geocoder_timeout_secs =
            parse_var("GEOCODER_TIMEOUT_SECS", defaults.geocoder_timeout_secs)?;

        Ok(Config {
            server_port,
            seed_report_count,
            seed_rng,
            community_radius_km,
            geocode_enabled,
            geocoder_url,
            geocoder_user_agent,
            geocoder_timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_port == 0 {
            return Err(ConfigError::InvalidEnvVar("PORT".to_string(), "must be a valid port number".to_string()));
        }

        if !self.community_radius_km.is_finite() || self.community_radius_km <= 0.0 {
            return Err(ConfigError::InvalidEnvVar("COMMUNITY_RADIUS_KM".to_string(), "must be a positive number".to_string()));
        }

        if self.geocode_enabled && self.geocoder_url.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar("GEOCODER_URL".to_string(), "cannot be empty".to_string()));
        }

        if self.geocoder_timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar("GEOCODER_TIMEOUT_SECS".to_string(), "must be greater than zero".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
