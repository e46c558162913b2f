use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::shared::DEFAULT_INTERACTION_ENDPOINT;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server_bind_point: String,
    pub port: u16,
    pub interaction_endpoint: String,
    pub application_id: u64,
    pub public_key: String,
    pub bot_token: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            server_bind_point: "0.0.0.0".into(),
            port: 80,
            interaction_endpoint: DEFAULT_INTERACTION_ENDPOINT.into(),
            application_id: 0,
            public_key: String::new(),
            bot_token: String::new(),
            log_level: "DEBUG".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `$CONFIG_DIRECTORY/$CONFIG_FILE_NAME`, writing a default file
    /// first if there is none, then applies environment overrides.
    pub fn load_from_config_file() -> anyhow::Result<Self> {
        let config_directory_path = std::env::var("CONFIG_DIRECTORY")?;
        let config_directory = std::path::Path::new(&config_directory_path);
        if !config_directory.exists() {
            std::fs::create_dir_all(&config_directory_path)?;
        }

        let config_file_name = std::env::var("CONFIG_FILE_NAME")?;
        let configuration_path = config_directory.join(&config_file_name);
        let mut config = if !configuration_path.exists() {
            let new_config = Configuration::new();
            let serialized = toml::to_string_pretty(&new_config)?;
            std::fs::write(&configuration_path, serialized)?;
            tracing::info!("Wrote default configuration to {}.", configuration_path.display());
            new_config
        } else {
            let raw_config = std::fs::read_to_string(&configuration_path)?;
            Self::from_toml_str(&raw_config)?
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw_config: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw_config)?)
    }

    /// Secrets and deployment-specific values may come from the environment.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(public_key) = lookup("APPLICATION_PUBLIC_KEY") {
            self.public_key = public_key;
        }
        if let Some(bot_token) = lookup("BOT_TOKEN") {
            self.bot_token = bot_token;
        }
        if let Some(application_id) = lookup("APPLICATION_ID") {
            self.application_id = application_id.parse()?;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port.parse()?;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.application_id == 0 {
            anyhow::bail!("Application id is not configured.");
        }

        let public_key = hex::decode(self.public_key.trim())?;
        if public_key.len() != 32 {
            anyhow::bail!("Application public key must decode to 32 bytes.");
        }

        if !self.interaction_endpoint.starts_with('/') {
            anyhow::bail!(
                "Interaction endpoint `{}` must start with `/`.",
                self.interaction_endpoint
            );
        }

        Ok(())
    }

    pub fn tracing_level(&self) -> Level {
        match self.log_level.to_uppercase().as_str() {
            "TRACE" => Level::TRACE,
            "INFO" => Level::INFO,
            "WARN" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => Level::DEBUG,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_bind_point, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const PUBLIC_KEY: &str = "67c6bd767ca099e79efac9fcce4d2022a63bf7dea780e7f3d813f694c1597089";

    #[test]
    fn missing_fields_take_defaults() {
        let config = Configuration::from_toml_str(
            r#"
            port = 8080
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.interaction_endpoint, DEFAULT_INTERACTION_ENDPOINT);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn default_configuration_round_trips_through_toml() {
        let serialized = toml::to_string_pretty(&Configuration::new()).unwrap();
        assert_eq!(Configuration::from_toml_str(&serialized).unwrap(), Configuration::new());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env = HashMap::from([
            ("APPLICATION_ID", "123456789"),
            ("APPLICATION_PUBLIC_KEY", PUBLIC_KEY),
            ("LOG_LEVEL", "warn"),
        ]);
        let mut config = Configuration::new();
        config
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.application_id, 123456789);
        assert_eq!(config.tracing_level(), Level::WARN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_configuration() {
        let mut config = Configuration::new();
        assert!(config.validate().is_err());

        config.application_id = 1;
        config.public_key = "abcd".into();
        assert!(config.validate().is_err());

        config.public_key = PUBLIC_KEY.into();
        config.interaction_endpoint = "interaction".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_numeric_override() {
        let mut config = Configuration::new();
        assert!(config.apply_overrides(|_| Some("not-a-number".into())).is_err());
    }
}
