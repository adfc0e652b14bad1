//! Framework configuration is loaded from an optional `beanwire.json` file and environment variables
//! prefixed with `BEANWIRE_`. Nested keys in environment variables are separated with `__`, e.g.
//! `BEANWIRE_ENGINE__CYLINDERS` sets `engine.cylinders`.
//!
//! The same configuration serves two purposes: [ApplicationConfig] configures the
//! [Application](crate::application::Application) itself, while [ConfigPropertySource] exposes all
//! values to bean conditions and property injection points.

use beanwire::environment::PropertySource;
use config::{Config, ConfigError, Environment, File};
use derive_more::Constructor;
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "BEANWIRE";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "beanwire.json";

/// Loads raw configuration from the default file and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"))
        .build()
}

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Should eager beans be created on multiple threads.
    pub parallel_initialization: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            parallel_initialization: false,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            parallel_initialization: value
                .parallel_initialization
                .unwrap_or(default.parallel_initialization),
        }
    }
}

impl TryFrom<&Config> for ApplicationConfig {
    type Error = ConfigError;

    fn try_from(value: &Config) -> Result<Self, Self::Error> {
        value
            .clone()
            .try_deserialize::<OptionalApplicationConfig>()
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    parallel_initialization: Option<bool>,
}

/// [PropertySource] backed by loaded configuration.
#[derive(Constructor, Clone, Debug)]
pub struct ConfigPropertySource {
    config: Config,
}

impl PropertySource for ConfigPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.config.get_string(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ApplicationConfig, ConfigPropertySource};
    use beanwire::environment::PropertySource;
    use config::Config;

    fn config() -> Config {
        Config::builder()
            .set_override("engine.cylinders", 8)
            .unwrap()
            .set_override("parallel_initialization", true)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn should_use_defaults_for_missing_values() {
        let config = ApplicationConfig::try_from(&config()).unwrap();
        assert!(config.install_tracing_logger);
        assert!(config.parallel_initialization);
    }

    #[test]
    fn should_expose_nested_properties() {
        let source = ConfigPropertySource::new(config());
        assert_eq!(source.property("engine.cylinders").as_deref(), Some("8"));
        assert_eq!(source.property("engine.fuel"), None);
    }
}
